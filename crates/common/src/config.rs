//! Daemon configuration.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{ProfdError, ProfdResult};

/// Global daemon configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DaemonConfig {
    /// Root of the file cache; completed traces land in `<cache_dir>/complete`.
    pub cache_dir: PathBuf,

    /// When set, stopping a trace also ends the session that issued it.
    pub task_based_ux: bool,

    /// CPU/native tracing parameters.
    pub cpu: CpuConfig,

    /// Logging configuration.
    pub logging: LoggingConfig,
}

/// Parameters forwarded to tracing backends.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CpuConfig {
    /// How long the ART backend may wait for the trace file after stop.
    pub art_stop_timeout_sec: u32,

    /// atrace buffer size used when a configuration leaves it at zero.
    pub atrace_buffer_size_mb: u32,

    /// Sampling interval used when a configuration leaves it at zero.
    pub simpleperf_sampling_interval_us: u32,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "debug", "profd=debug,warn").
    pub level: String,

    /// Whether to output structured JSON logs.
    pub json: bool,

    /// Optional log file path.
    pub file: Option<PathBuf>,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            cache_dir: default_cache_dir(),
            task_based_ux: false,
            cpu: CpuConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for CpuConfig {
    fn default() -> Self {
        Self {
            art_stop_timeout_sec: 5,
            atrace_buffer_size_mb: 32,
            simpleperf_sampling_interval_us: 1000,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
            file: None,
        }
    }
}

impl DaemonConfig {
    /// Load config from the standard location, falling back to defaults.
    pub fn load() -> Self {
        let config_path = config_file_path();
        if config_path.exists() {
            match Self::load_from(&config_path) {
                Ok(config) => return config,
                Err(e) => {
                    tracing::warn!("Failed to load config at {:?}: {}", config_path, e);
                }
            }
        }
        Self::default()
    }

    /// Load config from an explicit path.
    pub fn load_from(path: &Path) -> ProfdResult<Self> {
        if !path.exists() {
            return Err(ProfdError::FileNotFound {
                path: path.to_path_buf(),
            });
        }
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content)
            .map_err(|e| ProfdError::config(format!("Invalid config {}: {e}", path.display())))
    }

    /// Save config to the standard location.
    pub fn save(&self) -> ProfdResult<()> {
        let config_path = config_file_path();
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(config_path, json)?;
        Ok(())
    }
}

/// Standard config file location.
pub fn config_file_path() -> PathBuf {
    let base = std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
            PathBuf::from(home).join(".config")
        });
    base.join("profd").join("config.json")
}

/// Default file cache directory.
fn default_cache_dir() -> PathBuf {
    let base = std::env::var("XDG_CACHE_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
            PathBuf::from(home).join(".cache")
        });
    base.join("profd")
}
