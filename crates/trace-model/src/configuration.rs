//! Trace configuration received with every start/stop request.
//!
//! Two schemas coexist. The current one carries a dedicated options block
//! per technology ([`TraceOptions`]). The legacy one carries a single flat
//! [`LegacyOptions`] record whose `trace_type` tag selects the technology.
//! A configuration may carry either or both; the dedicated block wins.

use serde::{Deserialize, Serialize};

/// Which part of the profiler a command targets. Decides the event kind
/// and group-id convention of the data events it produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ProfilerType {
    #[default]
    Unspecified,
    Cpu,
    Memory,
}

/// Who drives the timing of a capture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TraceInitiationType {
    /// The daemon starts and stops the capture.
    #[default]
    Normal,
    /// The application starts and stops tracing itself and pushes its trace
    /// bytes out-of-band.
    InitiatedByApi,
    /// The capture starts together with the application process.
    InitiatedByStartup,
}

/// Tracing technology tag used by the legacy schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TraceType {
    #[default]
    Unspecified,
    Art,
    Atrace,
    Simpleperf,
    Perfetto,
}

/// ART tracing mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TraceMode {
    #[default]
    Sampled,
    Instrumented,
}

/// ART method tracing options.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ArtOptions {
    pub trace_mode: TraceMode,
    pub sampling_interval_us: u32,
    pub buffer_size_in_mb: u32,
}

/// System tracing (atrace) options.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AtraceOptions {
    pub buffer_size_in_mb: u32,
}

/// Statistical sampling (simpleperf) options.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct SimpleperfOptions {
    pub sampling_interval_us: u32,
}

/// Structured tracing (Perfetto) options.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct PerfettoOptions {
    pub buffer_size_kb: u32,
    /// Perfetto data source names, e.g. `linux.ftrace`, `android.heapprofd`.
    pub data_sources: Vec<String>,
}

/// Dedicated technology options block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "technology", rename_all = "snake_case")]
pub enum TraceOptions {
    Art(ArtOptions),
    Atrace(AtraceOptions),
    Simpleperf(SimpleperfOptions),
    Perfetto(PerfettoOptions),
}

/// Legacy flat options record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct LegacyOptions {
    pub trace_type: TraceType,
    pub trace_mode: TraceMode,
    pub sampling_interval_us: u32,
    pub buffer_size_in_mb: u32,
}

/// Full configuration of one capture.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct TraceConfiguration {
    /// Target application (process name).
    pub app_name: String,

    /// Target CPU architecture, e.g. `arm64`.
    pub abi_cpu_arch: String,

    /// Staging path the backend writes trace bytes to.
    pub temp_path: String,

    pub initiation_type: TraceInitiationType,

    /// Dedicated technology block (current schema).
    pub options: Option<TraceOptions>,

    /// Flat options record (legacy schema).
    pub legacy_options: Option<LegacyOptions>,
}

impl TraceConfiguration {
    /// A daemon-driven configuration for `app_name` with the given options.
    pub fn new(app_name: impl Into<String>, options: TraceOptions) -> Self {
        Self {
            app_name: app_name.into(),
            options: Some(options),
            ..Self::default()
        }
    }

    pub fn is_api_initiated(&self) -> bool {
        self.initiation_type == TraceInitiationType::InitiatedByApi
    }

    pub fn is_startup_initiated(&self) -> bool {
        self.initiation_type == TraceInitiationType::InitiatedByStartup
    }
}
