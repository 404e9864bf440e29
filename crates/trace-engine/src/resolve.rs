//! Technology resolution.
//!
//! Maps a [`TraceConfiguration`] onto exactly one tracing technology and the
//! settings its backend needs. Both configuration schemas go through here,
//! at start and again at stop, so a capture always stops on the backend it
//! started on.

use profd_common::config::CpuConfig;
use profd_trace_model::configuration::{
    LegacyOptions, PerfettoOptions, TraceConfiguration, TraceMode, TraceOptions, TraceType,
};

/// The four interchangeable tracing backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Technology {
    Art,
    Atrace,
    Simpleperf,
    Perfetto,
}

impl Technology {
    pub fn name(self) -> &'static str {
        match self {
            Self::Art => "art",
            Self::Atrace => "atrace",
            Self::Simpleperf => "simpleperf",
            Self::Perfetto => "perfetto",
        }
    }
}

/// Backend-ready settings for a resolved technology.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TechnologySettings {
    Art {
        mode: TraceMode,
        sampling_interval_us: u32,
        buffer_size_in_mb: u32,
    },
    Atrace {
        buffer_size_in_mb: u32,
    },
    Simpleperf {
        sampling_interval_us: u32,
    },
    Perfetto(PerfettoOptions),
}

impl TechnologySettings {
    pub fn technology(&self) -> Technology {
        match self {
            Self::Art { .. } => Technology::Art,
            Self::Atrace { .. } => Technology::Atrace,
            Self::Simpleperf { .. } => Technology::Simpleperf,
            Self::Perfetto(_) => Technology::Perfetto,
        }
    }
}

/// Resolve the technology a configuration asks for.
///
/// A dedicated options block wins over the legacy record. Without one, the
/// legacy `trace_type` decides, defaulting to ART. Returns `None` when the
/// configuration carries neither. Zero buffer sizes and sampling intervals
/// are replaced by the daemon defaults in `defaults`.
pub fn resolve_technology(
    configuration: &TraceConfiguration,
    defaults: &CpuConfig,
) -> Option<TechnologySettings> {
    let settings = match (&configuration.options, &configuration.legacy_options) {
        (Some(options), _) => from_dedicated(options),
        (None, Some(legacy)) => from_legacy(legacy),
        (None, None) => return None,
    };
    Some(apply_defaults(settings, defaults))
}

fn from_dedicated(options: &TraceOptions) -> TechnologySettings {
    match options {
        TraceOptions::Art(art) => TechnologySettings::Art {
            mode: art.trace_mode,
            sampling_interval_us: art.sampling_interval_us,
            buffer_size_in_mb: art.buffer_size_in_mb,
        },
        TraceOptions::Atrace(atrace) => TechnologySettings::Atrace {
            buffer_size_in_mb: atrace.buffer_size_in_mb,
        },
        TraceOptions::Simpleperf(simpleperf) => TechnologySettings::Simpleperf {
            sampling_interval_us: simpleperf.sampling_interval_us,
        },
        TraceOptions::Perfetto(perfetto) => TechnologySettings::Perfetto(perfetto.clone()),
    }
}

fn from_legacy(legacy: &LegacyOptions) -> TechnologySettings {
    match legacy.trace_type {
        TraceType::Art | TraceType::Unspecified => TechnologySettings::Art {
            mode: legacy.trace_mode,
            sampling_interval_us: legacy.sampling_interval_us,
            buffer_size_in_mb: legacy.buffer_size_in_mb,
        },
        TraceType::Atrace => TechnologySettings::Atrace {
            buffer_size_in_mb: legacy.buffer_size_in_mb,
        },
        TraceType::Simpleperf => TechnologySettings::Simpleperf {
            sampling_interval_us: legacy.sampling_interval_us,
        },
        TraceType::Perfetto => TechnologySettings::Perfetto(PerfettoOptions {
            buffer_size_kb: legacy.buffer_size_in_mb.saturating_mul(1024),
            data_sources: Vec::new(),
        }),
    }
}

fn apply_defaults(settings: TechnologySettings, defaults: &CpuConfig) -> TechnologySettings {
    match settings {
        TechnologySettings::Atrace { buffer_size_in_mb: 0 } => TechnologySettings::Atrace {
            buffer_size_in_mb: defaults.atrace_buffer_size_mb,
        },
        TechnologySettings::Simpleperf {
            sampling_interval_us: 0,
        } => TechnologySettings::Simpleperf {
            sampling_interval_us: defaults.simpleperf_sampling_interval_us,
        },
        other => other,
    }
}
