use std::path::Path;
use std::time::Duration;

use profd_trace_model::status::StopStatusCode;

use crate::resolve::{Technology, TechnologySettings};

pub mod simulated;

pub use simulated::{SimulatedBackend, SimulatedHandle};

/// Parameters for starting a backend capture.
#[derive(Debug, Clone, Copy)]
pub struct StartRequest<'a> {
    pub app_name: &'a str,
    pub settings: &'a TechnologySettings,
    pub abi_cpu_arch: &'a str,
    /// Where the backend writes trace bytes until they are relocated.
    pub staging_path: &'a Path,
    /// The capture starts together with the app process.
    pub startup: bool,
}

/// Parameters for stopping a backend capture.
#[derive(Debug, Clone, Copy)]
pub struct StopRequest<'a> {
    pub app_name: &'a str,
    /// Produce trace bytes at the staging path.
    pub need_trace_response: bool,
    /// Upper bound the backend may wait for its output to settle.
    pub timeout: Duration,
    /// The capture was started in startup mode.
    pub startup: bool,
}

/// Result of a backend stop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StopOutcome {
    pub code: StopStatusCode,
    pub message: String,
}

impl StopOutcome {
    pub fn success() -> Self {
        Self {
            code: StopStatusCode::Success,
            message: String::new(),
        }
    }

    pub fn failure(code: StopStatusCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

/// Uniform start/stop contract over one tracing technology.
///
/// Calls are made while the trace manager holds its lock: `start_profiling`
/// is expected to return promptly, `stop_profiling` may block while the
/// backend flushes its output.
pub trait TraceBackend: Send {
    /// Backend name for logging.
    fn name(&self) -> &str;

    /// Start tracing. The error string is reported to the client verbatim.
    fn start_profiling(&mut self, request: &StartRequest<'_>) -> Result<(), String>;

    /// Stop tracing.
    fn stop_profiling(&mut self, request: &StopRequest<'_>) -> StopOutcome;
}

/// One adapter per technology, injected into the trace manager.
pub struct Backends {
    pub art: Box<dyn TraceBackend>,
    pub atrace: Box<dyn TraceBackend>,
    pub simpleperf: Box<dyn TraceBackend>,
    pub perfetto: Box<dyn TraceBackend>,
}

impl Backends {
    /// Bundle of simulated backends, one per technology, plus handles to
    /// script and inspect them.
    pub fn simulated() -> (Self, SimulatedHandles) {
        let (art, art_handle) = SimulatedBackend::new(Technology::Art);
        let (atrace, atrace_handle) = SimulatedBackend::new(Technology::Atrace);
        let (simpleperf, simpleperf_handle) = SimulatedBackend::new(Technology::Simpleperf);
        let (perfetto, perfetto_handle) = SimulatedBackend::new(Technology::Perfetto);
        let backends = Self {
            art: Box::new(art),
            atrace: Box::new(atrace),
            simpleperf: Box::new(simpleperf),
            perfetto: Box::new(perfetto),
        };
        let handles = SimulatedHandles {
            art: art_handle,
            atrace: atrace_handle,
            simpleperf: simpleperf_handle,
            perfetto: perfetto_handle,
        };
        (backends, handles)
    }

    pub fn get_mut(&mut self, technology: Technology) -> &mut dyn TraceBackend {
        match technology {
            Technology::Art => self.art.as_mut(),
            Technology::Atrace => self.atrace.as_mut(),
            Technology::Simpleperf => self.simpleperf.as_mut(),
            Technology::Perfetto => self.perfetto.as_mut(),
        }
    }
}

/// Handles to the backends built by [`Backends::simulated`].
#[derive(Debug, Clone)]
pub struct SimulatedHandles {
    pub art: SimulatedHandle,
    pub atrace: SimulatedHandle,
    pub simpleperf: SimulatedHandle,
    pub perfetto: SimulatedHandle,
}

impl SimulatedHandles {
    pub fn get(&self, technology: Technology) -> &SimulatedHandle {
        match technology {
            Technology::Art => &self.art,
            Technology::Atrace => &self.atrace,
            Technology::Simpleperf => &self.simpleperf,
            Technology::Perfetto => &self.perfetto,
        }
    }

    /// Total number of start and stop calls across all backends.
    pub fn total_calls(&self) -> usize {
        [&self.art, &self.atrace, &self.simpleperf, &self.perfetto]
            .iter()
            .map(|h| h.start_calls().len() + h.stop_calls().len())
            .sum()
    }
}
