//! In-process backend that behaves like a tracing driver without tracing.
//!
//! Used by the `profd` CLI and the tests. Stopping with a trace response
//! writes a small placeholder trace to the staging path so the relocation
//! path runs for real.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use profd_trace_model::status::StopStatusCode;

use super::{StartRequest, StopOutcome, StopRequest, TraceBackend};
use crate::resolve::{Technology, TechnologySettings};

/// A start call as seen by a simulated backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StartCall {
    pub app_name: String,
    pub settings: TechnologySettings,
    pub abi_cpu_arch: String,
    pub staging_path: PathBuf,
    pub startup: bool,
}

/// A stop call as seen by a simulated backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StopCall {
    pub app_name: String,
    pub need_trace_response: bool,
    pub timeout: Duration,
}

#[derive(Debug, Default)]
struct SimulatedState {
    /// App name -> staging path of captures in progress.
    active: HashMap<String, PathBuf>,
    fail_start: Option<String>,
    stop_failure: Option<StopOutcome>,
    stop_delay: Duration,
    start_calls: Vec<StartCall>,
    stop_calls: Vec<StopCall>,
}

pub struct SimulatedBackend {
    technology: Technology,
    state: Arc<Mutex<SimulatedState>>,
}

/// Shared view of a [`SimulatedBackend`] for scripting and inspection.
#[derive(Debug, Clone)]
pub struct SimulatedHandle {
    state: Arc<Mutex<SimulatedState>>,
}

impl SimulatedBackend {
    pub fn new(technology: Technology) -> (Self, SimulatedHandle) {
        let state = Arc::new(Mutex::new(SimulatedState::default()));
        let handle = SimulatedHandle {
            state: Arc::clone(&state),
        };
        (Self { technology, state }, handle)
    }
}

fn lock(state: &Mutex<SimulatedState>) -> MutexGuard<'_, SimulatedState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

impl TraceBackend for SimulatedBackend {
    fn name(&self) -> &str {
        self.technology.name()
    }

    fn start_profiling(&mut self, request: &StartRequest<'_>) -> Result<(), String> {
        let mut state = lock(&self.state);
        state.start_calls.push(StartCall {
            app_name: request.app_name.to_string(),
            settings: request.settings.clone(),
            abi_cpu_arch: request.abi_cpu_arch.to_string(),
            staging_path: request.staging_path.to_path_buf(),
            startup: request.startup,
        });

        if let Some(message) = &state.fail_start {
            return Err(message.clone());
        }
        if state.active.contains_key(request.app_name) {
            return Err(format!(
                "{} is already tracing {}",
                self.technology.name(),
                request.app_name
            ));
        }

        state.active.insert(
            request.app_name.to_string(),
            request.staging_path.to_path_buf(),
        );
        tracing::debug!(
            backend = self.technology.name(),
            app = request.app_name,
            "Simulated capture started"
        );
        Ok(())
    }

    fn stop_profiling(&mut self, request: &StopRequest<'_>) -> StopOutcome {
        let (staging_path, delay, failure) = {
            let mut state = lock(&self.state);
            state.stop_calls.push(StopCall {
                app_name: request.app_name.to_string(),
                need_trace_response: request.need_trace_response,
                timeout: request.timeout,
            });
            let Some(staging_path) = state.active.remove(request.app_name) else {
                return StopOutcome::failure(
                    StopStatusCode::NoOngoingProfiling,
                    "App is not being profiled.",
                );
            };
            (staging_path, state.stop_delay, state.stop_failure.clone())
        };

        if !delay.is_zero() {
            std::thread::sleep(delay);
        }
        if let Some(failure) = failure {
            return failure;
        }
        if request.need_trace_response {
            if let Err(e) = write_placeholder_trace(&staging_path, self.technology) {
                return StopOutcome::failure(
                    StopStatusCode::CannotFormFile,
                    format!("Failed to write {}: {e}", staging_path.display()),
                );
            }
        }
        StopOutcome::success()
    }
}

fn write_placeholder_trace(path: &Path, technology: Technology) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, format!("simulated {} trace\n", technology.name()))
}

impl SimulatedHandle {
    /// Make every subsequent start fail with `message`.
    pub fn fail_start(&self, message: impl Into<String>) {
        lock(&self.state).fail_start = Some(message.into());
    }

    /// Make every subsequent stop report `code` with `message`.
    pub fn fail_stop(&self, code: StopStatusCode, message: impl Into<String>) {
        lock(&self.state).stop_failure = Some(StopOutcome::failure(code, message));
    }

    /// Block each stop for `delay` before returning.
    pub fn set_stop_delay(&self, delay: Duration) {
        lock(&self.state).stop_delay = delay;
    }

    pub fn is_tracing(&self, app_name: &str) -> bool {
        lock(&self.state).active.contains_key(app_name)
    }

    pub fn start_calls(&self) -> Vec<StartCall> {
        lock(&self.state).start_calls.clone()
    }

    pub fn stop_calls(&self) -> Vec<StopCall> {
        lock(&self.state).stop_calls.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn start_request<'a>(
        settings: &'a TechnologySettings,
        staging_path: &'a Path,
    ) -> StartRequest<'a> {
        StartRequest {
            app_name: "app",
            settings,
            abi_cpu_arch: "arm64",
            staging_path,
            startup: false,
        }
    }

    fn stop_request(need_trace_response: bool) -> StopRequest<'static> {
        StopRequest {
            app_name: "app",
            need_trace_response,
            timeout: Duration::from_secs(1),
            startup: false,
        }
    }

    #[test]
    fn test_second_start_for_same_app_fails() {
        let (mut backend, handle) = SimulatedBackend::new(Technology::Perfetto);
        let settings = TechnologySettings::Perfetto(Default::default());
        let staging = PathBuf::from("/tmp/unused");
        backend
            .start_profiling(&start_request(&settings, &staging))
            .unwrap();
        let err = backend
            .start_profiling(&start_request(&settings, &staging))
            .unwrap_err();
        assert!(err.contains("already tracing"));
        assert_eq!(handle.start_calls().len(), 2);
        assert!(handle.is_tracing("app"));
    }

    #[test]
    fn test_stop_without_start_reports_no_ongoing_profiling() {
        let (mut backend, _handle) = SimulatedBackend::new(Technology::Atrace);
        let outcome = backend.stop_profiling(&stop_request(false));
        assert_eq!(outcome.code, StopStatusCode::NoOngoingProfiling);
    }

    #[test]
    fn test_stop_with_response_writes_staging_file() {
        let dir = std::env::temp_dir().join("profd_test_simulated_backend");
        let _ = std::fs::remove_dir_all(&dir);
        let staging = dir.join("trace.tmp");

        let (mut backend, handle) = SimulatedBackend::new(Technology::Simpleperf);
        let settings = TechnologySettings::Simpleperf {
            sampling_interval_us: 100,
        };
        backend
            .start_profiling(&start_request(&settings, &staging))
            .unwrap();
        let outcome = backend.stop_profiling(&stop_request(true));

        assert_eq!(outcome, StopOutcome::success());
        assert!(staging.exists());
        assert!(!handle.is_tracing("app"));

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_scripted_stop_failure() {
        let (mut backend, handle) = SimulatedBackend::new(Technology::Atrace);
        handle.fail_stop(
            StopStatusCode::CannotDisableTraceProperty,
            "debug.atrace.tags.enableflags still set",
        );
        let settings = TechnologySettings::Atrace {
            buffer_size_in_mb: 8,
        };
        let staging = PathBuf::from("/tmp/unused");
        backend
            .start_profiling(&start_request(&settings, &staging))
            .unwrap();
        let outcome = backend.stop_profiling(&stop_request(false));
        assert_eq!(outcome.code, StopStatusCode::CannotDisableTraceProperty);
        assert_eq!(outcome.message, "debug.atrace.tags.enableflags still set");
    }
}
