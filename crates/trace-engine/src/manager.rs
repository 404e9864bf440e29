//! The trace manager: owner of every capture's state.
//!
//! One mutex guards the capture history and the backends. Each public method
//! holds it for its whole duration, so the methods are individually atomic.
//! Backends are called under the lock: a slow stop serializes other capture
//! operations, never command dispatch (stops run off the dispatch path).

use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use profd_common::clock::Clock;
use profd_common::config::CpuConfig;
use profd_trace_model::configuration::TraceConfiguration;
use profd_trace_model::record::{CaptureRecord, TimestampNs};
use profd_trace_model::status::{StopStatusCode, TraceStartStatus, TraceStopStatus};

use crate::backend::{Backends, StartRequest, StopRequest};
use crate::history::CaptureHistory;
use crate::resolve::resolve_technology;

struct ManagerState {
    history: CaptureHistory,
    backends: Backends,
}

pub struct TraceManager {
    clock: Arc<dyn Clock>,
    config: CpuConfig,
    state: Mutex<ManagerState>,
}

impl TraceManager {
    pub fn new(clock: Arc<dyn Clock>, config: CpuConfig, backends: Backends) -> Self {
        Self {
            clock,
            config,
            state: Mutex::new(ManagerState {
                history: CaptureHistory::default(),
                backends,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, ManagerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Start a capture for `configuration.app_name`.
    ///
    /// Fails without touching any backend if the app already has an open
    /// capture. API-initiated captures only record bookkeeping, starting at
    /// `request_timestamp`; all others start exactly one backend.
    pub fn start_capture(
        &self,
        request_timestamp: TimestampNs,
        configuration: &TraceConfiguration,
    ) -> Result<CaptureRecord, TraceStartStatus> {
        let mut guard = self.lock();
        let state = &mut *guard;
        let app_name = configuration.app_name.as_str();

        if state.history.ongoing(app_name).is_some() {
            tracing::warn!(app = app_name, "Start rejected: capture already in progress");
            return Err(TraceStartStatus::failure("ongoing capture already exists"));
        }

        let startup = configuration.is_startup_initiated();
        if !configuration.is_api_initiated() {
            let Some(settings) = resolve_technology(configuration, &self.config) else {
                tracing::warn!(app = app_name, "Start rejected: no tracing options");
                return Err(TraceStartStatus::failure(
                    "No technology-specific tracing options set.",
                ));
            };
            let technology = settings.technology();
            let request = StartRequest {
                app_name,
                settings: &settings,
                abi_cpu_arch: &configuration.abi_cpu_arch,
                staging_path: Path::new(&configuration.temp_path),
                startup,
            };
            let backend = state.backends.get_mut(technology);
            if let Err(message) = backend.start_profiling(&request) {
                tracing::warn!(
                    app = app_name,
                    backend = backend.name(),
                    error = %message,
                    "Backend failed to start"
                );
                return Err(TraceStartStatus::failure(message));
            }
            tracing::info!(app = app_name, backend = backend.name(), startup, "Capture started");
        } else {
            tracing::info!(app = app_name, "API-initiated capture started");
        }

        let now = self.clock.now_ns();
        let start_timestamp = if configuration.is_api_initiated() {
            request_timestamp
        } else {
            now
        };
        let record = state.history.push(CaptureRecord {
            app_name: app_name.to_string(),
            trace_id: now,
            start_timestamp,
            end_timestamp: None,
            configuration: configuration.clone(),
            start_status: TraceStartStatus::success(start_timestamp),
            stop_status: None,
            startup_profiling: startup,
        });
        Ok(record.clone())
    }

    /// Stop the ongoing capture of `app_name`.
    ///
    /// `Err` only when there is nothing to stop. Otherwise the capture is
    /// closed and returned, with the backend's verdict in `stop_status`.
    /// The backend is the one the capture was started on, re-derived from
    /// the stored configuration.
    pub fn stop_capture(
        &self,
        request_timestamp: TimestampNs,
        app_name: &str,
        need_trace_response: bool,
    ) -> Result<CaptureRecord, TraceStopStatus> {
        let mut guard = self.lock();
        let state = &mut *guard;

        let Some(capture) = state.history.ongoing_mut(app_name) else {
            return Err(TraceStopStatus::new(
                StopStatusCode::NoOngoingProfiling,
                "No ongoing capture exists",
            ));
        };

        if capture.configuration.is_api_initiated() {
            capture.end_timestamp = Some(request_timestamp);
            capture.stop_status = Some(TraceStopStatus::success());
            tracing::info!(app = app_name, "API-initiated capture stopped");
            return Ok(capture.clone());
        }

        let status = match resolve_technology(&capture.configuration, &self.config) {
            Some(settings) => {
                let technology = settings.technology();
                let request = StopRequest {
                    app_name,
                    need_trace_response,
                    timeout: Duration::from_secs(u64::from(self.config.art_stop_timeout_sec)),
                    startup: capture.startup_profiling,
                };
                let stop_begin = self.clock.now_ns();
                let backend = state.backends.get_mut(technology);
                let outcome = backend.stop_profiling(&request);
                let stop_end = self.clock.now_ns();
                capture.end_timestamp = Some(stop_end);
                tracing::info!(
                    app = app_name,
                    backend = backend.name(),
                    status = ?outcome.code,
                    duration_ms = profd_common::clock::ns_to_ms(stop_end - stop_begin),
                    "Capture stopped"
                );
                TraceStopStatus {
                    status: outcome.code,
                    error_message: outcome.message,
                    stopping_duration_ns: stop_end - stop_begin,
                }
            }
            // Unreachable for records created by start_capture; close it anyway.
            None => {
                capture.end_timestamp = Some(self.clock.now_ns());
                TraceStopStatus::new(
                    StopStatusCode::OtherFailure,
                    "No technology-specific tracing options set.",
                )
            }
        };
        capture.stop_status = Some(status);
        Ok(capture.clone())
    }

    /// The open capture of `app_name`, if any.
    pub fn get_ongoing_capture(&self, app_name: &str) -> Option<CaptureRecord> {
        self.lock().history.ongoing(app_name).cloned()
    }

    /// Captures of `app_name` whose time range intersects `[from, to]`,
    /// oldest first.
    pub fn get_captures(
        &self,
        app_name: &str,
        from: TimestampNs,
        to: TimestampNs,
    ) -> Vec<CaptureRecord> {
        let state = self.lock();
        state
            .history
            .ring(app_name)
            .map(|ring| {
                ring.iter()
                    .filter(|record| record.overlaps(from, to))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Replace the stop status of a stored capture. Returns false if the
    /// capture has been evicted.
    pub fn update_stop_status(&self, app_name: &str, trace_id: i64, status: TraceStopStatus) -> bool {
        match self.lock().history.find_mut(app_name, trace_id) {
            Some(record) => {
                record.stop_status = Some(status);
                true
            }
            None => false,
        }
    }
}
