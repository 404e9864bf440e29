//! STOP_TRACE handler.
//!
//! Stopping a backend can take seconds (flushing buffers, converting trace
//! files), so the whole procedure runs on a blocking background task that
//! owns its inputs.

use std::path::Path;
use std::sync::Arc;

use profd_common::error::{ProfdError, ProfdResult};
use profd_trace_model::command::{Command, CommandKind, StopTraceCommand};
use profd_trace_model::configuration::ProfilerType;
use profd_trace_model::record::CaptureRecord;
use profd_trace_model::status::{StopStatusCode, TraceStopStatus};
use tokio::runtime::Handle;
use tokio::task::JoinHandle;

use crate::daemon::Daemon;
use crate::event_utils::{group_id, trace_ended_event, trace_stop_status_event};
use crate::manager::TraceManager;
use crate::session::SessionControl;

pub struct StopTrace {
    command: Command,
    stop: StopTraceCommand,
    trace_manager: Arc<TraceManager>,
    sessions: Arc<dyn SessionControl>,
    /// End the issuing session once the trace has ended.
    task_based_ux: bool,
}

impl StopTrace {
    pub fn create(
        command: Command,
        trace_manager: Arc<TraceManager>,
        sessions: Arc<dyn SessionControl>,
        task_based_ux: bool,
    ) -> ProfdResult<Self> {
        let CommandKind::StopTrace(stop) = &command.kind else {
            return Err(ProfdError::invalid_command("expected STOP_TRACE"));
        };
        let stop = stop.clone();
        Ok(Self {
            command,
            stop,
            trace_manager,
            sessions,
            task_based_ux,
        })
    }

    /// Run the stop procedure on `runtime`'s blocking pool.
    pub fn execute_on(self, daemon: Arc<Daemon>, runtime: &Handle) -> JoinHandle<()> {
        runtime.spawn_blocking(move || self.run(&daemon))
    }

    fn run(&self, daemon: &Daemon) {
        let app_name = self.stop.configuration.app_name.as_str();
        let profiler_type = self.stop.profiler_type;

        let ongoing = self.trace_manager.get_ongoing_capture(app_name);
        let rejection = match (&ongoing, profiler_type) {
            (None, _) => Some(TraceStopStatus::new(
                StopStatusCode::NoOngoingProfiling,
                "No ongoing capture exists",
            )),
            (Some(_), ProfilerType::Unspecified) => Some(TraceStopStatus::new(
                StopStatusCode::NoTraceTypeSpecifiedStop,
                "No trace type specified.",
            )),
            _ => None,
        };
        if let Some(status) = rejection {
            tracing::warn!(app = app_name, status = ?status.status, "STOP_TRACE rejected");
            daemon.events().add(trace_stop_status_event(
                &self.command,
                profiler_type,
                &status,
                ongoing.as_ref(),
            ));
            self.end_session_if_task_based(daemon);
            return;
        }

        let request_timestamp = self
            .stop
            .api_stop_metadata
            .as_ref()
            .map_or_else(|| daemon.clock().now_ns(), |m| m.stop_timestamp);
        let capture = match self.trace_manager.stop_capture(
            request_timestamp,
            app_name,
            self.stop.need_trace_response,
        ) {
            Ok(capture) => capture,
            // Another stop closed the capture after our lookup.
            Err(status) => {
                daemon.events().add(trace_stop_status_event(
                    &self.command,
                    profiler_type,
                    &status,
                    None,
                ));
                self.end_session_if_task_based(daemon);
                return;
            }
        };

        let status = capture.stop_status.clone().unwrap_or_default();
        daemon.events().add(trace_stop_status_event(
            &self.command,
            profiler_type,
            &status,
            Some(&capture),
        ));

        let capture = if status.is_success() && self.stop.need_trace_response {
            self.relocate_trace(daemon, capture)
        } else {
            capture
        };

        if let Some(event) = trace_ended_event(&self.command, profiler_type, &capture) {
            daemon.events().add(event);
        }
        self.end_session_if_task_based(daemon);
    }

    /// Move the backend's output into the file cache. On failure the stored
    /// stop status is downgraded to CANNOT_READ_FILE.
    fn relocate_trace(&self, daemon: &Daemon, mut capture: CaptureRecord) -> CaptureRecord {
        if capture.configuration.is_api_initiated() {
            // The app uploads its own bytes under the payload name.
            tracing::debug!(
                app = %capture.app_name,
                payload = self.stop.api_stop_metadata.as_ref().map(|m| m.payload_name.as_str()),
                "Skipping relocation of API-initiated trace"
            );
            return capture;
        }

        let key = group_id(self.stop.profiler_type, &capture).to_string();
        let staging_path = Path::new(&capture.configuration.temp_path);
        match daemon
            .file_cache()
            .move_to_complete_cache(&key, staging_path)
        {
            Ok(path) => {
                tracing::info!(app = %capture.app_name, path = %path.display(), "Trace stored");
            }
            Err(e) => {
                tracing::warn!(app = %capture.app_name, error = %e, "Failed to relocate trace");
                let mut downgraded = capture.stop_status.clone().unwrap_or_default();
                downgraded.status = StopStatusCode::CannotReadFile;
                downgraded.error_message = format!("Failed to read trace from device: {e}");
                self.trace_manager.update_stop_status(
                    &capture.app_name,
                    capture.trace_id,
                    downgraded.clone(),
                );
                capture.stop_status = Some(downgraded);
            }
        }
        capture
    }

    fn end_session_if_task_based(&self, daemon: &Daemon) {
        if self.task_based_ux {
            self.sessions.end_session(daemon, self.command.session_id);
        }
    }
}
