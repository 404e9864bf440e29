//! START_TRACE handler.

use std::sync::Arc;

use profd_common::error::{ProfdError, ProfdResult};
use profd_trace_model::command::{Command, CommandKind, StartTraceCommand};
use profd_trace_model::configuration::ProfilerType;
use profd_trace_model::status::{StartErrorCode, StartStatusCode, TraceStartStatus};

use crate::daemon::Daemon;
use crate::event_utils::{trace_start_status_event, trace_started_event};
use crate::manager::TraceManager;
use crate::session::SessionControl;

pub struct StartTrace {
    command: Command,
    start: StartTraceCommand,
    trace_manager: Arc<TraceManager>,
    sessions: Arc<dyn SessionControl>,
}

impl StartTrace {
    pub fn create(
        command: Command,
        trace_manager: Arc<TraceManager>,
        sessions: Arc<dyn SessionControl>,
    ) -> ProfdResult<Self> {
        let CommandKind::StartTrace(start) = &command.kind else {
            return Err(ProfdError::invalid_command("expected START_TRACE"));
        };
        let start = start.clone();
        Ok(Self {
            command,
            start,
            trace_manager,
            sessions,
        })
    }

    /// Start the capture and publish its status event, followed by a
    /// "trace started" event on success. Both go through the session
    /// manager so they wait for a session that does not exist yet.
    pub fn execute_on(&self, daemon: &Daemon) {
        let app_name = self.start.configuration.app_name.as_str();
        let profiler_type = self.start.profiler_type;

        let (capture, status) = if profiler_type == ProfilerType::Unspecified {
            tracing::warn!(app = app_name, "START_TRACE without a trace type");
            let status = TraceStartStatus {
                status: StartStatusCode::Failure,
                error_code: StartErrorCode::NoTraceTypeSpecified,
                error_message: "No trace type specified.".to_string(),
                start_time_ns: 0,
            };
            (None, status)
        } else {
            let request_timestamp = self
                .start
                .api_start_metadata
                .map_or_else(|| daemon.clock().now_ns(), |m| m.start_timestamp);
            match self
                .trace_manager
                .start_capture(request_timestamp, &self.start.configuration)
            {
                Ok(capture) => {
                    let status = capture.start_status.clone();
                    (Some(capture), status)
                }
                Err(status) => (None, status),
            }
        };

        let mut events = vec![trace_start_status_event(
            &self.command,
            profiler_type,
            &status,
            capture.as_ref(),
        )];
        if let Some(capture) = &capture {
            events.extend(trace_started_event(&self.command, profiler_type, capture));
        }
        self.sessions.send_or_queue_events(daemon, app_name, events);
    }
}
