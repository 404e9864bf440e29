//! Decoded inbound commands.

use serde::{Deserialize, Serialize};

use crate::configuration::{ProfilerType, TraceConfiguration};
use crate::record::TimestampNs;

/// A command addressed to the daemon, already decoded by the transport.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Command {
    /// Correlation id echoed on every event the command produces.
    pub command_id: i32,
    /// Process the command targets.
    pub pid: i32,
    /// Session that issued the command.
    pub session_id: i64,
    #[serde(flatten)]
    pub kind: CommandKind,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CommandKind {
    StartTrace(StartTraceCommand),
    StopTrace(StopTraceCommand),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct StartTraceCommand {
    pub configuration: TraceConfiguration,
    pub profiler_type: ProfilerType,
    pub api_start_metadata: Option<ApiStartMetadata>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct StopTraceCommand {
    pub configuration: TraceConfiguration,
    pub profiler_type: ProfilerType,
    pub api_stop_metadata: Option<ApiStopMetadata>,
    /// Whether the backend should hand back the trace bytes.
    pub need_trace_response: bool,
}

/// Start time reported by an application that traces itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiStartMetadata {
    pub start_timestamp: TimestampNs,
}

/// Stop time and payload name reported by an application that traces itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiStopMetadata {
    pub stop_timestamp: TimestampNs,
    /// Name under which the application uploads its trace bytes.
    pub payload_name: String,
}

impl Command {
    pub fn start_trace(command_id: i32, pid: i32, session_id: i64, start: StartTraceCommand) -> Self {
        Self {
            command_id,
            pid,
            session_id,
            kind: CommandKind::StartTrace(start),
        }
    }

    pub fn stop_trace(command_id: i32, pid: i32, session_id: i64, stop: StopTraceCommand) -> Self {
        Self {
            command_id,
            pid,
            session_id,
            kind: CommandKind::StopTrace(stop),
        }
    }

    /// Application the command targets.
    pub fn app_name(&self) -> &str {
        match &self.kind {
            CommandKind::StartTrace(start) => &start.configuration.app_name,
            CommandKind::StopTrace(stop) => &stop.configuration.app_name,
        }
    }
}
