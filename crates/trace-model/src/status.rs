//! Start/stop outcome of a capture.

use serde::{Deserialize, Serialize};

/// Overall result of a start request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum StartStatusCode {
    #[default]
    Unspecified,
    Success,
    Failure,
}

/// Machine-readable reason attached to a failed start.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum StartErrorCode {
    #[default]
    Unspecified,
    NoTraceTypeSpecified,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct TraceStartStatus {
    pub status: StartStatusCode,
    pub error_code: StartErrorCode,
    pub error_message: String,
    /// Daemon time at which the capture started, set on success.
    pub start_time_ns: i64,
}

impl TraceStartStatus {
    pub fn success(start_time_ns: i64) -> Self {
        Self {
            status: StartStatusCode::Success,
            start_time_ns,
            ..Self::default()
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            status: StartStatusCode::Failure,
            error_message: message.into(),
            ..Self::default()
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == StartStatusCode::Success
    }
}

/// Result of a stop request. Backends report their own failure reasons
/// through the same code space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum StopStatusCode {
    #[default]
    Unspecified,
    Success,
    NoOngoingProfiling,
    AppProcessDied,
    AppPidChanged,
    ProfilerProcessDied,
    StopCommandFailed,
    StillProfilingAfterStop,
    CannotStartWaiting,
    WaitTimeout,
    WaitFailed,
    CannotReadWaitEvent,
    CannotCopyFile,
    CannotFormFile,
    CannotReadFile,
    /// The kernel trace property could not be turned off (atrace).
    CannotDisableTraceProperty,
    /// The sampling subprocess could not be signalled (simpleperf).
    CannotSignalSampler,
    OtherFailure,
    NoTraceTypeSpecifiedStop,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct TraceStopStatus {
    pub status: StopStatusCode,
    pub error_message: String,
    /// Time the backend spent stopping.
    pub stopping_duration_ns: i64,
}

impl TraceStopStatus {
    pub fn new(status: StopStatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            error_message: message.into(),
            stopping_duration_ns: 0,
        }
    }

    pub fn success() -> Self {
        Self::new(StopStatusCode::Success, "")
    }

    pub fn is_success(&self) -> bool {
        self.status == StopStatusCode::Success
    }
}
