//! Bookkeeping for one capture attempt.

use serde::{Deserialize, Serialize};

use crate::configuration::TraceConfiguration;
use crate::status::{TraceStartStatus, TraceStopStatus};

/// Nanosecond timestamp on the daemon clock.
pub type TimestampNs = i64;

/// One start-to-stop capture of a single application.
///
/// Created when a start succeeds and closed in place when the capture is
/// stopped. `end_timestamp` is `None` while the capture is open.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaptureRecord {
    pub app_name: String,
    pub trace_id: i64,
    pub start_timestamp: TimestampNs,
    pub end_timestamp: Option<TimestampNs>,
    pub configuration: TraceConfiguration,
    pub start_status: TraceStartStatus,
    /// Populated once the capture is closed.
    pub stop_status: Option<TraceStopStatus>,
    /// The backend was started in startup mode.
    pub startup_profiling: bool,
}

impl CaptureRecord {
    pub fn is_open(&self) -> bool {
        self.end_timestamp.is_none()
    }

    /// Whether this capture's time range intersects `[from, to]`.
    ///
    /// Open captures extend indefinitely and are never excluded by `from`.
    pub fn overlaps(&self, from: TimestampNs, to: TimestampNs) -> bool {
        if self.start_timestamp > to {
            return false;
        }
        match self.end_timestamp {
            Some(end) => end >= from,
            None => true,
        }
    }
}

/// Snapshot of a capture carried by trace data events.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraceInfo {
    pub trace_id: i64,
    pub from_timestamp: TimestampNs,
    /// `None` while the capture is still open.
    pub to_timestamp: Option<TimestampNs>,
    pub configuration: TraceConfiguration,
    pub start_status: TraceStartStatus,
    pub stop_status: Option<TraceStopStatus>,
}

impl From<&CaptureRecord> for TraceInfo {
    fn from(record: &CaptureRecord) -> Self {
        Self {
            trace_id: record.trace_id,
            from_timestamp: record.start_timestamp,
            to_timestamp: record.end_timestamp,
            configuration: record.configuration.clone(),
            start_status: record.start_status.clone(),
            stop_status: record.stop_status.clone(),
        }
    }
}
