//! Lifecycle events published to the event sink.
//!
//! Consumers correlate the start and end of a capture through `group_id`
//! rather than through a separate session concept.

use serde::{Deserialize, Serialize};

use crate::configuration::ProfilerType;
use crate::record::{TimestampNs, TraceInfo};
use crate::status::{TraceStartStatus, TraceStopStatus};

/// Discriminates how consumers route an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Session,
    TraceStatus,
    CpuTrace,
    MemoryTrace,
}

impl EventKind {
    /// Data event kind for a profiler type; `None` for `Unspecified`.
    pub fn for_profiler(profiler_type: ProfilerType) -> Option<Self> {
        match profiler_type {
            ProfilerType::Cpu => Some(Self::CpuTrace),
            ProfilerType::Memory => Some(Self::MemoryTrace),
            ProfilerType::Unspecified => None,
        }
    }
}

/// A single lifecycle event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    pub pid: i32,
    pub kind: EventKind,
    pub group_id: i64,
    pub is_ended: bool,
    pub command_id: i32,
    /// Daemon time at publication; zero until the event buffer stamps it.
    pub timestamp: TimestampNs,
    #[serde(flatten)]
    pub payload: EventPayload,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "payload", rename_all = "snake_case")]
pub enum EventPayload {
    Session(SessionData),
    TraceStatus(TraceStatusData),
    TraceData(TraceData),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SessionData {
    Started {
        session_id: i64,
        app_name: String,
        start_timestamp: TimestampNs,
    },
    Ended {
        session_id: i64,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "phase", rename_all = "snake_case")]
pub enum TraceStatusData {
    Start(TraceStartStatus),
    Stop(TraceStopStatus),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "phase", rename_all = "snake_case")]
pub enum TraceData {
    Started(TraceInfo),
    Ended(TraceInfo),
}

impl Event {
    pub fn start_status(&self) -> Option<&TraceStartStatus> {
        match &self.payload {
            EventPayload::TraceStatus(TraceStatusData::Start(status)) => Some(status),
            _ => None,
        }
    }

    pub fn stop_status(&self) -> Option<&TraceStopStatus> {
        match &self.payload {
            EventPayload::TraceStatus(TraceStatusData::Stop(status)) => Some(status),
            _ => None,
        }
    }

    /// Trace info of a started or ended data event.
    pub fn trace_info(&self) -> Option<&TraceInfo> {
        match &self.payload {
            EventPayload::TraceData(TraceData::Started(info) | TraceData::Ended(info)) => {
                Some(info)
            }
            _ => None,
        }
    }

    pub fn is_trace_started(&self) -> bool {
        matches!(self.payload, EventPayload::TraceData(TraceData::Started(_)))
    }

    pub fn is_trace_ended(&self) -> bool {
        matches!(self.payload, EventPayload::TraceData(TraceData::Ended(_)))
    }

    pub fn is_session_started(&self) -> bool {
        matches!(self.payload, EventPayload::Session(SessionData::Started { .. }))
    }
}
