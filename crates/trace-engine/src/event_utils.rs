//! Construction of trace lifecycle events.
//!
//! Group ids follow the profiler type: CPU captures are keyed by trace id,
//! memory captures by start timestamp. The same key names the completed
//! trace file in the file cache.

use profd_trace_model::command::Command;
use profd_trace_model::configuration::ProfilerType;
use profd_trace_model::event::{Event, EventKind, EventPayload, TraceData, TraceStatusData};
use profd_trace_model::record::{CaptureRecord, TraceInfo};
use profd_trace_model::status::{TraceStartStatus, TraceStopStatus};

/// Correlation key of a capture's events.
pub fn group_id(profiler_type: ProfilerType, capture: &CaptureRecord) -> i64 {
    match profiler_type {
        ProfilerType::Memory => capture.start_timestamp,
        ProfilerType::Cpu | ProfilerType::Unspecified => capture.trace_id,
    }
}

fn status_event(command: &Command, group_id: i64, payload: TraceStatusData) -> Event {
    Event {
        pid: command.pid,
        kind: EventKind::TraceStatus,
        group_id,
        is_ended: true,
        command_id: command.command_id,
        timestamp: 0,
        payload: EventPayload::TraceStatus(payload),
    }
}

pub fn trace_start_status_event(
    command: &Command,
    profiler_type: ProfilerType,
    status: &TraceStartStatus,
    capture: Option<&CaptureRecord>,
) -> Event {
    status_event(
        command,
        capture.map_or(0, |c| group_id(profiler_type, c)),
        TraceStatusData::Start(status.clone()),
    )
}

pub fn trace_stop_status_event(
    command: &Command,
    profiler_type: ProfilerType,
    status: &TraceStopStatus,
    capture: Option<&CaptureRecord>,
) -> Event {
    status_event(
        command,
        capture.map_or(0, |c| group_id(profiler_type, c)),
        TraceStatusData::Stop(status.clone()),
    )
}

fn data_event(
    command: &Command,
    profiler_type: ProfilerType,
    capture: &CaptureRecord,
    ended: bool,
) -> Option<Event> {
    let kind = EventKind::for_profiler(profiler_type)?;
    let info = TraceInfo::from(capture);
    Some(Event {
        pid: command.pid,
        kind,
        group_id: group_id(profiler_type, capture),
        is_ended: ended,
        command_id: command.command_id,
        timestamp: 0,
        payload: EventPayload::TraceData(if ended {
            TraceData::Ended(info)
        } else {
            TraceData::Started(info)
        }),
    })
}

/// "Trace started" data event; `None` for an unspecified profiler type.
pub fn trace_started_event(
    command: &Command,
    profiler_type: ProfilerType,
    capture: &CaptureRecord,
) -> Option<Event> {
    data_event(command, profiler_type, capture, false)
}

/// "Trace ended" data event; `None` for an unspecified profiler type.
pub fn trace_ended_event(
    command: &Command,
    profiler_type: ProfilerType,
    capture: &CaptureRecord,
) -> Option<Event> {
    data_event(command, profiler_type, capture, true)
}
