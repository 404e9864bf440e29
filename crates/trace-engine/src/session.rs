//! Profiling sessions.
//!
//! A session scopes the events of one profiled app. Trace events for an app
//! whose session does not exist yet (startup and API-initiated traces) are
//! held back and published once the session begins.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use profd_trace_model::event::{Event, EventKind, EventPayload, SessionData};
use profd_trace_model::record::TimestampNs;

use crate::daemon::Daemon;

/// Events held per application while it has no session. The oldest are
/// dropped beyond this.
pub const MAX_QUEUED_EVENTS_PER_APP: usize = 64;

/// What command handlers need from the session manager.
pub trait SessionControl: Send + Sync {
    /// Publish `events` in order if `app_name` has an active session,
    /// otherwise queue them until one begins.
    fn send_or_queue_events(&self, daemon: &Daemon, app_name: &str, events: Vec<Event>);

    /// End the session with `session_id`. Returns false if it is not active.
    fn end_session(&self, daemon: &Daemon, session_id: i64) -> bool;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub session_id: i64,
    pub pid: i32,
    pub app_name: String,
    pub start_timestamp: TimestampNs,
    /// `None` while the session is active.
    pub end_timestamp: Option<TimestampNs>,
}

impl Session {
    pub fn is_active(&self) -> bool {
        self.end_timestamp.is_none()
    }
}

#[derive(Debug, Default)]
struct SessionsState {
    sessions: Vec<Session>,
    pending: HashMap<String, Vec<Event>>,
    next_session_id: i64,
}

/// In-memory session bookkeeping. At most one session is active.
#[derive(Debug, Default)]
pub struct SessionsManager {
    state: Mutex<SessionsState>,
}

impl SessionsManager {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, SessionsState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Begin a session for `app_name`, ending the active one if any, and
    /// flush the events queued for the app.
    pub fn begin_session(&self, daemon: &Daemon, pid: i32, app_name: &str) -> Session {
        let mut state = self.lock();
        let now = daemon.clock().now_ns();

        let active: Vec<i64> = state
            .sessions
            .iter()
            .filter(|s| s.is_active())
            .map(|s| s.session_id)
            .collect();
        for session_id in active {
            end_locked(&mut state, daemon, session_id, now);
        }

        state.next_session_id += 1;
        let session = Session {
            session_id: state.next_session_id,
            pid,
            app_name: app_name.to_string(),
            start_timestamp: now,
            end_timestamp: None,
        };
        state.sessions.push(session.clone());
        tracing::info!(session_id = session.session_id, pid, app = app_name, "Session started");

        daemon.events().add(Event {
            pid,
            kind: EventKind::Session,
            group_id: session.session_id,
            is_ended: false,
            command_id: 0,
            timestamp: now,
            payload: EventPayload::Session(SessionData::Started {
                session_id: session.session_id,
                app_name: app_name.to_string(),
                start_timestamp: now,
            }),
        });

        if let Some(queued) = state.pending.remove(app_name) {
            tracing::debug!(app = app_name, count = queued.len(), "Flushing queued events");
            for event in queued {
                daemon.events().add(event);
            }
        }
        session
    }

    pub fn active_session(&self) -> Option<Session> {
        self.lock().sessions.iter().find(|s| s.is_active()).cloned()
    }

    /// Number of events waiting for a session of `app_name`.
    pub fn queued_events(&self, app_name: &str) -> usize {
        self.lock().pending.get(app_name).map_or(0, Vec::len)
    }
}

fn end_locked(state: &mut SessionsState, daemon: &Daemon, session_id: i64, now: TimestampNs) -> bool {
    let Some(session) = state
        .sessions
        .iter_mut()
        .find(|s| s.session_id == session_id && s.is_active())
    else {
        return false;
    };
    session.end_timestamp = Some(now);
    tracing::info!(session_id, "Session ended");
    daemon.events().add(Event {
        pid: session.pid,
        kind: EventKind::Session,
        group_id: session_id,
        is_ended: true,
        command_id: 0,
        timestamp: now,
        payload: EventPayload::Session(SessionData::Ended { session_id }),
    });
    true
}

impl SessionControl for SessionsManager {
    fn send_or_queue_events(&self, daemon: &Daemon, app_name: &str, events: Vec<Event>) {
        let mut state = self.lock();
        let has_session = state
            .sessions
            .iter()
            .any(|s| s.is_active() && s.app_name == app_name);
        if has_session {
            for event in events {
                daemon.events().add(event);
            }
        } else {
            tracing::debug!(app = app_name, count = events.len(), "No session yet; queueing events");
            let queue = state.pending.entry(app_name.to_string()).or_default();
            queue.extend(events);
            if queue.len() > MAX_QUEUED_EVENTS_PER_APP {
                let dropped = queue.len() - MAX_QUEUED_EVENTS_PER_APP;
                queue.drain(..dropped);
                tracing::warn!(app = app_name, dropped, "Event queue full; dropped oldest events");
            }
        }
    }

    fn end_session(&self, daemon: &Daemon, session_id: i64) -> bool {
        let now = daemon.clock().now_ns();
        end_locked(&mut self.lock(), daemon, session_id, now)
    }
}
