//! Daemon context shared by command handlers.

use std::sync::Arc;

use profd_common::clock::Clock;
use profd_common::config::DaemonConfig;
use profd_trace_model::event::Event;
use tokio::sync::mpsc;

use crate::file_cache::FileCache;

/// Receiving end of the daemon's event stream.
pub type EventStream = mpsc::UnboundedReceiver<Event>;

/// Stamps events and hands them to the event sink.
#[derive(Clone)]
pub struct EventBuffer {
    clock: Arc<dyn Clock>,
    sender: mpsc::UnboundedSender<Event>,
}

impl EventBuffer {
    pub fn new(clock: Arc<dyn Clock>) -> (Self, EventStream) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { clock, sender }, receiver)
    }

    /// Publish an event. Events without a timestamp get the current time.
    pub fn add(&self, mut event: Event) {
        if event.timestamp == 0 {
            event.timestamp = self.clock.now_ns();
        }
        tracing::debug!(kind = ?event.kind, group_id = event.group_id, "Publishing event");
        if self.sender.send(event).is_err() {
            tracing::debug!("Event stream closed; dropping event");
        }
    }
}

/// Clock, event buffer, file cache and configuration of a running daemon.
pub struct Daemon {
    clock: Arc<dyn Clock>,
    config: DaemonConfig,
    events: EventBuffer,
    file_cache: FileCache,
}

impl Daemon {
    pub fn new(clock: Arc<dyn Clock>, config: DaemonConfig) -> (Self, EventStream) {
        let (events, stream) = EventBuffer::new(Arc::clone(&clock));
        let file_cache = FileCache::new(&config.cache_dir);
        let daemon = Self {
            clock,
            config,
            events,
            file_cache,
        };
        (daemon, stream)
    }

    pub fn clock(&self) -> &dyn Clock {
        self.clock.as_ref()
    }

    pub fn config(&self) -> &DaemonConfig {
        &self.config
    }

    pub fn events(&self) -> &EventBuffer {
        &self.events
    }

    pub fn file_cache(&self) -> &FileCache {
        &self.file_cache
    }
}
