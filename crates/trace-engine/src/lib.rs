//! profd Trace Engine
//!
//! Orchestrates trace captures for the profiler daemon. A decoded command
//! reaches a handler, the handler asks the [`TraceManager`] to start or stop
//! a capture, and the outcome is published as lifecycle events.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────┐
//! │        StartTrace / StopTrace handlers           │
//! │                     │                            │
//! │                     ▼                            │
//! │  ┌────────────────────────────────────────────┐  │
//! │  │ TraceManager (one lock)                    │  │
//! │  │  CaptureHistory: app -> ring of 10 records │  │
//! │  └─────┬─────────┬─────────────┬─────────┬────┘  │
//! │        ▼         ▼             ▼         ▼       │
//! │       ART     atrace      simpleperf  Perfetto   │
//! │                                                  │
//! │  events ──► SessionsManager / EventBuffer        │
//! │  trace bytes ──► FileCache (complete/<key>)      │
//! └──────────────────────────────────────────────────┘
//! ```

pub mod backend;
pub mod commands;
pub mod daemon;
pub mod event_utils;
pub mod file_cache;
pub mod history;
pub mod manager;
pub mod resolve;
pub mod session;

pub use commands::{dispatch, StartTrace, StopTrace};
pub use daemon::{Daemon, EventBuffer, EventStream};
pub use file_cache::FileCache;
pub use history::{CaptureHistory, MAX_CAPTURES_PER_APP};
pub use manager::TraceManager;
pub use resolve::{resolve_technology, Technology, TechnologySettings};
pub use session::{Session, SessionControl, SessionsManager, MAX_QUEUED_EVENTS_PER_APP};
