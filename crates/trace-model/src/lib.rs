//! profd Trace Model
//!
//! Defines the data contracts shared by the capture orchestrator and its
//! callers:
//! - **Configuration:** what to trace, with which technology and options
//! - **Status:** outcome of starting or stopping a capture
//! - **Record:** bookkeeping for one start-to-stop capture attempt
//! - **Event:** lifecycle events published to the event sink
//! - **Command:** decoded START_TRACE / STOP_TRACE requests
//!
//! All timestamps are nanoseconds read from the daemon clock.

pub mod command;
pub mod configuration;
pub mod event;
pub mod record;
pub mod status;

pub use command::*;
pub use configuration::*;
pub use event::*;
pub use record::*;
pub use status::*;
