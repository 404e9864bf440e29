//! profd Common Utilities
//!
//! Shared infrastructure for all profd crates:
//! - Error types and result aliases
//! - Daemon clocks (monotonic and fake)
//! - Tracing/logging initialization
//! - Daemon configuration loading

pub mod clock;
pub mod config;
pub mod error;
pub mod logging;

pub use clock::*;
pub use config::*;
pub use error::*;
