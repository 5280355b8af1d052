//! Warden Core - shared infrastructure for the session and authorization crates
//!
//! Errors, structured logging, layered configuration and the diagnostics sink
//! live here so that every other crate reports failures the same way.

pub mod config;
pub mod diagnostics;
pub mod error;
pub mod logging;

pub use config::*;
pub use diagnostics::*;
pub use error::*;
pub use logging::*;

// Re-export commonly used external types
pub use tracing;
