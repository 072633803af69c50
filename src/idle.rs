//! Idle time sources.
//!
//! This module provides a generic abstraction over the platform's
//! input-activity tracker, reporting milliseconds since the last user input.

mod x11;

use thiserror::Error;
pub use x11::X11IdleSource;

/// Trait for idle time sources.
pub trait IdleSource {
    /// Milliseconds elapsed since the last detected user input event.
    fn sample_idle_ms(&mut self) -> Result<u64, IdleError>;
}

/// Errors that can occur in idle time sampling.
#[derive(Error, Debug)]
pub enum IdleError {
    #[error("Display connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Idle counter extension not supported: {0}")]
    ExtensionMissing(String),

    #[error("Idle query failed: {0}")]
    QueryFailed(String),
}
