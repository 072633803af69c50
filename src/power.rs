//! Power mode switching.
//!
//! This module provides the abstraction for driving the GPU between
//! power-management states, plus the domain type for those states.

mod nvidia;

use async_trait::async_trait;
pub use nvidia::NvidiaSettings;
use thiserror::Error;

/// Which power-management state the GPU is being driven to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PowerMode {
    /// Power-saving mode (adaptive clocks).
    Low,
    /// High-performance mode (maximum clocks).
    High,
}

impl PowerMode {
    /// Get the mode as a string for log output.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low power",
            Self::High => "high power",
        }
    }
}

/// Trait for mode-switch action invokers.
///
/// Invocations are fire-and-forget: callers log failures and carry on.
/// Implementations must not block indefinitely on a failed action.
#[async_trait]
pub trait PowerSwitch: Send {
    /// Drive the GPU to the given mode.
    async fn activate(&mut self, mode: PowerMode) -> Result<(), SwitchError>;
}

/// Errors that can occur when invoking a mode switch.
#[derive(Error, Debug)]
pub enum SwitchError {
    #[error("Failed to launch {command}: {source}")]
    Launch {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{command} exited with {status}")]
    CommandFailed {
        command: String,
        status: std::process::ExitStatus,
    },
}
