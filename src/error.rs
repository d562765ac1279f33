//! Error types for observation-test-utils.

use std::time::Duration;

/// Result type alias for wait operations.
pub type Result<T> = std::result::Result<T, WaitError>;

/// Errors that can occur while waiting for an observed property to change.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum WaitError {
    /// The observed property did not change within the allotted time.
    #[error("Timed out after {timeout:?} waiting for '{description}'")]
    Timeout {
        /// Description of the expectation that was not fulfilled
        description: String,
        /// The timeout that elapsed
        timeout: Duration,
    },

    /// A timeout given in seconds was negative, NaN or infinite.
    #[error("Invalid timeout: {0} seconds")]
    InvalidTimeout(f64),

    /// A timeout scale factor was zero, negative, NaN or infinite.
    #[error("Invalid timeout scale: {0}")]
    InvalidScale(f64),

    /// Waiter settings could not be loaded from the environment.
    #[error("Failed to load waiter settings: {0}")]
    Settings(String),
}

impl WaitError {
    /// Create a timeout error for the given expectation description.
    pub fn timeout(description: impl Into<String>, timeout: Duration) -> Self {
        Self::Timeout {
            description: description.into(),
            timeout,
        }
    }

    /// Returns `true` if this error is a timeout.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }
}
