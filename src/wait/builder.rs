//! Builder for constructing ChangeWaiter instances.

use crate::error::{Result, WaitError};
use crate::wait::ChangeWaiter;
use std::time::Duration;

/// Builder for constructing a [`ChangeWaiter`].
///
/// # Examples
///
/// ```rust
/// use observation_test_utils::prelude::*;
/// use std::time::Duration;
///
/// let waiter = ChangeWaiter::builder()
///     .timeout_secs(0.5)
///     .timeout_scale(4.0)
///     .description("profile loaded")
///     .build()?;
///
/// assert_eq!(waiter.timeout(), Duration::from_secs(2));
/// # Ok::<(), WaitError>(())
/// ```
#[derive(Debug, Clone)]
pub struct ChangeWaiterBuilder {
    timeout_secs: f64,
    timeout_scale: f64,
    description: Option<String>,
}

impl ChangeWaiterBuilder {
    /// Create a new builder with a one second timeout and no scaling.
    pub fn new() -> Self {
        Self {
            timeout_secs: ChangeWaiter::DEFAULT_TIMEOUT.as_secs_f64(),
            timeout_scale: 1.0,
            description: None,
        }
    }

    /// Set the timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout_secs = timeout.as_secs_f64();
        self
    }

    /// Set the timeout in seconds.
    ///
    /// Negative, NaN or infinite values are rejected by [`build`](Self::build);
    /// zero is accepted and times out immediately.
    pub fn timeout_secs(mut self, secs: f64) -> Self {
        self.timeout_secs = secs;
        self
    }

    /// Multiply the timeout by `scale`, e.g. to give slow CI hosts more time.
    pub fn timeout_scale(mut self, scale: f64) -> Self {
        self.timeout_scale = scale;
        self
    }

    /// Set the description reported in timeout errors.
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Build the waiter.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The timeout is negative, NaN or infinite ([`WaitError::InvalidTimeout`])
    /// - The scale is not a positive finite number ([`WaitError::InvalidScale`])
    /// - The scaled timeout does not fit in a `Duration`
    pub fn build(self) -> Result<ChangeWaiter> {
        if !self.timeout_secs.is_finite() || self.timeout_secs < 0.0 {
            return Err(WaitError::InvalidTimeout(self.timeout_secs));
        }
        if !self.timeout_scale.is_finite() || self.timeout_scale <= 0.0 {
            return Err(WaitError::InvalidScale(self.timeout_scale));
        }

        let scaled = self.timeout_secs * self.timeout_scale;
        let timeout =
            Duration::try_from_secs_f64(scaled).map_err(|_| WaitError::InvalidTimeout(scaled))?;

        let waiter = match self.description {
            Some(description) => ChangeWaiter::from_parts(timeout, description),
            None => ChangeWaiter::with_timeout(timeout),
        };
        Ok(waiter)
    }
}

impl Default for ChangeWaiterBuilder {
    fn default() -> Self {
        Self::new()
    }
}
