//! Waiter settings loaded from environment variables.

use crate::error::{Result, WaitError};
use crate::wait::ChangeWaiter;
use config::Environment;
use serde::Deserialize;

/// Prefix of the environment variables read by [`WaiterSettings::from_env`].
pub const ENV_PREFIX: &str = "OBSERVATION_WAIT";

/// Timeout settings for [`ChangeWaiter`], typically overridden on CI.
///
/// | Variable | Field | Default |
/// |---|---|---|
/// | `OBSERVATION_WAIT_TIMEOUT_SECS` | `timeout_secs` | `1.0` |
/// | `OBSERVATION_WAIT_TIMEOUT_SCALE` | `timeout_scale` | `1.0` |
///
/// # Examples
///
/// ```rust,no_run
/// use observation_test_utils::wait::WaiterSettings;
///
/// // OBSERVATION_WAIT_TIMEOUT_SCALE=3 -> every wait gets three times longer
/// let waiter = WaiterSettings::from_env()?.to_waiter()?;
/// # Ok::<(), observation_test_utils::error::WaitError>(())
/// ```
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct WaiterSettings {
    /// Default timeout in seconds
    pub timeout_secs: f64,
    /// Multiplier applied to every timeout
    pub timeout_scale: f64,
}

impl Default for WaiterSettings {
    fn default() -> Self {
        Self {
            timeout_secs: ChangeWaiter::DEFAULT_TIMEOUT.as_secs_f64(),
            timeout_scale: 1.0,
        }
    }
}

impl WaiterSettings {
    /// Load settings from `OBSERVATION_WAIT_*` environment variables.
    ///
    /// Unset variables keep their defaults.
    ///
    /// # Errors
    ///
    /// Returns [`WaitError::Settings`] if a variable cannot be parsed.
    pub fn from_env() -> Result<Self> {
        Self::from_env_with_prefix(ENV_PREFIX)
    }

    /// Load settings from environment variables with a custom prefix.
    ///
    /// # Errors
    ///
    /// Returns [`WaitError::Settings`] if a variable cannot be parsed.
    pub fn from_env_with_prefix(prefix: &str) -> Result<Self> {
        let env_source = Environment::with_prefix(prefix).try_parsing(true);

        let config = config::Config::builder()
            .add_source(env_source)
            .build()
            .map_err(|e| {
                WaitError::Settings(format!("Failed to load environment variables: {}", e))
            })?;

        let settings = config.try_deserialize::<Self>().map_err(|e| {
            WaitError::Settings(format!("Failed to parse environment variables: {}", e))
        })?;

        #[cfg(feature = "tracing")]
        tracing::debug!(prefix, ?settings, "loaded waiter settings");

        Ok(settings)
    }

    /// Build a [`ChangeWaiter`] from these settings.
    ///
    /// # Errors
    ///
    /// Returns an error if the timeout or scale is invalid.
    pub fn to_waiter(&self) -> Result<ChangeWaiter> {
        ChangeWaiter::builder()
            .timeout_secs(self.timeout_secs)
            .timeout_scale(self.timeout_scale)
            .build()
    }
}
