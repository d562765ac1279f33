//! Waiting for an observed property to change.

use crate::core::{Observable, Observation, with_observation_tracking};
use crate::error::{Result, WaitError};
use crate::notify::Expectation;
use crate::wait::ChangeWaiterBuilder;
use std::time::{Duration, Instant};

#[cfg(feature = "tokio-runtime")]
use std::{future::Future, pin::Pin};

/// Future returned by the suspending wait operations.
///
/// Owns its registration, so it does not borrow the target it was created from.
#[cfg(feature = "tokio-runtime")]
pub type ChangeFuture = Pin<Box<dyn Future<Output = Result<()>> + Send + 'static>>;

const DEFAULT_DESCRIPTION: &str = "property change";

/// Arm a one-shot observation of `accessor(target)` that fulfills a fresh expectation.
fn arm<T, U, A>(accessor: A, target: &T, description: &str) -> (Expectation, Observation)
where
    T: ?Sized,
    A: FnOnce(&T) -> &Observable<U>,
{
    let expectation = Expectation::new(description);
    let fulfiller = expectation.clone();

    let ((), observation) = with_observation_tracking(
        |tracker| {
            accessor(target).track(tracker);
        },
        move || {
            fulfiller.fulfill();
        },
    );

    (expectation, observation)
}

fn block_on_change<T, U, A>(
    accessor: A,
    target: &T,
    timeout: Duration,
    description: &str,
) -> Result<()>
where
    T: ?Sized,
    A: FnOnce(&T) -> &Observable<U>,
{
    let (expectation, observation) = arm(accessor, target, description);

    #[cfg(feature = "tracing")]
    tracing::debug!(description, ?timeout, "waiting for change");

    let result = expectation.wait(timeout);
    drop(observation);
    result
}

#[cfg(feature = "tokio-runtime")]
fn suspend_on_change<T, U, A>(
    accessor: A,
    target: &T,
    timeout: Duration,
    description: &str,
) -> ChangeFuture
where
    T: ?Sized,
    A: FnOnce(&T) -> &Observable<U>,
{
    let (expectation, observation) = arm(accessor, target, description);

    #[cfg(feature = "tracing")]
    tracing::debug!(description, ?timeout, "awaiting change");

    Box::pin(async move {
        let result = expectation.fulfillment(timeout).await;
        drop(observation);
        result
    })
}

/// Block the calling thread until the property selected by `accessor` changes.
///
/// The property is registered before this function blocks; a change that
/// happened earlier is not seen. The change must come from another thread:
/// blocking a current-thread async runtime starves any task that would
/// perform it.
///
/// # Errors
///
/// Returns [`WaitError::Timeout`] if no change arrives within `timeout`.
///
/// # Examples
///
/// ```rust
/// use observation_test_utils::prelude::*;
/// use std::sync::Arc;
/// use std::time::Duration;
///
/// struct ViewModel {
///     property: Observable<i32>,
/// }
///
/// let sut = Arc::new(ViewModel { property: Observable::new(0) });
///
/// let worker = Arc::clone(&sut);
/// std::thread::spawn(move || {
///     std::thread::sleep(Duration::from_millis(10));
///     worker.property.set(1);
/// });
///
/// wait_for_change(|vm| &vm.property, &*sut, Duration::from_secs(1))?;
/// assert_eq!(*sut.property.get(), 1);
/// # Ok::<(), WaitError>(())
/// ```
pub fn wait_for_change<T, U, A>(accessor: A, target: &T, timeout: Duration) -> Result<()>
where
    T: ?Sized,
    A: FnOnce(&T) -> &Observable<U>,
{
    block_on_change(accessor, target, timeout, DEFAULT_DESCRIPTION)
}

/// Suspend the calling task until the property selected by `accessor` changes.
///
/// The property is registered when this function is called, not when the
/// returned future is first polled. While suspended the task yields to the
/// scheduler, so other tasks (including one on the same thread that performs
/// the change) keep running. Requires a Tokio runtime with the time driver.
///
/// # Errors
///
/// The future resolves to [`WaitError::Timeout`] if no change arrives within
/// `timeout`.
///
/// # Examples
///
/// ```rust
/// use observation_test_utils::prelude::*;
/// use std::sync::Arc;
/// use std::time::Duration;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> Result<()> {
/// let counter = Arc::new(Observable::new(0));
///
/// let change = await_change(|c| &**c, &counter, Duration::from_secs(1));
/// let worker = Arc::clone(&counter);
/// tokio::spawn(async move { worker.set(1) });
///
/// change.await?;
/// assert_eq!(*counter.get(), 1);
/// # Ok(())
/// # }
/// ```
#[cfg(feature = "tokio-runtime")]
pub fn await_change<T, U, A>(accessor: A, target: &T, timeout: Duration) -> ChangeFuture
where
    T: ?Sized,
    A: FnOnce(&T) -> &Observable<U>,
{
    suspend_on_change(accessor, target, timeout, DEFAULT_DESCRIPTION)
}

/// A configured waiter carrying a default timeout and a diagnostic description.
///
/// The default waiter uses a one second timeout.
///
/// # Examples
///
/// ```rust,no_run
/// use observation_test_utils::prelude::*;
///
/// # fn example(vm: &Observable<i32>) -> Result<()> {
/// let waiter = ChangeWaiter::builder()
///     .timeout_secs(0.5)
///     .description("counter increments")
///     .build()?;
///
/// waiter.wait_for_change(|p| p, vm)?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct ChangeWaiter {
    timeout: Duration,
    description: String,
}

impl ChangeWaiter {
    /// Timeout used when none is configured.
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(1);

    /// Create a waiter with the default timeout.
    pub fn new() -> Self {
        Self::with_timeout(Self::DEFAULT_TIMEOUT)
    }

    /// Create a waiter with the given timeout.
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            timeout,
            description: DEFAULT_DESCRIPTION.to_string(),
        }
    }

    pub(crate) fn from_parts(timeout: Duration, description: String) -> Self {
        Self {
            timeout,
            description,
        }
    }

    /// Create a new builder for constructing a waiter.
    pub fn builder() -> ChangeWaiterBuilder {
        ChangeWaiterBuilder::new()
    }

    /// Create a waiter from `OBSERVATION_WAIT_*` environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if the variables cannot be parsed or describe an
    /// invalid timeout.
    pub fn from_env() -> Result<Self> {
        Self::from_env_with_prefix(crate::wait::ENV_PREFIX)
    }

    /// Create a waiter from environment variables with a custom prefix.
    ///
    /// # Errors
    ///
    /// Returns an error if the variables cannot be parsed or describe an
    /// invalid timeout.
    pub fn from_env_with_prefix(prefix: &str) -> Result<Self> {
        crate::wait::WaiterSettings::from_env_with_prefix(prefix)?.to_waiter()
    }

    /// The effective timeout, with any scale factor already applied.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// The description reported in timeout errors.
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Blocking wait for one change; see [`wait_for_change`].
    ///
    /// # Errors
    ///
    /// Returns [`WaitError::Timeout`] if no change arrives in time.
    pub fn wait_for_change<T, U, A>(&self, accessor: A, target: &T) -> Result<()>
    where
        T: ?Sized,
        A: FnOnce(&T) -> &Observable<U>,
    {
        block_on_change(accessor, target, self.timeout, &self.description)
    }

    /// Suspending wait for one change; see [`await_change`].
    #[cfg(feature = "tokio-runtime")]
    pub fn await_change<T, U, A>(&self, accessor: A, target: &T) -> ChangeFuture
    where
        T: ?Sized,
        A: FnOnce(&T) -> &Observable<U>,
    {
        suspend_on_change(accessor, target, self.timeout, &self.description)
    }

    /// Block until `count` successive changes have been observed.
    ///
    /// Notifications are one-shot, so the property is registered again after
    /// each change. Changes that land between a notification and the next
    /// registration are not counted. All steps share a single deadline of
    /// [`timeout`](Self::timeout) from the call.
    ///
    /// # Errors
    ///
    /// Returns [`WaitError::Timeout`] if the deadline passes first.
    pub fn wait_for_changes<T, U, A>(&self, count: usize, accessor: A, target: &T) -> Result<()>
    where
        T: ?Sized,
        A: Fn(&T) -> &Observable<U>,
    {
        let deadline = Instant::now().checked_add(self.timeout);

        for step in 1..=count {
            let remaining = match deadline {
                Some(deadline) => deadline.saturating_duration_since(Instant::now()),
                None => self.timeout,
            };
            block_on_change(&accessor, target, remaining, &self.step_description(step, count))
                .map_err(|_| self.overall_timeout(step, count))?;
        }

        Ok(())
    }

    /// Suspend until `count` successive changes have been observed.
    ///
    /// Unlike [`await_change`](Self::await_change) this borrows `target`
    /// across suspension points to re-register, and the first registration
    /// happens when the future is first polled.
    ///
    /// # Errors
    ///
    /// Resolves to [`WaitError::Timeout`] if the deadline passes first.
    #[cfg(feature = "tokio-runtime")]
    pub async fn await_changes<T, U, A>(&self, count: usize, accessor: A, target: &T) -> Result<()>
    where
        T: ?Sized,
        A: Fn(&T) -> &Observable<U>,
    {
        let deadline = tokio::time::Instant::now().checked_add(self.timeout);

        for step in 1..=count {
            let remaining = match deadline {
                Some(deadline) => deadline.saturating_duration_since(tokio::time::Instant::now()),
                None => self.timeout,
            };
            suspend_on_change(&accessor, target, remaining, &self.step_description(step, count))
                .await
                .map_err(|_| self.overall_timeout(step, count))?;
        }

        Ok(())
    }

    fn step_description(&self, step: usize, count: usize) -> String {
        format!("{} ({} of {})", self.description, step, count)
    }

    fn overall_timeout(&self, step: usize, count: usize) -> WaitError {
        WaitError::timeout(self.step_description(step, count), self.timeout)
    }
}

impl Default for ChangeWaiter {
    fn default() -> Self {
        Self::new()
    }
}
