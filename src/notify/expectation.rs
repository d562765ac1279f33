//! Single-fire wait handles.

use crate::error::{Result, WaitError};
use parking_lot::{Condvar, Mutex};
use std::sync::Arc;
use std::time::{Duration, Instant};

#[cfg(feature = "tokio-runtime")]
use tokio::sync::watch;

struct ExpectationState {
    fulfilled: Mutex<bool>,
    condvar: Condvar,
    #[cfg(feature = "tokio-runtime")]
    signal: watch::Sender<bool>,
}

/// A one-shot completion signal with a description.
///
/// An expectation starts unfulfilled and is fulfilled at most once; any later
/// call to [`fulfill`](Self::fulfill) is a no-op. Clones share state, so one
/// clone can be handed to a change callback running on another thread while
/// the test waits on the original.
///
/// # Examples
///
/// ```rust
/// use observation_test_utils::notify::Expectation;
/// use std::time::Duration;
///
/// let exp = Expectation::new("worker finished");
/// let worker = exp.clone();
/// std::thread::spawn(move || {
///     worker.fulfill();
/// });
///
/// exp.wait(Duration::from_secs(1)).unwrap();
/// assert!(exp.is_fulfilled());
/// ```
#[derive(Clone)]
pub struct Expectation {
    description: Arc<str>,
    state: Arc<ExpectationState>,
}

impl Expectation {
    /// Create a new, unfulfilled expectation.
    pub fn new(description: impl Into<String>) -> Self {
        let description: String = description.into();
        Self {
            description: Arc::from(description),
            state: Arc::new(ExpectationState {
                fulfilled: Mutex::new(false),
                condvar: Condvar::new(),
                #[cfg(feature = "tokio-runtime")]
                signal: watch::Sender::new(false),
            }),
        }
    }

    /// The description used in timeout diagnostics.
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Returns `true` once the expectation has been fulfilled.
    pub fn is_fulfilled(&self) -> bool {
        *self.state.fulfilled.lock()
    }

    /// Fulfill the expectation, waking every waiter.
    ///
    /// Returns `true` for the call that fulfilled it and `false` for every
    /// later call. Safe to call from any thread.
    pub fn fulfill(&self) -> bool {
        {
            let mut fulfilled = self.state.fulfilled.lock();
            if *fulfilled {
                return false;
            }
            *fulfilled = true;
        }
        self.state.condvar.notify_all();

        #[cfg(feature = "tokio-runtime")]
        self.state.signal.send_replace(true);

        #[cfg(feature = "tracing")]
        tracing::debug!(description = %self.description, "expectation fulfilled");

        true
    }

    /// Block the calling thread until the expectation is fulfilled or `timeout` elapses.
    ///
    /// # Errors
    ///
    /// Returns [`WaitError::Timeout`] if the timeout elapses first.
    pub fn wait(&self, timeout: Duration) -> Result<()> {
        let mut fulfilled = self.state.fulfilled.lock();

        match Instant::now().checked_add(timeout) {
            Some(deadline) => {
                while !*fulfilled {
                    if self
                        .state
                        .condvar
                        .wait_until(&mut fulfilled, deadline)
                        .timed_out()
                    {
                        break;
                    }
                }
            }
            // Deadline not representable: wait without one
            None => {
                while !*fulfilled {
                    self.state.condvar.wait(&mut fulfilled);
                }
            }
        }

        if *fulfilled {
            Ok(())
        } else {
            Err(self.timed_out(timeout))
        }
    }

    /// Suspend the calling task until the expectation is fulfilled or `timeout` elapses.
    ///
    /// Must be awaited inside a Tokio runtime with the time driver enabled.
    ///
    /// # Errors
    ///
    /// Returns [`WaitError::Timeout`] if the timeout elapses first.
    #[cfg(feature = "tokio-runtime")]
    pub async fn fulfillment(&self, timeout: Duration) -> Result<()> {
        let mut signal = self.state.signal.subscribe();

        let signalled = tokio::time::timeout(timeout, async move {
            loop {
                if is_set(&mut signal) {
                    return true;
                }
                if signal.changed().await.is_err() {
                    return is_set(&mut signal);
                }
            }
        })
        .await;

        match signalled {
            Ok(true) => Ok(()),
            _ => Err(self.timed_out(timeout)),
        }
    }

    fn timed_out(&self, timeout: Duration) -> WaitError {
        #[cfg(feature = "tracing")]
        tracing::warn!(
            description = %self.description,
            ?timeout,
            "expectation not fulfilled before timeout"
        );

        WaitError::timeout(self.description.as_ref(), timeout)
    }
}

#[cfg(feature = "tokio-runtime")]
fn is_set(signal: &mut watch::Receiver<bool>) -> bool {
    *signal.borrow_and_update()
}

impl std::fmt::Debug for Expectation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Expectation")
            .field("description", &self.description)
            .field("fulfilled", &self.is_fulfilled())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_fulfill_once() {
        let exp = Expectation::new("once");
        assert!(!exp.is_fulfilled());
        assert!(exp.fulfill());
        assert!(!exp.fulfill());
        assert!(exp.is_fulfilled());
    }

    #[test]
    fn test_wait_already_fulfilled() {
        let exp = Expectation::new("done");
        exp.fulfill();
        assert!(exp.wait(Duration::ZERO).is_ok());
    }

    #[test]
    fn test_wait_fulfilled_from_other_thread() {
        let exp = Expectation::new("cross-thread");
        let remote = exp.clone();

        let worker = thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            remote.fulfill()
        });

        assert!(exp.wait(Duration::from_secs(2)).is_ok());
        assert!(worker.join().unwrap());
    }

    #[test]
    fn test_wait_times_out() {
        let exp = Expectation::new("never");
        let start = Instant::now();

        let err = exp.wait(Duration::from_millis(50)).unwrap_err();

        assert!(start.elapsed() >= Duration::from_millis(50));
        assert_eq!(err, WaitError::timeout("never", Duration::from_millis(50)));
    }

    #[test]
    fn test_zero_timeout_fails_immediately() {
        let exp = Expectation::new("zero");
        assert!(exp.wait(Duration::ZERO).unwrap_err().is_timeout());
    }

    #[test]
    fn test_fulfill_after_timeout_is_harmless() {
        let exp = Expectation::new("late");
        assert!(exp.wait(Duration::from_millis(10)).is_err());
        assert!(exp.fulfill());
    }

    #[cfg(feature = "tokio-runtime")]
    #[tokio::test]
    async fn test_fulfillment_async() {
        let exp = Expectation::new("async");
        let remote = exp.clone();

        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            remote.fulfill();
        });

        assert!(exp.fulfillment(Duration::from_secs(2)).await.is_ok());
    }

    #[cfg(feature = "tokio-runtime")]
    #[tokio::test(start_paused = true)]
    async fn test_fulfillment_times_out() {
        let exp = Expectation::new("async never");
        let err = exp.fulfillment(Duration::from_millis(200)).await.unwrap_err();
        assert!(err.is_timeout());
    }

    #[cfg(feature = "tokio-runtime")]
    #[tokio::test]
    async fn test_fulfillment_already_fulfilled() {
        let exp = Expectation::new("async done");
        exp.fulfill();
        assert!(exp.fulfillment(Duration::ZERO).await.is_ok());
    }
}
