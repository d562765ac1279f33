//! # observation-test-utils
//!
//! Wait for an observable property to change in tests, blocking or async, with a timeout.
//!
//! ## Overview
//!
//! `observation-test-utils` provides a small testing helper built on:
//! - [`Observable<T>`](core::Observable) property cells with lock-free reads (`arc-swap`)
//! - One-shot, edge-triggered change notification via tracked reads
//! - Single-fire [`Expectation`](notify::Expectation)s that tests block or suspend on
//! - [`wait_for_change`](wait::wait_for_change) and [`await_change`](wait::await_change),
//!   which return a [`WaitError::Timeout`](error::WaitError::Timeout) instead of hanging
//!
//! ## Quick Start
//!
//! ```rust
//! use observation_test_utils::prelude::*;
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! struct ViewModel {
//!     property: Observable<i32>,
//! }
//!
//! impl ViewModel {
//!     fn load_property(&self) {
//!         self.property.update(|value| value + 1);
//!     }
//! }
//!
//! # fn main() -> Result<()> {
//! let sut = Arc::new(ViewModel { property: Observable::new(0) });
//!
//! let worker = Arc::clone(&sut);
//! std::thread::spawn(move || {
//!     std::thread::sleep(Duration::from_millis(10));
//!     worker.load_property();
//! });
//!
//! // Registers interest in `property`, then blocks until it changes (or 1s passes)
//! ChangeWaiter::default().wait_for_change(|vm| &vm.property, &*sut)?;
//! assert_eq!(*sut.property.get(), 1);
//! # Ok(())
//! # }
//! ```
//!
//! ## Known Limitation
//!
//! Notifications are not buffered. A change that happens before the wait
//! registers its observation is not seen, and the wait times out. Start the
//! wait (or, for the async form, call `await_change`) before triggering the
//! mutation.
//!
//! ## Feature Flags
//!
//! - `tokio-runtime` (default): suspending waits via `await_change`
//! - `tracing` (default): debug events for registration and fulfillment,
//!   warnings on timeout
//!
//! Timeouts can be stretched for slow hosts with `OBSERVATION_WAIT_TIMEOUT_SCALE`;
//! see [`WaiterSettings`](wait::WaiterSettings).

#![warn(missing_docs, rust_2024_compatibility)]
#![deny(unsafe_code)]

pub mod core;
pub mod error;
pub mod notify;
pub mod wait;

/// Convenient re-exports for common usage patterns.
pub mod prelude {
    pub use crate::core::{Observable, Observation, Tracker, with_observation_tracking};
    pub use crate::error::{Result, WaitError};
    pub use crate::notify::Expectation;
    pub use crate::wait::{ChangeWaiter, ChangeWaiterBuilder, WaiterSettings, wait_for_change};

    #[cfg(feature = "tokio-runtime")]
    pub use crate::wait::{ChangeFuture, await_change};
}
