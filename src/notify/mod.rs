//! Change notification and wait handles.
//!
//! Provides the one-shot observer registry behind every observable property and
//! the single-fire expectations that waits block or suspend on.

pub mod expectation;
pub mod registry;

pub use expectation::Expectation;
pub use registry::{ObserverRegistry, SubscriptionHandle};
