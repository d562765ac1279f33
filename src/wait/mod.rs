//! Blocking and suspending waits for a single property change.

mod builder;
mod settings;
mod waiter;

pub use builder::ChangeWaiterBuilder;
pub use settings::{ENV_PREFIX, WaiterSettings};
pub use waiter::{ChangeWaiter, wait_for_change};

#[cfg(feature = "tokio-runtime")]
pub use waiter::{ChangeFuture, await_change};
