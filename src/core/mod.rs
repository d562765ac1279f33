//! Core observation types.

mod observable;
mod tracking;

pub use observable::Observable;
pub use tracking::{Observation, Tracker, with_observation_tracking};
