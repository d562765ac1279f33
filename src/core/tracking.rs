//! Tracked reads: arm one change callback on every property a scope touches.

use crate::notify::{ObserverRegistry, SubscriptionHandle, registry::OnceCallback};
use parking_lot::Mutex;
use std::sync::{Arc, Weak};

type Handles = Arc<Mutex<Vec<SubscriptionHandle>>>;

/// Records the properties read during a tracking scope.
///
/// Passed to the `apply` closure of [`with_observation_tracking`]; properties
/// register themselves through [`Observable::track`](crate::core::Observable::track).
#[derive(Default)]
pub struct Tracker {
    registries: Vec<ObserverRegistry>,
}

impl Tracker {
    pub(crate) fn record(&mut self, registry: &ObserverRegistry) {
        if !self.registries.iter().any(|r| r.same_as(registry)) {
            self.registries.push(registry.clone());
        }
    }

    /// Number of distinct properties read so far.
    pub fn tracked_count(&self) -> usize {
        self.registries.len()
    }
}

impl std::fmt::Debug for Tracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tracker")
            .field("tracked", &self.registries.len())
            .finish()
    }
}

/// A live observation registration.
///
/// Dropping it unregisters the change callback from every property it was
/// armed on; a callback that has not run by then never will. Once the
/// callback has run, the registrations on the other tracked properties are
/// released without waiting for the drop.
#[must_use = "dropping an Observation cancels it"]
pub struct Observation {
    callback: Arc<OnceCallback>,
    handles: Handles,
}

impl Observation {
    /// Returns `true` while the change callback is still waiting to run.
    pub fn is_armed(&self) -> bool {
        self.callback.is_armed()
    }

    /// Number of properties this observation is still armed on.
    ///
    /// Drops to zero once the callback has run.
    pub fn tracked_count(&self) -> usize {
        self.handles.lock().len()
    }

    /// Cancel the observation. Equivalent to dropping it.
    pub fn cancel(self) {}
}

impl Drop for Observation {
    fn drop(&mut self) {
        // Disarm first so a notification racing this drop becomes a no-op
        self.callback.disarm();
    }
}

impl std::fmt::Debug for Observation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Observation")
            .field("armed", &self.is_armed())
            .field("tracked", &self.tracked_count())
            .finish()
    }
}

fn release(handles: &Mutex<Vec<SubscriptionHandle>>) {
    // Take under the lock, unregister outside it
    let released = std::mem::take(&mut *handles.lock());
    drop(released);
}

/// Run `apply`, then arm `on_change` on every property it read.
///
/// `on_change` runs at most once, on the thread performing the first mutation
/// of any tracked property, after the new value has been stored. A change
/// made before this function returns is not observed. If `apply` reads no
/// property, `on_change` is dropped without ever running. When it runs, the
/// observation stops occupying the registries of the other tracked
/// properties.
///
/// # Examples
///
/// ```rust
/// use observation_test_utils::core::{Observable, with_observation_tracking};
/// use std::sync::Arc;
/// use std::sync::atomic::{AtomicBool, Ordering};
///
/// let name = Observable::new(String::from("a"));
/// let changed = Arc::new(AtomicBool::new(false));
///
/// let flag = Arc::clone(&changed);
/// let (value, observation) = with_observation_tracking(
///     |tracker| name.track(tracker),
///     move || flag.store(true, Ordering::SeqCst),
/// );
/// assert_eq!(*value, "a");
///
/// name.set(String::from("b"));
/// assert!(changed.load(Ordering::SeqCst));
/// assert!(!observation.is_armed());
/// ```
pub fn with_observation_tracking<R, A, F>(apply: A, on_change: F) -> (R, Observation)
where
    A: FnOnce(&mut Tracker) -> R,
    F: FnOnce() + Send + 'static,
{
    let mut tracker = Tracker::default();
    let result = apply(&mut tracker);

    let handles: Handles = Arc::new(Mutex::new(Vec::new()));
    let on_fire: Weak<Mutex<Vec<SubscriptionHandle>>> = Arc::downgrade(&handles);
    let callback = Arc::new(OnceCallback::new(move || {
        if let Some(handles) = on_fire.upgrade() {
            release(&handles);
        }
        on_change();
    }));
    if tracker.registries.is_empty() {
        callback.disarm();
    }

    for registry in &tracker.registries {
        let handle = registry.register_shared(Arc::clone(&callback));
        handles.lock().push(handle);
    }
    // A mutation on another thread may have fired before every handle landed
    if !callback.is_armed() {
        release(&handles);
    }

    #[cfg(feature = "tracing")]
    tracing::debug!(tracked = tracker.registries.len(), "observation registered");

    (result, Observation { callback, handles })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Observable;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counter() -> (Arc<AtomicUsize>, impl FnOnce() + Send + 'static) {
        let count = Arc::new(AtomicUsize::new(0));
        let count_clone = Arc::clone(&count);
        (count, move || {
            count_clone.fetch_add(1, Ordering::SeqCst);
        })
    }

    #[test]
    fn test_fires_on_first_change_only() {
        let property = Observable::new(0);
        let (count, callback) = counter();

        let (_, observation) = with_observation_tracking(|t| property.track(t), callback);
        assert!(observation.is_armed());

        property.set(1);
        property.set(2);

        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert!(!observation.is_armed());
    }

    #[test]
    fn test_any_tracked_property_fires() {
        let first = Observable::new(0);
        let second = Observable::new("x");
        let (count, callback) = counter();

        let (_, observation) = with_observation_tracking(
            |t| {
                first.track(t);
                second.track(t);
            },
            callback,
        );
        assert_eq!(observation.tracked_count(), 2);

        second.set("y");
        first.set(1);

        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_firing_releases_other_registrations() {
        let first = Observable::new(0);
        let second = Observable::new(0);
        let (count, callback) = counter();

        let (_, observation) = with_observation_tracking(
            |t| {
                first.track(t);
                second.track(t);
            },
            callback,
        );
        assert_eq!(second.observer_count(), 1);

        first.set(1);

        // Still alive, but no longer occupying the other property's registry
        assert!(!observation.is_armed());
        assert_eq!(observation.tracked_count(), 0);
        assert_eq!(second.observer_count(), 0);
        second.set(1);
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_untracked_property_does_not_fire() {
        let tracked = Observable::new(0);
        let untracked = Observable::new(0);
        let (count, callback) = counter();

        let (_, _observation) = with_observation_tracking(
            |t| {
                tracked.track(t);
                untracked.get();
            },
            callback,
        );

        untracked.set(1);
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_repeated_reads_register_once() {
        let property = Observable::new(0);
        let (_, callback) = counter();

        let (_, observation) = with_observation_tracking(
            |t| {
                for _ in 0..5 {
                    property.track(t);
                }
            },
            callback,
        );

        assert_eq!(observation.tracked_count(), 1);
        assert_eq!(property.observer_count(), 1);
    }

    #[test]
    fn test_drop_cancels_registration() {
        let property = Observable::new(0);
        let (count, callback) = counter();

        let (_, observation) = with_observation_tracking(|t| property.track(t), callback);
        observation.cancel();

        assert_eq!(property.observer_count(), 0);
        property.set(1);
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_nothing_read_is_never_armed() {
        let (count, callback) = counter();

        let (value, observation) = with_observation_tracking(|_| 7, callback);

        assert_eq!(value, 7);
        assert!(!observation.is_armed());
        assert_eq!(observation.tracked_count(), 0);
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_change_before_registration_is_missed() {
        let property = Observable::new(0);
        let (count, callback) = counter();

        property.set(1);
        let (value, _observation) = with_observation_tracking(|t| property.track(t), callback);

        assert_eq!(*value, 1);
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }
}
