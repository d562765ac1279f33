//! Observable property cells providing lock-free reads.

use crate::core::Tracker;
use crate::notify::{ObserverRegistry, SubscriptionHandle};
use arc_swap::ArcSwap;
use std::sync::Arc;

/// An observable property: a value plus the observers waiting for its next change.
///
/// Reads go through `arc-swap` and never block writers or other readers.
/// Every write notifies the observers registered at that moment and then
/// forgets them (edge-triggered, one-shot). Plain reads never notify anyone.
///
/// Clones share the same value and observers, like an `Arc`.
///
/// # Examples
///
/// ```rust
/// use observation_test_utils::core::Observable;
///
/// let property = Observable::new(0);
/// assert_eq!(*property.get(), 0);
///
/// property.set(1);
/// assert_eq!(*property.get(), 1);
/// ```
pub struct Observable<T> {
    /// The current value, wrapped in ArcSwap for atomic updates
    current: Arc<ArcSwap<T>>,
    /// Observers waiting for the next mutation
    observers: ObserverRegistry,
}

impl<T> Observable<T> {
    /// Create a new observable property with an initial value.
    pub fn new(initial: T) -> Self {
        Self {
            current: Arc::new(ArcSwap::new(Arc::new(initial))),
            observers: ObserverRegistry::new(),
        }
    }

    /// Get a reference-counted handle to the current value.
    ///
    /// This read is not tracked; use [`track`](Self::track) inside
    /// [`with_observation_tracking`](crate::core::with_observation_tracking)
    /// to register interest.
    pub fn get(&self) -> Arc<T> {
        self.current.load_full()
    }

    /// Read the current value and record this property in a tracking scope.
    ///
    /// The read itself is the registration: when the scope ends, its change
    /// callback is armed on every property read this way.
    pub fn track(&self, tracker: &mut Tracker) -> Arc<T> {
        tracker.record(&self.observers);
        self.get()
    }

    /// Replace the value and notify observers.
    ///
    /// Observers are notified even if the new value equals the old one; see
    /// [`set_if_changed`](Self::set_if_changed) for the comparing variant.
    pub fn set(&self, value: T) {
        self.current.store(Arc::new(value));
        self.observers.fire_all();
    }

    /// Replace the value and notify observers only if it differs from the current one.
    ///
    /// Returns `true` if the value changed.
    pub fn set_if_changed(&self, value: T) -> bool
    where
        T: PartialEq,
    {
        let mut changed = false;
        let value = Arc::new(value);
        self.current.rcu(|current| {
            changed = **current != *value;
            if changed {
                Arc::clone(&value)
            } else {
                Arc::clone(current)
            }
        });

        if changed {
            self.observers.fire_all();
        }
        changed
    }

    /// Derive a new value from the current one and notify observers.
    ///
    /// The closure may run more than once if another writer races this
    /// update, so it should be free of side effects.
    pub fn update<F>(&self, f: F)
    where
        F: Fn(&T) -> T,
    {
        self.current.rcu(|current| Arc::new(f(&**current)));
        self.observers.fire_all();
    }

    /// Register a one-shot callback for the next mutation of this property.
    ///
    /// Returns a handle that can be dropped to unsubscribe.
    #[must_use = "dropping the handle unsubscribes immediately"]
    pub fn subscribe<F>(&self, callback: F) -> SubscriptionHandle
    where
        F: FnOnce() + Send + 'static,
    {
        self.observers.register(callback)
    }

    /// Get the number of observers waiting for the next mutation.
    pub fn observer_count(&self) -> usize {
        self.observers.len()
    }
}

impl<T> Clone for Observable<T> {
    fn clone(&self) -> Self {
        Self {
            current: Arc::clone(&self.current),
            observers: self.observers.clone(),
        }
    }
}

impl<T: Default> Default for Observable<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T> From<T> for Observable<T> {
    fn from(value: T) -> Self {
        Self::new(value)
    }
}

impl<T: std::fmt::Debug> std::fmt::Debug for Observable<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Observable")
            .field("value", &self.get())
            .field("observers", &self.observer_count())
            .finish()
    }
}
