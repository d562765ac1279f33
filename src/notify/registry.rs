//! One-shot observer registry backing each observable property.

use parking_lot::Mutex;
use std::sync::Arc;

type Callback = Box<dyn FnOnce() + Send>;

/// A change callback that runs at most once, no matter how many registries hold it.
///
/// An [`Observation`](crate::core::Observation) that read several properties
/// shares one `OnceCallback` across all of their registries; whichever property
/// changes first consumes it and the remaining registrations become inert.
pub(crate) struct OnceCallback {
    callback: Mutex<Option<Callback>>,
}

impl OnceCallback {
    pub(crate) fn new<F>(callback: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        Self {
            callback: Mutex::new(Some(Box::new(callback))),
        }
    }

    /// Run the callback if it has not run yet. Returns `true` if it ran.
    pub(crate) fn fire(&self) -> bool {
        // Take under the lock, call outside it: the callback may re-arm.
        let callback = self.callback.lock().take();
        match callback {
            Some(callback) => {
                callback();
                true
            }
            None => false,
        }
    }

    /// Drop the callback without running it.
    pub(crate) fn disarm(&self) {
        self.callback.lock().take();
    }

    pub(crate) fn is_armed(&self) -> bool {
        self.callback.lock().is_some()
    }
}

/// Internal registry state.
struct ObserverRegistryInner {
    observers: Vec<(u64, Arc<OnceCallback>)>,
    next_id: u64,
}

/// Handle for a registration that can be dropped to unsubscribe.
///
/// When the handle is dropped, the registration is removed if it has not
/// fired yet.
#[must_use = "dropping a SubscriptionHandle unsubscribes immediately"]
pub struct SubscriptionHandle {
    id: u64,
    callback: Arc<OnceCallback>,
    registry: Arc<Mutex<ObserverRegistryInner>>,
}

impl SubscriptionHandle {
    /// Returns `true` while the callback is still waiting for a change.
    pub fn is_armed(&self) -> bool {
        self.callback.is_armed()
    }
}

impl Drop for SubscriptionHandle {
    fn drop(&mut self) {
        let id = self.id;
        self.registry
            .lock()
            .observers
            .retain(|(observer_id, _)| *observer_id != id);
    }
}

/// Registry of observers waiting for the next mutation of one property.
///
/// Notification is edge-triggered and one-shot: [`fire_all`](Self::fire_all)
/// drains the registry, so every observer hears about exactly one mutation and
/// must register again to hear about the next.
///
/// # Examples
///
/// ```rust
/// use observation_test_utils::notify::ObserverRegistry;
/// use std::sync::Arc;
/// use std::sync::atomic::{AtomicUsize, Ordering};
///
/// let registry = ObserverRegistry::new();
/// let fired = Arc::new(AtomicUsize::new(0));
///
/// let fired_clone = Arc::clone(&fired);
/// let handle = registry.register(move || {
///     fired_clone.fetch_add(1, Ordering::SeqCst);
/// });
///
/// registry.fire_all();
/// registry.fire_all();
/// assert_eq!(fired.load(Ordering::SeqCst), 1);
/// assert!(!handle.is_armed());
/// ```
pub struct ObserverRegistry {
    inner: Arc<Mutex<ObserverRegistryInner>>,
}

impl ObserverRegistry {
    /// Create a new, empty observer registry.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(ObserverRegistryInner {
                observers: Vec::new(),
                next_id: 0,
            })),
        }
    }

    /// Register a callback for the next mutation.
    ///
    /// Returns a handle that can be dropped to unsubscribe.
    #[must_use = "dropping the handle unsubscribes immediately"]
    pub fn register<F>(&self, callback: F) -> SubscriptionHandle
    where
        F: FnOnce() + Send + 'static,
    {
        self.register_shared(Arc::new(OnceCallback::new(callback)))
    }

    pub(crate) fn register_shared(&self, callback: Arc<OnceCallback>) -> SubscriptionHandle {
        let mut inner = self.inner.lock();
        let id = inner.next_id;
        inner.next_id += 1;
        inner.observers.push((id, Arc::clone(&callback)));

        SubscriptionHandle {
            id,
            callback,
            registry: Arc::clone(&self.inner),
        }
    }

    /// Notify every registered observer of a mutation, then forget them.
    ///
    /// Callbacks run on the calling thread in registration order, after the
    /// registry lock has been released. Returns the number of callbacks that
    /// actually ran; observers whose shared callback already fired elsewhere
    /// are skipped.
    pub fn fire_all(&self) -> usize {
        let observers = std::mem::take(&mut self.inner.lock().observers);
        if observers.is_empty() {
            return 0;
        }

        let mut fired = 0;
        for (_id, callback) in &observers {
            if callback.fire() {
                fired += 1;
            }
        }

        #[cfg(feature = "tracing")]
        tracing::debug!(
            registered = observers.len(),
            fired,
            "notified observers of change"
        );

        fired
    }

    pub(crate) fn same_as(&self, other: &ObserverRegistry) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Get the number of registered observers.
    pub fn len(&self) -> usize {
        self.inner.lock().observers.len()
    }

    /// Returns `true` if no observers are registered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for ObserverRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for ObserverRegistry {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl std::fmt::Debug for ObserverRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObserverRegistry")
            .field("observers", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counter() -> (Arc<AtomicUsize>, impl FnOnce() + Send + 'static) {
        let count = Arc::new(AtomicUsize::new(0));
        let count_clone = Arc::clone(&count);
        (count, move || {
            count_clone.fetch_add(1, Ordering::SeqCst);
        })
    }

    #[test]
    fn test_register_and_fire_once() {
        let registry = ObserverRegistry::new();
        let (count, callback) = counter();

        let _handle = registry.register(callback);
        assert_eq!(registry.len(), 1);

        assert_eq!(registry.fire_all(), 1);
        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert!(registry.is_empty());

        // Drained: a second mutation reaches nobody
        assert_eq!(registry.fire_all(), 0);
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_multiple_observers() {
        let registry = ObserverRegistry::new();
        let (count1, callback1) = counter();
        let (count2, callback2) = counter();

        let _handle1 = registry.register(callback1);
        let _handle2 = registry.register(callback2);

        assert_eq!(registry.fire_all(), 2);
        assert_eq!(count1.load(Ordering::SeqCst), 1);
        assert_eq!(count2.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_unsubscribe_on_drop() {
        let registry = ObserverRegistry::new();
        let (count, callback) = counter();

        let handle = registry.register(callback);
        drop(handle);
        assert!(registry.is_empty());

        registry.fire_all();
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_shared_callback_fires_once_across_registries() {
        let first = ObserverRegistry::new();
        let second = ObserverRegistry::new();
        let (count, callback) = counter();
        let shared = Arc::new(OnceCallback::new(callback));

        let _h1 = first.register_shared(Arc::clone(&shared));
        let _h2 = second.register_shared(Arc::clone(&shared));

        assert_eq!(first.fire_all(), 1);
        assert_eq!(second.fire_all(), 0);
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_callback_can_reregister() {
        let registry = ObserverRegistry::new();
        let (count, callback) = counter();
        let slot = Arc::new(Mutex::new(None));

        let registry_clone = registry.clone();
        let slot_clone = Arc::clone(&slot);
        let _handle = registry.register(move || {
            // Re-arming from inside a notification must not deadlock
            *slot_clone.lock() = Some(registry_clone.register(callback));
        });

        registry.fire_all();
        assert_eq!(registry.len(), 1);
        registry.fire_all();
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_disarm() {
        let registry = ObserverRegistry::new();
        let (count, callback) = counter();
        let shared = Arc::new(OnceCallback::new(callback));
        let handle = registry.register_shared(Arc::clone(&shared));

        shared.disarm();
        assert!(!handle.is_armed());
        assert_eq!(registry.fire_all(), 0);
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }
}
