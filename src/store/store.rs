use parking_lot::{ReentrantMutex, RwLock};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, Weak};
use tracing::trace;

use crate::state::{State, Update};

type Listener<T> = Arc<dyn Fn(&T) + Send + Sync>;

struct Listeners<T> {
    next_id: usize,
    // Keyed by a monotonically increasing id, so iteration is registration order.
    entries: BTreeMap<usize, Listener<T>>,
}

/// A thread-safe container holding one state value and its listeners.
///
/// Every write shallow-merges a partial update into the current state,
/// replaces it, then synchronously notifies each listener registered when
/// the write started. Cloning a `Store` yields another handle to the same
/// container.
///
/// # Examples
///
/// ```
/// use larder::Store;
/// use serde_json::{json, Map, Value};
///
/// fn object(value: Value) -> Map<String, Value> {
///     value.as_object().cloned().unwrap_or_default()
/// }
///
/// let store = Store::new(object(json!({ "count": 0, "name": "test" })));
/// store.set_state(object(json!({ "count": 1 })));
///
/// assert_eq!(store.get_state()["count"], 1);
/// assert_eq!(store.get_state()["name"], "test");
/// ```
pub struct Store<T> {
    state: Arc<RwLock<Arc<T>>>,
    // Serializes read-resolve-merge-replace; reentrant so a resolver may write.
    writer: Arc<ReentrantMutex<()>>,
    listeners: Arc<RwLock<Listeners<T>>>,
}

impl<T: State> Store<T> {
    /// Create a new store with the given initial state.
    pub fn new(initial: T) -> Self {
        Self {
            state: Arc::new(RwLock::new(Arc::new(initial))),
            writer: Arc::new(ReentrantMutex::new(())),
            listeners: Arc::new(RwLock::new(Listeners {
                next_id: 0,
                entries: BTreeMap::new(),
            })),
        }
    }

    /// Get the current state.
    pub fn get_state(&self) -> Arc<T> {
        Arc::clone(&self.state.read())
    }

    /// Merge a literal partial update into the state.
    pub fn set_state(&self, partial: T::Partial) {
        self.apply(Update::Partial(partial));
    }

    /// Merge a partial update computed from the current state.
    pub fn update_state<F>(&self, f: F)
    where
        F: FnOnce(&T) -> T::Partial + Send + 'static,
    {
        self.apply(Update::with(f));
    }

    /// Resolve `update`, merge it, and notify listeners.
    ///
    /// Resolving and replacing happen as one step with respect to other
    /// threads, so concurrent functional updates are never lost. The new
    /// state replaces the old one even when nothing changed. A
    /// listener that panics aborts the remaining notifications and the panic
    /// reaches the caller. Listeners may write to the store again; such
    /// nested writes notify recursively.
    pub fn apply(&self, update: Update<T>) {
        let next = self.exclusive(|| {
            let current = self.get_state();
            let partial = update.resolve(&current);
            let next = Arc::new(current.merge(partial));
            *self.state.write() = Arc::clone(&next);
            next
        });
        // Writer released so listeners on other threads can write too.
        self.notify(&next);
    }

    /// Run `f` while writes from other threads wait.
    pub(crate) fn exclusive<R>(&self, f: impl FnOnce() -> R) -> R {
        let _writer = self.writer.lock();
        f()
    }

    /// Register a listener called with the new state after every write.
    ///
    /// The returned handle removes the listener. Dropping it without calling
    /// [`Subscription::unsubscribe`] leaves the listener registered.
    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        let id = {
            let mut listeners = self.listeners.write();
            let id = listeners.next_id;
            listeners.next_id += 1;
            listeners.entries.insert(id, Arc::new(listener));
            id
        };
        trace!(listener = id, "listener subscribed");

        let listeners: Weak<RwLock<Listeners<T>>> = Arc::downgrade(&self.listeners);
        Subscription::new(move || {
            if let Some(listeners) = listeners.upgrade() {
                if listeners.write().entries.remove(&id).is_some() {
                    trace!(listener = id, "listener unsubscribed");
                }
            }
        })
    }

    /// Number of currently registered listeners.
    pub fn listener_count(&self) -> usize {
        self.listeners.read().entries.len()
    }

    /// Notify all listeners of a state change.
    fn notify(&self, state: &T) {
        // Snapshot so listeners can subscribe or unsubscribe while we iterate.
        let listeners: Vec<Listener<T>> = self.listeners.read().entries.values().cloned().collect();
        trace!(listeners = listeners.len(), "notifying listeners");
        for listener in listeners {
            listener(state);
        }
    }
}

impl<T> Clone for Store<T> {
    fn clone(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
            writer: Arc::clone(&self.writer),
            listeners: Arc::clone(&self.listeners),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for Store<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Store")
            .field("state", &*self.state.read())
            .field("listeners", &self.listeners.read().entries.len())
            .finish()
    }
}

/// Handle returned by [`Store::subscribe`].
///
/// Calling [`unsubscribe`](Subscription::unsubscribe) more than once, or
/// after the store is gone, is a no-op.
#[must_use = "dropping a Subscription leaves the listener registered"]
pub struct Subscription {
    cancel: Box<dyn Fn() + Send + Sync>,
}

impl Subscription {
    pub(crate) fn new<F>(cancel: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        Self {
            cancel: Box::new(cancel),
        }
    }

    /// Remove the listener from its store.
    pub fn unsubscribe(&self) {
        (self.cancel)();
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Subscription(..)")
    }
}
