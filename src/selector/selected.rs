use parking_lot::RwLock;
use std::fmt;
use std::sync::Arc;

use super::subscribe_with_selector;
use crate::state::State;
use crate::store::{Store, Subscription};

/// A value derived from a store, kept current as the store changes.
///
/// Unlike a bare [`Subscription`], dropping a `Selected` detaches it from
/// the store.
pub struct Selected<U> {
    value: Arc<RwLock<U>>,
    subscription: Subscription,
}

impl<U> Selected<U>
where
    U: PartialEq + Clone + Send + Sync + 'static,
{
    pub fn new<T, S>(store: &Store<T>, selector: S) -> Self
    where
        T: State,
        S: Fn(&T) -> U + Send + Sync + 'static,
    {
        let value = Arc::new(RwLock::new(selector(&store.get_state())));
        let subscription = subscribe_with_selector(store, selector, {
            let value = Arc::clone(&value);
            move |next| *value.write() = next
        });
        Self {
            value,
            subscription,
        }
    }

    /// The latest selected value.
    pub fn get(&self) -> U {
        self.value.read().clone()
    }

    /// Borrow the latest selected value without cloning it.
    pub fn with<R>(&self, f: impl FnOnce(&U) -> R) -> R {
        f(&self.value.read())
    }
}

impl<U> Drop for Selected<U> {
    fn drop(&mut self) {
        self.subscription.unsubscribe();
    }
}

impl<U: fmt::Debug> fmt::Debug for Selected<U> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Selected").field(&*self.value.read()).finish()
    }
}
