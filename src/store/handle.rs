use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;

use super::Store;
use crate::error::Result;
use crate::state::{State, Update};

type SetFn<T> = dyn Fn(Update<T>) -> Result<()> + Send + Sync;

/// The `set` half of the pair a creator receives.
///
/// The store factory hands out a setter bound to the container; each
/// middleware wraps the setter it was given before passing it inward.
pub struct SetState<T: State> {
    inner: Arc<SetFn<T>>,
}

impl<T: State> SetState<T> {
    /// Build a setter from a function handling resolved or unresolved updates.
    pub fn from_fn<F>(f: F) -> Self
    where
        F: Fn(Update<T>) -> Result<()> + Send + Sync + 'static,
    {
        Self { inner: Arc::new(f) }
    }

    /// Merge a literal partial update.
    pub fn set(&self, partial: T::Partial) -> Result<()> {
        self.apply(Update::Partial(partial))
    }

    /// Merge a partial update computed from the current state.
    pub fn update<F>(&self, f: F) -> Result<()>
    where
        F: FnOnce(&T) -> T::Partial + Send + 'static,
    {
        self.apply(Update::with(f))
    }

    pub fn apply(&self, update: Update<T>) -> Result<()> {
        (self.inner)(update)
    }
}

impl<T: State> Clone for SetState<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: State> fmt::Debug for SetState<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SetState(..)")
    }
}

/// The `get` half of the pair a creator receives.
pub struct GetState<T: State> {
    slot: Arc<Slot<T>>,
}

impl<T: State> GetState<T> {
    pub(crate) fn new(slot: Arc<Slot<T>>) -> Self {
        Self { slot }
    }

    /// Read the current state.
    ///
    /// # Panics
    ///
    /// Panics when called while the creator is still building the initial
    /// state, since no container exists yet. Use [`try_get`](Self::try_get)
    /// where that can happen.
    pub fn get(&self) -> Arc<T> {
        match self.try_get() {
            Some(state) => state,
            None => panic!("store state read before its creator returned"),
        }
    }

    /// Read the current state, or `None` while the creator is still running.
    pub fn try_get(&self) -> Option<Arc<T>> {
        self.slot.store().map(|store| store.get_state())
    }

    /// Run `f` while writes from other threads wait, so a middleware can
    /// read, merge and delegate without another writer slipping in between.
    /// Before the container exists `f` runs directly.
    pub(crate) fn exclusive<R>(&self, f: impl FnOnce() -> R) -> R {
        match self.slot.store() {
            Some(store) => store.exclusive(f),
            None => f(),
        }
    }
}

impl<T: State> Clone for GetState<T> {
    fn clone(&self) -> Self {
        Self {
            slot: Arc::clone(&self.slot),
        }
    }
}

impl<T: State> fmt::Debug for GetState<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("GetState(..)")
    }
}

enum SlotState<T: State> {
    Pending(Vec<Update<T>>),
    Ready(Store<T>),
}

/// Where the factory's `set`/`get` pair finds its container.
///
/// Until the creator returns there is no container; writes issued in that
/// window are queued and replayed in call order once it exists.
pub(crate) struct Slot<T: State> {
    state: Mutex<SlotState<T>>,
}

impl<T: State> Slot<T> {
    pub(crate) fn new() -> Self {
        Self {
            state: Mutex::new(SlotState::Pending(Vec::new())),
        }
    }

    pub(crate) fn store(&self) -> Option<Store<T>> {
        match &*self.state.lock() {
            SlotState::Ready(store) => Some(store.clone()),
            SlotState::Pending(_) => None,
        }
    }

    pub(crate) fn apply(&self, update: Update<T>) {
        let store = {
            let mut state = self.state.lock();
            match &mut *state {
                SlotState::Ready(store) => store.clone(),
                SlotState::Pending(queue) => {
                    queue.push(update);
                    return;
                }
            }
        };
        store.apply(update);
    }

    /// Attach the container and replay queued writes.
    pub(crate) fn fill(&self, store: Store<T>) -> usize {
        let pending = {
            let mut state = self.state.lock();
            match std::mem::replace(&mut *state, SlotState::Ready(store.clone())) {
                SlotState::Pending(queue) => queue,
                SlotState::Ready(_) => Vec::new(),
            }
        };
        let replayed = pending.len();
        for update in pending {
            store.apply(update);
        }
        replayed
    }
}
