use std::fmt;
use std::sync::Arc;
use tracing::debug;

use super::handle::{GetState, SetState, Slot};
use super::Store;
use crate::error::Result;
use crate::middleware::Middleware;
use crate::state::State;

type CreateFn<T> = Box<dyn FnOnce(SetState<T>, GetState<T>) -> Result<T>>;

/// A function producing the initial state from a `set`/`get` pair.
///
/// The state a creator returns may hold [`Action`](crate::Action) fields
/// that capture the pair and mutate the store later. A creator must not
/// call `set` synchronously while building its state; writes issued before
/// the container exists are deferred until it does.
pub struct Creator<T: State> {
    create: CreateFn<T>,
}

impl<T: State> Creator<T> {
    pub fn new<F>(f: F) -> Self
    where
        F: FnOnce(SetState<T>, GetState<T>) -> T + 'static,
    {
        Self {
            create: Box::new(move |set, get| Ok(f(set, get))),
        }
    }

    /// A creator that can fail, as middleware-wrapped creators do.
    pub fn try_new<F>(f: F) -> Self
    where
        F: FnOnce(SetState<T>, GetState<T>) -> Result<T> + 'static,
    {
        Self {
            create: Box::new(f),
        }
    }

    /// Wrap this creator in `middleware`.
    ///
    /// Each call wraps the outside of everything applied before it, so
    /// `base.with(a).with(b)` is `b(a(base))`: `b`'s setter runs first and
    /// delegates to `a`'s, which delegates to the container.
    pub fn with<M>(self, middleware: M) -> Self
    where
        M: Middleware<T>,
    {
        middleware.wrap(self)
    }

    /// Invoke the creator with a concrete `set`/`get` pair.
    pub fn create(self, set: SetState<T>, get: GetState<T>) -> Result<T> {
        (self.create)(set, get)
    }
}

impl<T: State> fmt::Debug for Creator<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Creator(..)")
    }
}

/// Build a store by running `creator` against a fresh container.
///
/// Middleware misconfiguration surfaces here, before any state exists.
///
/// # Examples
///
/// ```
/// use larder::{create_store, Action, Creator, GetState, SetState, State};
///
/// #[derive(Clone)]
/// struct Fish {
///     fishes: u32,
///     add_a_fish: Action,
/// }
///
/// #[derive(Default)]
/// struct FishPatch {
///     fishes: Option<u32>,
/// }
///
/// impl State for Fish {
///     type Partial = FishPatch;
///
///     fn merge(&self, partial: FishPatch) -> Self {
///         let mut next = self.clone();
///         if let Some(fishes) = partial.fishes {
///             next.fishes = fishes;
///         }
///         next
///     }
///
///     fn into_partial(self) -> FishPatch {
///         FishPatch { fishes: Some(self.fishes) }
///     }
/// }
///
/// let store = create_store(Creator::new(|set: SetState<Fish>, get: GetState<Fish>| Fish {
///     fishes: 0,
///     add_a_fish: Action::unit(move || {
///         set.set(FishPatch { fishes: Some(get.get().fishes + 1) })
///     }),
/// }))
/// .unwrap();
///
/// store.get_state().add_a_fish.run().unwrap();
/// assert_eq!(store.get_state().fishes, 1);
/// ```
pub fn create_store<T: State>(creator: Creator<T>) -> Result<Store<T>> {
    let slot = Arc::new(Slot::new());
    let set = SetState::from_fn({
        let slot = Arc::clone(&slot);
        move |update| {
            slot.apply(update);
            Ok(())
        }
    });
    let get = GetState::new(Arc::clone(&slot));

    let initial = creator.create(set, get)?;
    let store = Store::new(initial);
    let replayed = slot.fill(store.clone());
    debug!(replayed, "store created");

    Ok(store)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StoreError;
    use serde_json::{json, Map, Value};

    fn object(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap_or_default()
    }

    #[test]
    fn creator_result_becomes_initial_state() {
        let store = create_store(Creator::new(|_set, _get| object(json!({ "count": 3 })))).unwrap();
        assert_eq!(store.get_state()["count"], 3);
    }

    #[test]
    fn creator_failure_aborts_construction() {
        let creator = Creator::<Map<String, Value>>::try_new(|_set, _get| {
            Err(StoreError::OptionsRequired { middleware: "test" })
        });

        let err = create_store(creator).unwrap_err();
        assert!(matches!(err, StoreError::OptionsRequired { .. }));
    }

    #[test]
    fn writes_during_construction_are_deferred() {
        let store = create_store(Creator::new(|set: SetState<Map<String, Value>>, get: GetState<_>| {
            assert!(get.try_get().is_none());
            set.set(object(json!({ "count": 1 }))).unwrap();
            set.update(|state| {
                let count = state["count"].as_i64().unwrap_or_default();
                object(json!({ "count": count + 1 }))
            })
            .unwrap();
            object(json!({ "count": 0, "name": "deferred" }))
        }))
        .unwrap();

        assert_eq!(
            *store.get_state(),
            object(json!({ "count": 2, "name": "deferred" }))
        );
    }

    #[test]
    fn get_reads_live_container_state() {
        let (tx, rx) = std::sync::mpsc::channel();
        let store = create_store(Creator::new(move |_set, get: GetState<Map<String, Value>>| {
            tx.send(get).unwrap();
            object(json!({ "count": 0 }))
        }))
        .unwrap();
        let get = rx.recv().unwrap();

        store.set_state(object(json!({ "count": 5 })));
        assert_eq!(get.get()["count"], 5);
    }

    #[test]
    #[should_panic(expected = "before its creator returned")]
    fn get_during_construction_panics() {
        let _ = create_store(Creator::new(|_set, get: GetState<Map<String, Value>>| {
            let _ = get.get();
            Map::new()
        }));
    }
}
