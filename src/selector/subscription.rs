use parking_lot::Mutex;

use crate::state::State;
use crate::store::{Store, Subscription};

/// Call `on_change` whenever the value picked by `selector` changes.
///
/// The selected value is computed once up front as a baseline and again on
/// every write; `on_change` runs only when the new value differs (`!=`) from
/// the baseline, which is then replaced. Selectors should be pure. Each
/// write evaluates the selector exactly once.
///
/// # Examples
///
/// ```
/// use larder::{subscribe_with_selector, Store};
/// use std::collections::BTreeMap;
/// use std::sync::{Arc, Mutex};
///
/// let store = Store::new(BTreeMap::from([("name", "Alice"), ("theme", "light")]));
/// let names = Arc::new(Mutex::new(Vec::new()));
///
/// let subscription = subscribe_with_selector(&store, |state| state["name"], {
///     let names = names.clone();
///     move |name| names.lock().unwrap().push(name)
/// });
///
/// store.set_state(BTreeMap::from([("theme", "dark")]));
/// store.set_state(BTreeMap::from([("name", "Bob")]));
/// subscription.unsubscribe();
/// store.set_state(BTreeMap::from([("name", "Carol")]));
///
/// assert_eq!(*names.lock().unwrap(), vec!["Bob"]);
/// ```
pub fn subscribe_with_selector<T, U, S, F>(store: &Store<T>, selector: S, on_change: F) -> Subscription
where
    T: State,
    U: PartialEq + Clone + Send + 'static,
    S: Fn(&T) -> U + Send + Sync + 'static,
    F: Fn(U) + Send + Sync + 'static,
{
    let baseline = Mutex::new(selector(&store.get_state()));

    store.subscribe(move |state| {
        let next = selector(state);
        {
            let mut current = baseline.lock();
            if *current == next {
                return;
            }
            *current = next.clone();
        }
        // Lock released so `on_change` may write to the store again.
        on_change(next);
    })
}
