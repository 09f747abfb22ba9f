use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;

/// A value that can be held by a [`Store`](crate::Store).
///
/// Implementors describe their partial-update shape and how to merge it.
/// Merging is shallow: a field present in the partial replaces the current
/// field wholesale, nested values are never merged recursively.
///
/// # Examples
///
/// ```
/// use larder::State;
///
/// #[derive(Clone, Debug, PartialEq)]
/// struct Counter {
///     count: i32,
///     label: String,
/// }
///
/// #[derive(Default)]
/// struct CounterPatch {
///     count: Option<i32>,
///     label: Option<String>,
/// }
///
/// impl State for Counter {
///     type Partial = CounterPatch;
///
///     fn merge(&self, partial: CounterPatch) -> Self {
///         let mut next = self.clone();
///         if let Some(count) = partial.count {
///             next.count = count;
///         }
///         if let Some(label) = partial.label {
///             next.label = label;
///         }
///         next
///     }
///
///     fn into_partial(self) -> CounterPatch {
///         CounterPatch {
///             count: Some(self.count),
///             label: Some(self.label),
///         }
///     }
/// }
///
/// let state = Counter { count: 1, label: "a".into() };
/// let next = state.merge(CounterPatch { count: Some(2), ..Default::default() });
/// assert_eq!(next, Counter { count: 2, label: "a".into() });
/// ```
pub trait State: Clone + Send + Sync + 'static {
    /// The shape of a partial update.
    type Partial: Send + 'static;

    /// Produce the next state by shallow-merging `partial` over `self`.
    fn merge(&self, partial: Self::Partial) -> Self;

    /// A partial that overwrites every field with this state's values.
    fn into_partial(self) -> Self::Partial;
}

type Resolver<T> = Box<dyn FnOnce(&T) -> <T as State>::Partial + Send>;

/// A partial update: either a literal partial or a function computing one
/// from the current state.
pub enum Update<T: State> {
    Partial(T::Partial),
    With(Resolver<T>),
}

impl<T: State> Update<T> {
    /// Functional update resolved against the state current at merge time.
    pub fn with<F>(f: F) -> Self
    where
        F: FnOnce(&T) -> T::Partial + Send + 'static,
    {
        Update::With(Box::new(f))
    }

    /// Resolve to a literal partial.
    pub fn resolve(self, current: &T) -> T::Partial {
        match self {
            Update::Partial(partial) => partial,
            Update::With(f) => f(current),
        }
    }
}

impl<T: State> fmt::Debug for Update<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Update::Partial(_) => f.write_str("Update::Partial(..)"),
            Update::With(_) => f.write_str("Update::With(..)"),
        }
    }
}

impl State for Map<String, Value> {
    type Partial = Map<String, Value>;

    fn merge(&self, partial: Self::Partial) -> Self {
        let mut next = self.clone();
        next.extend(partial);
        next
    }

    fn into_partial(self) -> Self::Partial {
        self
    }
}

impl<K, V> State for BTreeMap<K, V>
where
    K: Ord + Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    type Partial = BTreeMap<K, V>;

    fn merge(&self, partial: Self::Partial) -> Self {
        let mut next = self.clone();
        next.extend(partial);
        next
    }

    fn into_partial(self) -> Self::Partial {
        self
    }
}
