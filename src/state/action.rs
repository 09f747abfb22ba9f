use std::fmt;
use std::sync::Arc;

use crate::error::Result;

/// A behavior-bearing state field.
///
/// Actions close over the `set`/`get` handles a creator receives, letting a
/// state value carry the operations that mutate it. Cloning an action is
/// cheap and the clone runs the same closure.
///
/// Actions are not data: exclude them from serialization with
/// `#[serde(skip)]`.
///
/// # Examples
///
/// ```
/// use larder::Action;
/// use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
///
/// let calls = Arc::new(AtomicUsize::new(0));
/// let add: Action<usize> = Action::new({
///     let calls = calls.clone();
///     move |n| {
///         calls.fetch_add(n, Ordering::SeqCst);
///         Ok(())
///     }
/// });
///
/// add.call(3).unwrap();
/// assert_eq!(calls.load(Ordering::SeqCst), 3);
/// ```
pub struct Action<A = ()> {
    run: Arc<dyn Fn(A) -> Result<()> + Send + Sync>,
}

impl<A> Action<A> {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(A) -> Result<()> + Send + Sync + 'static,
    {
        Self { run: Arc::new(f) }
    }

    pub fn call(&self, args: A) -> Result<()> {
        (self.run)(args)
    }

    /// Whether both handles run the same closure.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.run, &other.run)
    }
}

impl Action<()> {
    /// Wrap a closure that takes no arguments.
    pub fn unit<F>(f: F) -> Self
    where
        F: Fn() -> Result<()> + Send + Sync + 'static,
    {
        Self::new(move |()| f())
    }

    /// Run an action that takes no arguments.
    pub fn run(&self) -> Result<()> {
        (self.run)(())
    }
}

impl<A> Clone for Action<A> {
    fn clone(&self) -> Self {
        Self {
            run: Arc::clone(&self.run),
        }
    }
}

impl<A> fmt::Debug for Action<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Action(..)")
    }
}
