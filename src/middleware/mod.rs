//! Middleware that wraps a creator to add side effects around `set`.
//!
//! A middleware takes a creator and returns a new one. When the store
//! factory runs the new creator, it receives the factory's setter, wraps it,
//! and runs the inner creator with the wrapped setter. The state's actions
//! therefore call the outermost wrapper first, and each layer delegates
//! to the one beneath it:
//!
//! ```text
//! persist(logger(devtools(base)))
//!   action -> persist set -> logger set -> devtools set -> container
//! ```
//!
//! The same pipeline written with [`Creator::with`] lists layers
//! innermost first: `base.with(devtools).with(logger).with(persist)`.
//!
//! Every layer resolves and merges the update against the current state
//! itself so it can show the result to its side effect, then hands the
//! merged state inward.

mod devtools;
mod logger;
mod persist;
mod sink;

pub use devtools::{devtools, Devtools, DevtoolsOptions, TraceHistory};
pub use logger::{logger, Logger, LoggerOptions};
pub use persist::{persist, Hydration, Persist, PersistOptions};
pub use sink::{MemorySink, Payload, Sink, SinkEvent, TracingSink};

use crate::state::State;
use crate::store::Creator;

/// A transformation from one creator to another.
pub trait Middleware<T: State> {
    fn wrap(self, creator: Creator<T>) -> Creator<T>;
}

impl<T, F> Middleware<T> for F
where
    T: State,
    F: FnOnce(Creator<T>) -> Creator<T>,
{
    fn wrap(self, creator: Creator<T>) -> Creator<T> {
        self(creator)
    }
}
