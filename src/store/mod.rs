//! State containers and the creator protocol that builds them.
//!
//! A [`Store`] owns the current state and its listeners. A [`Creator`]
//! receives a [`SetState`]/[`GetState`] pair and returns the initial state;
//! [`create_store`] runs it against a fresh container.

mod creator;
mod handle;
mod store;

pub use creator::{create_store, Creator};
pub use handle::{GetState, SetState};
pub use store::{Store, Subscription};
