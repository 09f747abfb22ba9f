//! State values and partial updates.
//!
//! A state value is a flat record of fields. Writes are shallow merges: the
//! fields named by a partial update replace the current ones wholesale and
//! every other field is carried over untouched.

mod action;
mod state;

pub use action::Action;
pub use state::{State, Update};
