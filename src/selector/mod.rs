//! Selector-based subscriptions.
//!
//! A selector projects a narrower value out of the full state. Listeners
//! registered through this layer only hear about writes that change the
//! projected value.

mod selected;
mod subscription;

pub use selected::Selected;
pub use subscription::subscribe_with_selector;
