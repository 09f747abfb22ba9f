//! # Larder
//!
//! An observable state container with composable middleware.
//!
//! Larder keeps one state value per store and tells listeners about every
//! write. Stores are built from a *creator*, a function that receives a
//! `set`/`get` pair and returns the initial state, including actions that
//! capture the pair for later use.
//!
//! ## Store
//!
//! - [`Store<T>`] - thread-safe container with shallow-merge writes and
//!   synchronous listener notification
//! - [`Creator<T>`] and [`create_store`] - build a store from a creator
//! - [`subscribe_with_selector`] and [`Selected`] - react only when a
//!   derived value changes
//!
//! ## Middleware
//!
//! Creators can be wrapped to add side effects around `set`:
//! - [`Logger`] - grouped output of every merged state
//! - [`Devtools`] - bounded trace history of writes
//! - [`Persist`] - write-through persistence with asynchronous hydration
//!
//! [`StoreBuilder`] applies all three from a [`StoreConfig`].

pub mod config;
pub mod error;
pub mod middleware;
pub mod selector;
pub mod state;
pub mod storage;
pub mod store;

// Re-export main types for convenience
pub use config::{BuiltStore, StoreBuilder, StoreConfig};
pub use error::{BackendError, ErrorCode, Result, StoreError};
pub use middleware::{
    Devtools, DevtoolsOptions, Hydration, Logger, LoggerOptions, Middleware, Persist,
    PersistOptions, Sink, TraceHistory,
};
pub use selector::{subscribe_with_selector, Selected};
pub use state::{Action, State, Update};
pub use storage::{Backend, Backends, Storage, StorageKind};
pub use store::{create_store, Creator, GetState, SetState, Store, Subscription};
