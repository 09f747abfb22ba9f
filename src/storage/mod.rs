//! Storage backends for persisted state.
//!
//! Three kinds of storage are recognized. Each kind maps to one
//! [`Backend`] in a [`Backends`] registry, and [`Storage`] binds a key and a
//! kind to that backend with JSON encoding.

mod backend;
mod kind;
mod storage;

pub use backend::{Backend, Backends, CookieBackend, FileBackend, MemoryBackend, COOKIE_SIZE_LIMIT};
pub use kind::StorageKind;
pub use storage::Storage;
