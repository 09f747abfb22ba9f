//! Error types for stores, middleware and storage backends.

use serde_json::{json, Value};
use std::fmt;
use thiserror::Error;

use crate::storage::StorageKind;

/// Result type used throughout the crate.
pub type Result<T, E = StoreError> = std::result::Result<T, E>;

/// Machine-readable error codes, stable across releases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    StoreCreatorRequired,
    OptionsRequired,
    UnsupportedStorageType,
    SetStateError,
    GetStateError,
    ValidateStateError,
    RemoveStateError,
    PersistLoadError,
    SendEventError,
    ConfigError,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::StoreCreatorRequired => "STORE_CREATOR_REQUIRED",
            ErrorCode::OptionsRequired => "OPTIONS_REQUIRED",
            ErrorCode::UnsupportedStorageType => "UNSUPPORTED_STORAGE_TYPE",
            ErrorCode::SetStateError => "SET_STATE_ERROR",
            ErrorCode::GetStateError => "GET_STATE_ERROR",
            ErrorCode::ValidateStateError => "VALIDATE_STATE_ERROR",
            ErrorCode::RemoveStateError => "REMOVE_STATE_ERROR",
            ErrorCode::PersistLoadError => "PERSIST_LOAD_ERROR",
            ErrorCode::SendEventError => "SEND_EVENT_ERROR",
            ErrorCode::ConfigError => "CONFIG_ERROR",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors raised by a storage backend for a single operation.
#[derive(Debug, Error)]
pub enum BackendError {
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("invalid stored payload: {0}")]
    Json(#[from] serde_json::Error),

    /// Cookie name plus value exceeds what a cookie can carry.
    #[error("cookie of {size} bytes exceeds the {limit} byte limit")]
    CookieTooLarge { size: usize, limit: usize },

    #[error("backend unavailable: {0}")]
    Unavailable(String),
}

/// Top-level error type for store construction and middleware side effects.
#[derive(Debug, Error)]
pub enum StoreError {
    /// No creator was supplied to the store factory.
    #[error("a store creator taking `set` and `get` is required")]
    StoreCreatorRequired,

    /// A middleware that needs configuration was invoked without any.
    #[error("{middleware} middleware requires options to be provided")]
    OptionsRequired { middleware: &'static str },

    #[error("unsupported storage type: {storage_type}")]
    UnsupportedStorageType { storage_type: String },

    #[error("failed to set state for key `{key}` in {storage_type}")]
    SetState {
        key: String,
        storage_type: StorageKind,
        #[source]
        source: BackendError,
    },

    #[error("failed to get state for key `{key}` from {storage_type}")]
    GetState {
        key: String,
        storage_type: StorageKind,
        #[source]
        source: BackendError,
    },

    #[error("failed to validate state for key `{key}` in {storage_type}")]
    ValidateState {
        key: String,
        storage_type: StorageKind,
        #[source]
        source: BackendError,
    },

    #[error("failed to remove state for key `{key}` from {storage_type}")]
    RemoveState {
        key: String,
        storage_type: StorageKind,
        #[source]
        source: BackendError,
    },

    /// Hydration from storage could not run to completion.
    #[error("failed to load persisted state for key `{key}`: {reason}")]
    PersistLoad { key: String, reason: String },

    /// A middleware could not render state for its sink.
    #[error("{middleware} middleware failed to serialize state")]
    SendEvent {
        middleware: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid store configuration: {0}")]
    Config(#[source] serde_json::Error),
}

impl StoreError {
    pub fn code(&self) -> ErrorCode {
        match self {
            StoreError::StoreCreatorRequired => ErrorCode::StoreCreatorRequired,
            StoreError::OptionsRequired { .. } => ErrorCode::OptionsRequired,
            StoreError::UnsupportedStorageType { .. } => ErrorCode::UnsupportedStorageType,
            StoreError::SetState { .. } => ErrorCode::SetStateError,
            StoreError::GetState { .. } => ErrorCode::GetStateError,
            StoreError::ValidateState { .. } => ErrorCode::ValidateStateError,
            StoreError::RemoveState { .. } => ErrorCode::RemoveStateError,
            StoreError::PersistLoad { .. } => ErrorCode::PersistLoadError,
            StoreError::SendEvent { .. } => ErrorCode::SendEventError,
            StoreError::Config(_) => ErrorCode::ConfigError,
        }
    }

    /// Structured context describing the inputs of the failing operation.
    pub fn metadata(&self) -> Option<Value> {
        match self {
            StoreError::StoreCreatorRequired | StoreError::Config(_) => None,
            StoreError::OptionsRequired { middleware } | StoreError::SendEvent { middleware, .. } => {
                Some(json!({ "middleware": middleware }))
            }
            StoreError::UnsupportedStorageType { storage_type } => {
                Some(json!({ "storageType": storage_type }))
            }
            StoreError::SetState { key, storage_type, .. }
            | StoreError::GetState { key, storage_type, .. }
            | StoreError::ValidateState { key, storage_type, .. }
            | StoreError::RemoveState { key, storage_type, .. } => {
                Some(json!({ "key": key, "storageType": storage_type.as_str() }))
            }
            StoreError::PersistLoad { key, .. } => Some(json!({ "key": key })),
        }
    }
}
