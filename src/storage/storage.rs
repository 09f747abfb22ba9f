use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;

use super::{Backend, Backends, StorageKind};
use crate::error::{BackendError, Result, StoreError};

/// A key in one kind of storage, holding a JSON-encoded value.
///
/// Every operation wraps backend and encoding failures into the matching
/// [`StoreError`] with the key and storage kind attached.
#[derive(Clone)]
pub struct Storage {
    key: String,
    kind: StorageKind,
    backend: Arc<dyn Backend>,
}

impl Storage {
    /// Bind `key` to the backend registered for `storage_type`.
    ///
    /// Fails with [`StoreError::UnsupportedStorageType`] for an unknown kind.
    pub fn new(key: impl Into<String>, storage_type: &str, backends: &Backends) -> Result<Self> {
        let kind = storage_type.parse::<StorageKind>()?;
        Ok(Self::for_kind(key, kind, backends))
    }

    pub fn for_kind(key: impl Into<String>, kind: StorageKind, backends: &Backends) -> Self {
        Self {
            key: key.into(),
            kind,
            backend: backends.get(kind),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn kind(&self) -> StorageKind {
        self.kind
    }

    pub fn set<V: Serialize + ?Sized>(&self, value: &V) -> Result<()> {
        let encoded = serde_json::to_string(value).map_err(|err| self.set_error(err.into()))?;
        self.backend
            .set(&self.key, &encoded)
            .map_err(|err| self.set_error(err))
    }

    pub async fn get<V: DeserializeOwned>(&self) -> Result<Option<V>> {
        let stored = self
            .backend
            .get(&self.key)
            .await
            .map_err(|source| StoreError::GetState {
                key: self.key.clone(),
                storage_type: self.kind,
                source,
            })?;

        stored
            .map(|encoded| serde_json::from_str(&encoded))
            .transpose()
            .map_err(|err| StoreError::GetState {
                key: self.key.clone(),
                storage_type: self.kind,
                source: err.into(),
            })
    }

    /// Whether a value is currently stored under the key.
    pub fn validate(&self) -> Result<bool> {
        self.backend
            .contains(&self.key)
            .map_err(|source| StoreError::ValidateState {
                key: self.key.clone(),
                storage_type: self.kind,
                source,
            })
    }

    pub fn remove(&self) -> Result<()> {
        self.backend
            .remove(&self.key)
            .map_err(|source| StoreError::RemoveState {
                key: self.key.clone(),
                storage_type: self.kind,
                source,
            })
    }

    fn set_error(&self, source: BackendError) -> StoreError {
        StoreError::SetState {
            key: self.key.clone(),
            storage_type: self.kind,
            source,
        }
    }
}

impl fmt::Debug for Storage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Storage")
            .field("key", &self.key)
            .field("kind", &self.kind)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;

    fn storages(backends: &Backends) -> Vec<Storage> {
        ["localStorage", "sessionStorage", "cookies"]
            .into_iter()
            .map(|kind| Storage::new("testKey", kind, backends).unwrap())
            .collect()
    }

    #[tokio::test]
    async fn set_and_get_each_kind() {
        let backends = Backends::new();
        for storage in storages(&backends) {
            storage.set("testValue").unwrap();
            let value: Option<String> = storage.get().await.unwrap();
            assert_eq!(value.as_deref(), Some("testValue"), "{:?}", storage.kind());
        }
    }

    #[test]
    fn validate_and_remove_each_kind() {
        let backends = Backends::new();
        for storage in storages(&backends) {
            assert!(!storage.validate().unwrap());
            storage.set("testValue").unwrap();
            assert!(storage.validate().unwrap());
            storage.remove().unwrap();
            assert!(!storage.validate().unwrap());
        }
    }

    #[test]
    fn unsupported_kind_fails_construction() {
        let err = Storage::new("testKey", "unsupportedStorageType", &Backends::new()).unwrap_err();
        assert_eq!(err.code(), ErrorCode::UnsupportedStorageType);
    }

    #[tokio::test]
    async fn corrupt_payload_is_a_get_error() {
        let backends = Backends::new();
        backends
            .get(StorageKind::Local)
            .set("testKey", "{not json")
            .unwrap();

        let storage = Storage::for_kind("testKey", StorageKind::Local, &backends);
        let err = storage.get::<serde_json::Value>().await.unwrap_err();

        assert_eq!(err.code(), ErrorCode::GetStateError);
        assert_eq!(
            err.metadata(),
            Some(serde_json::json!({ "key": "testKey", "storageType": "localStorage" }))
        );
    }

    #[test]
    fn backend_rejection_is_a_set_error() {
        let storage = Storage::for_kind("testKey", StorageKind::Cookie, &Backends::new());
        let err = storage.set(&"x".repeat(8192)).unwrap_err();

        assert_eq!(err.code(), ErrorCode::SetStateError);
        assert!(matches!(
            err,
            StoreError::SetState {
                source: BackendError::CookieTooLarge { .. },
                ..
            }
        ));
    }
}
