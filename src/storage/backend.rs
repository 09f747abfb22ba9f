use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::StorageKind;
use crate::error::BackendError;

/// Largest cookie, name plus value, the cookie jar accepts.
pub const COOKIE_SIZE_LIMIT: usize = 4096;

/// A key/value service holding serialized state.
///
/// Reads may be asynchronous; writes are synchronous so a persisted store
/// has written its state by the time `set` returns.
#[async_trait]
pub trait Backend: Send + Sync {
    /// Serialized value stored under `key`, if any.
    async fn get(&self, key: &str) -> Result<Option<String>, BackendError>;

    fn set(&self, key: &str, value: &str) -> Result<(), BackendError>;

    /// Removing a missing key is not an error.
    fn remove(&self, key: &str) -> Result<(), BackendError>;

    fn contains(&self, key: &str) -> Result<bool, BackendError>;
}

/// An in-process map. Contents vanish with the process.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    entries: RwLock<HashMap<String, String>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&self) {
        self.entries.write().clear();
    }
}

#[async_trait]
impl Backend for MemoryBackend {
    async fn get(&self, key: &str) -> Result<Option<String>, BackendError> {
        Ok(self.entries.read().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), BackendError> {
        self.entries.write().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), BackendError> {
        self.entries.write().remove(key);
        Ok(())
    }

    fn contains(&self, key: &str) -> Result<bool, BackendError> {
        Ok(self.entries.read().contains_key(key))
    }
}

/// Durable storage: one JSON file per key inside a directory.
#[derive(Debug, Clone)]
pub struct FileBackend {
    dir: PathBuf,
}

impl FileBackend {
    /// Store files under `dir`, which is created on first write.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        // Percent-encoding is reversible, so distinct keys never share a file.
        self.dir.join(format!("{}.json", urlencoding::encode(key)))
    }
}

#[async_trait]
impl Backend for FileBackend {
    async fn get(&self, key: &str) -> Result<Option<String>, BackendError> {
        match tokio::fs::read_to_string(self.path_for(key)).await {
            Ok(contents) => Ok(Some(contents)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<(), BackendError> {
        std::fs::create_dir_all(&self.dir)?;
        let path = self.path_for(key);
        // Write beside the target and rename so readers never see a torn file.
        let partial = path.with_extension("json.tmp");
        std::fs::write(&partial, value)?;
        std::fs::rename(&partial, &path)?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), BackendError> {
        match std::fs::remove_file(self.path_for(key)) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }

    fn contains(&self, key: &str) -> Result<bool, BackendError> {
        Ok(self.path_for(key).try_exists()?)
    }
}

#[derive(Debug, Clone)]
struct Cookie {
    value: String,
    expires_at: DateTime<Utc>,
}

/// A cookie jar: small values that expire one hour after they are written.
#[derive(Debug)]
pub struct CookieBackend {
    jar: RwLock<HashMap<String, Cookie>>,
    ttl: Duration,
}

impl CookieBackend {
    pub fn new() -> Self {
        Self::with_ttl(Duration::hours(1))
    }

    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            jar: RwLock::new(HashMap::new()),
            ttl,
        }
    }

    /// When the cookie under `key` expires, if it is still live.
    pub fn expires_at(&self, key: &str) -> Option<DateTime<Utc>> {
        self.live(key).map(|cookie| cookie.expires_at)
    }

    fn live(&self, key: &str) -> Option<Cookie> {
        let now = Utc::now();
        {
            let jar = self.jar.read();
            match jar.get(key) {
                Some(cookie) if cookie.expires_at > now => return Some(cookie.clone()),
                Some(_) => {}
                None => return None,
            }
        }
        self.jar.write().remove(key);
        None
    }
}

impl Default for CookieBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Backend for CookieBackend {
    async fn get(&self, key: &str) -> Result<Option<String>, BackendError> {
        Ok(self.live(key).map(|cookie| cookie.value))
    }

    fn set(&self, key: &str, value: &str) -> Result<(), BackendError> {
        let size = key.len() + value.len();
        if size > COOKIE_SIZE_LIMIT {
            return Err(BackendError::CookieTooLarge {
                size,
                limit: COOKIE_SIZE_LIMIT,
            });
        }
        self.jar.write().insert(
            key.to_string(),
            Cookie {
                value: value.to_string(),
                expires_at: Utc::now() + self.ttl,
            },
        );
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), BackendError> {
        self.jar.write().remove(key);
        Ok(())
    }

    fn contains(&self, key: &str) -> Result<bool, BackendError> {
        Ok(self.live(key).is_some())
    }
}

/// One backend per [`StorageKind`].
///
/// Defaults to in-memory session and local storage plus a cookie jar.
/// Clones share the same backends.
#[derive(Clone)]
pub struct Backends {
    session: Arc<dyn Backend>,
    local: Arc<dyn Backend>,
    cookie: Arc<dyn Backend>,
}

impl Backends {
    pub fn new() -> Self {
        Self {
            session: Arc::new(MemoryBackend::new()),
            local: Arc::new(MemoryBackend::new()),
            cookie: Arc::new(CookieBackend::new()),
        }
    }

    pub fn with_session(mut self, backend: impl Backend + 'static) -> Self {
        self.session = Arc::new(backend);
        self
    }

    pub fn with_local(mut self, backend: impl Backend + 'static) -> Self {
        self.local = Arc::new(backend);
        self
    }

    pub fn with_cookie(mut self, backend: impl Backend + 'static) -> Self {
        self.cookie = Arc::new(backend);
        self
    }

    pub fn get(&self, kind: StorageKind) -> Arc<dyn Backend> {
        match kind {
            StorageKind::Session => Arc::clone(&self.session),
            StorageKind::Local => Arc::clone(&self.local),
            StorageKind::Cookie => Arc::clone(&self.cookie),
        }
    }
}

impl Default for Backends {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Backends {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Backends").finish_non_exhaustive()
    }
}
