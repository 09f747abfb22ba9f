use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tokio::runtime::Handle;
use tokio::sync::oneshot;
use tracing::{debug, warn};

use super::Middleware;
use crate::error::{Result, StoreError};
use crate::state::State;
use crate::storage::{Backends, Storage};
use crate::store::{Creator, GetState, SetState};

fn default_storage_type() -> String {
    "localStorage".to_string()
}

/// Options for the [`Persist`] middleware.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistOptions {
    /// Key the state is stored under.
    pub key: String,
    /// One of `sessionStorage`, `localStorage` or `cookies`.
    #[serde(default = "default_storage_type")]
    pub storage_type: String,
}

impl PersistOptions {
    pub fn new(key: impl Into<String>, storage_type: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            storage_type: storage_type.into(),
        }
    }
}

/// Writes every merged state to storage and warm-starts the store from it.
///
/// When the store is built, a hydration task is spawned on the current
/// tokio runtime. It reads the stored state and, if any, applies it through
/// the setter this middleware received. Writes made before the task
/// finishes are overwritten by the stored state: the later call wins.
pub struct Persist {
    storage: Storage,
    done: oneshot::Sender<Result<bool>>,
}

impl Persist {
    /// Fails with [`StoreError::UnsupportedStorageType`] for an unknown
    /// storage type, before any store exists.
    pub fn new(options: &PersistOptions, backends: &Backends) -> Result<(Self, Hydration)> {
        let storage = Storage::new(options.key.clone(), &options.storage_type, backends)?;
        let (done, rx) = oneshot::channel();
        let hydration = Hydration {
            key: options.key.clone(),
            done: rx,
        };
        Ok((Self { storage, done }, hydration))
    }

    pub fn storage(&self) -> &Storage {
        &self.storage
    }
}

/// Wrap `creator` so its state is persisted under `options.key`.
pub fn persist<T>(
    creator: Creator<T>,
    options: &PersistOptions,
    backends: &Backends,
) -> Result<(Creator<T>, Hydration)>
where
    T: State + Serialize,
    T::Partial: DeserializeOwned,
{
    let (persist, hydration) = Persist::new(options, backends)?;
    Ok((persist.wrap(creator), hydration))
}

/// Completion of a persisted store's initial load.
#[derive(Debug)]
pub struct Hydration {
    key: String,
    done: oneshot::Receiver<Result<bool>>,
}

impl Hydration {
    /// Wait for the load to finish.
    ///
    /// Resolves to `true` when stored state was applied and `false` when
    /// nothing was stored under the key.
    pub async fn wait(self) -> Result<bool> {
        match self.done.await {
            Ok(outcome) => outcome,
            Err(_) => Err(StoreError::PersistLoad {
                key: self.key,
                reason: "hydration task ended before reporting".to_string(),
            }),
        }
    }
}

async fn hydrate<T>(storage: Storage, set: SetState<T>, done: oneshot::Sender<Result<bool>>)
where
    T: State,
    T::Partial: DeserializeOwned,
{
    let outcome = match storage.get::<T::Partial>().await {
        Ok(Some(partial)) => set.set(partial).map(|()| true),
        Ok(None) => Ok(false),
        Err(err) => Err(err),
    };
    match &outcome {
        Ok(applied) => debug!(key = storage.key(), applied, "hydration finished"),
        Err(err) => warn!(key = storage.key(), error = %err, "hydration failed"),
    }
    // The caller may have dropped its handle.
    let _ = done.send(outcome);
}

impl<T> Middleware<T> for Persist
where
    T: State + Serialize,
    T::Partial: DeserializeOwned,
{
    fn wrap(self, creator: Creator<T>) -> Creator<T> {
        let Persist { storage, done } = self;

        Creator::try_new(move |set: SetState<T>, get: GetState<T>| {
            let runtime = Handle::try_current().map_err(|err| StoreError::PersistLoad {
                key: storage.key().to_string(),
                reason: err.to_string(),
            })?;
            runtime.spawn(hydrate(storage.clone(), set.clone(), done));

            let persisted = SetState::from_fn({
                let get = get.clone();
                move |update| {
                    get.exclusive(|| {
                        let Some(current) = get.try_get() else {
                            return set.apply(update);
                        };
                        let merged = current.merge(update.resolve(&current));
                        set.set(merged.clone().into_partial())?;

                        // Memory already holds the new state; a failed write does not undo it.
                        storage.set(&merged).map_err(|err| {
                            warn!(key = storage.key(), error = %err, "failed to persist state");
                            err
                        })
                    })
                }
            });

            creator.create(persisted, get)
        })
    }
}
