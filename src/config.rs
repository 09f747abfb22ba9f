//! Declarative store setup: which middlewares to apply and how.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tracing::debug;

use crate::error::{Result, StoreError};
use crate::middleware::{
    Devtools, DevtoolsOptions, Hydration, Logger, LoggerOptions, Persist, PersistOptions, Sink,
    TraceHistory,
};
use crate::state::State;
use crate::storage::Backends;
use crate::store::{create_store, Creator, Store};

/// Options for every middleware a [`StoreBuilder`] can apply.
///
/// A middleware is applied only when its section is present.
///
/// ```
/// use larder::StoreConfig;
///
/// let config = StoreConfig::from_json(
///     r#"{
///         "devtools": { "name": "ComplexStore", "trace": true, "traceLimit": 5 },
///         "persist": { "key": "userStore", "storageType": "sessionStorage" }
///     }"#,
/// )
/// .unwrap();
///
/// assert_eq!(config.devtools.unwrap().trace_limit, 5);
/// assert!(config.logger.is_none());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct StoreConfig {
    pub devtools: Option<DevtoolsOptions>,
    pub logger: Option<LoggerOptions>,
    pub persist: Option<PersistOptions>,
}

impl StoreConfig {
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(StoreError::Config)
    }
}

/// A store together with handles to the middlewares built around it.
pub struct BuiltStore<T: State> {
    pub store: Store<T>,
    /// Present when persistence is configured.
    pub hydration: Option<Hydration>,
    /// Present when devtools is configured.
    pub trace: Option<TraceHistory>,
}

impl<T: State + fmt::Debug> fmt::Debug for BuiltStore<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BuiltStore")
            .field("store", &self.store)
            .field("hydration", &self.hydration)
            .field("trace", &self.trace)
            .finish()
    }
}

/// Builds a store from a creator and a [`StoreConfig`].
///
/// Middlewares are layered as `persist(logger(devtools(creator)))`: a write
/// is persisted first, then logged, then traced.
pub struct StoreBuilder<T: State> {
    creator: Option<Creator<T>>,
    config: StoreConfig,
    backends: Backends,
    sink: Option<Arc<dyn Sink>>,
}

impl<T> StoreBuilder<T>
where
    T: State + Serialize,
    T::Partial: DeserializeOwned,
{
    pub fn new() -> Self {
        Self {
            creator: None,
            config: StoreConfig::default(),
            backends: Backends::new(),
            sink: None,
        }
    }

    pub fn creator(mut self, creator: Creator<T>) -> Self {
        self.creator = Some(creator);
        self
    }

    pub fn config(mut self, config: StoreConfig) -> Self {
        self.config = config;
        self
    }

    pub fn backends(mut self, backends: Backends) -> Self {
        self.backends = backends;
        self
    }

    /// Sink shared by the logger and devtools. Defaults to a
    /// [`TracingSink`](crate::middleware::TracingSink) per middleware.
    pub fn sink(mut self, sink: Arc<dyn Sink>) -> Self {
        self.sink = Some(sink);
        self
    }

    pub fn build(self) -> Result<BuiltStore<T>> {
        let StoreBuilder {
            creator,
            config,
            backends,
            sink,
        } = self;
        let mut creator = creator.ok_or(StoreError::StoreCreatorRequired)?;

        let mut trace = None;
        if let Some(options) = config.devtools {
            let mut devtools = Devtools::new(Some(options));
            if let Some(sink) = &sink {
                devtools = devtools.with_sink(Arc::clone(sink));
            }
            trace = Some(devtools.history());
            creator = creator.with(devtools);
        }

        if let Some(options) = config.logger {
            let mut logger = Logger::new(options);
            if let Some(sink) = &sink {
                logger = logger.with_sink(Arc::clone(sink));
            }
            creator = creator.with(logger);
        }

        let mut hydration = None;
        if let Some(options) = &config.persist {
            let (persist, loaded) = Persist::new(options, &backends)?;
            hydration = Some(loaded);
            creator = creator.with(persist);
        }

        debug!(
            devtools = trace.is_some(),
            persist = hydration.is_some(),
            "building store"
        );
        let store = create_store(creator)?;
        Ok(BuiltStore {
            store,
            hydration,
            trace,
        })
    }
}

impl<T> Default for StoreBuilder<T>
where
    T: State + Serialize,
    T::Partial: DeserializeOwned,
{
    fn default() -> Self {
        Self::new()
    }
}
