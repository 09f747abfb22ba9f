use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::Arc;

use super::sink::Group;
use super::{Middleware, Payload, Sink, TracingSink};
use crate::error::StoreError;
use crate::state::State;
use crate::store::{Creator, GetState, SetState};

/// Options for the [`Devtools`] middleware.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DevtoolsOptions {
    /// Store name shown in each trace group.
    pub name: String,
    /// Action label used for writes, which carry no action name of their own.
    pub anonymous_action_type: String,
    /// Render state as a JSON string rather than a structured value.
    pub serialize: bool,
    /// When false, writes pass straight through.
    pub enabled: bool,
    /// Record and emit a trace entry per write.
    pub trace: bool,
    /// Number of trace entries retained. Zero means the default of 10.
    pub trace_limit: usize,
}

impl DevtoolsOptions {
    /// Replace an empty name or action type, and a zero trace limit, with
    /// the defaults.
    pub fn with_fallbacks(mut self) -> Self {
        let defaults = Self::default();
        if self.name.is_empty() {
            self.name = defaults.name;
        }
        if self.anonymous_action_type.is_empty() {
            self.anonymous_action_type = defaults.anonymous_action_type;
        }
        if self.trace_limit == 0 {
            self.trace_limit = defaults.trace_limit;
        }
        self
    }
}

impl Default for DevtoolsOptions {
    fn default() -> Self {
        Self {
            name: "store".to_string(),
            anonymous_action_type: "STATE_UPDATE".to_string(),
            serialize: true,
            enabled: true,
            trace: false,
            trace_limit: 10,
        }
    }
}

/// Most recent trace entries, oldest first.
///
/// Clones share the same buffer, so a handle taken before the store is
/// built observes every entry the middleware records.
#[derive(Debug, Clone, Default)]
pub struct TraceHistory {
    entries: Arc<Mutex<VecDeque<String>>>,
}

impl TraceHistory {
    pub fn entries(&self) -> Vec<String> {
        self.entries.lock().iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    fn record(&self, entry: String, limit: usize) {
        if limit == 0 {
            return;
        }
        let mut entries = self.entries.lock();
        while entries.len() >= limit {
            entries.pop_front();
        }
        entries.push_back(entry);
    }
}

/// Traces writes into a bounded history and a grouped sink.
pub struct Devtools {
    options: Option<DevtoolsOptions>,
    sink: Arc<dyn Sink>,
    history: TraceHistory,
}

impl Devtools {
    /// `None` is accepted here and rejected with
    /// [`StoreError::OptionsRequired`] when the store is built.
    pub fn new(options: Option<DevtoolsOptions>) -> Self {
        Self {
            options,
            sink: Arc::new(TracingSink::new()),
            history: TraceHistory::default(),
        }
    }

    pub fn with_sink(mut self, sink: Arc<dyn Sink>) -> Self {
        self.sink = sink;
        self
    }

    pub fn history(&self) -> TraceHistory {
        self.history.clone()
    }
}

/// Wrap `creator` with devtools tracing through a [`TracingSink`].
pub fn devtools<T>(creator: Creator<T>, options: Option<DevtoolsOptions>) -> Creator<T>
where
    T: State + Serialize,
{
    Devtools::new(options).wrap(creator)
}

fn render<T: Serialize>(state: &T, serialize: bool) -> Result<Payload, serde_json::Error> {
    if serialize {
        serde_json::to_string(state).map(Payload::Text)
    } else {
        serde_json::to_value(state).map(Payload::Value)
    }
}

impl<T> Middleware<T> for Devtools
where
    T: State + Serialize,
{
    fn wrap(self, creator: Creator<T>) -> Creator<T> {
        let Devtools {
            options,
            sink,
            history,
        } = self;

        Creator::try_new(move |set: SetState<T>, get: GetState<T>| {
            let options = options
                .ok_or(StoreError::OptionsRequired {
                    middleware: "devtools",
                })?
                .with_fallbacks();
            let group_label = format!("{} - Action: {}", options.name, options.anonymous_action_type);

            let traced = SetState::from_fn({
                let get = get.clone();
                move |update| {
                    if !options.enabled {
                        return set.apply(update);
                    }
                    get.exclusive(|| {
                        let Some(current) = get.try_get() else {
                            return set.apply(update);
                        };
                        let merged = current.merge(update.resolve(&current));

                        let mut outcome = Ok(());
                        if options.trace {
                            match render(&merged, options.serialize) {
                                Ok(payload) => {
                                    history.record(
                                        format!(
                                            "Action: {} - State: {}",
                                            options.anonymous_action_type, payload
                                        ),
                                        options.trace_limit,
                                    );
                                    let _group = Group::open(&*sink, &group_label, true);
                                    sink.line("New State:", &payload);
                                }
                                Err(source) => {
                                    outcome = Err(StoreError::SendEvent {
                                        middleware: "devtools",
                                        source,
                                    });
                                }
                            }
                        }

                        set.set(merged.into_partial()).and(outcome)
                    })
                }
            });

            creator.create(traced, get)
        })
    }
}
