use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;

use super::sink::Group;
use super::{Middleware, Payload, Sink, TracingSink};
use crate::error::StoreError;
use crate::state::State;
use crate::store::{Creator, GetState, SetState};

const GROUP_LABEL: &str = "State updated";
const STATE_LABEL: &str = "New state:";
const STATE_LABEL_COLORED: &str = "\x1b[32mNew state:\x1b[0m";

/// Options for the [`Logger`] middleware.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LoggerOptions {
    /// Open each group folded.
    pub collapsed: bool,
    /// Report how long the inner `set` took.
    pub duration: bool,
    /// Prefix each group with the UTC time of the write.
    pub timestamp: bool,
    /// Color the state label.
    pub colors: bool,
}

/// Logs every write as a group holding the merged state.
pub struct Logger {
    options: LoggerOptions,
    sink: Arc<dyn Sink>,
}

impl Logger {
    pub fn new(options: LoggerOptions) -> Self {
        Self {
            options,
            sink: Arc::new(TracingSink::new()),
        }
    }

    pub fn with_sink(mut self, sink: Arc<dyn Sink>) -> Self {
        self.sink = sink;
        self
    }
}

/// Wrap `creator` so each write is logged through a [`TracingSink`].
pub fn logger<T>(creator: Creator<T>, options: LoggerOptions) -> Creator<T>
where
    T: State + Serialize,
{
    Logger::new(options).wrap(creator)
}

impl<T> Middleware<T> for Logger
where
    T: State + Serialize,
{
    fn wrap(self, creator: Creator<T>) -> Creator<T> {
        let Logger { options, sink } = self;

        Creator::try_new(move |set: SetState<T>, get: GetState<T>| {
            let logged = SetState::from_fn({
                let get = get.clone();
                move |update| {
                    get.exclusive(|| {
                        let Some(current) = get.try_get() else {
                            return set.apply(update);
                        };
                        let merged = current.merge(update.resolve(&current));
                        let rendered = serde_json::to_value(&merged).map_err(|source| {
                            StoreError::SendEvent {
                                middleware: "logger",
                                source,
                            }
                        });

                        let _group = Group::open(&*sink, GROUP_LABEL, options.collapsed);
                        if options.timestamp {
                            sink.line("Timestamp:", &Payload::Text(Utc::now().to_rfc2822()));
                        }
                        if let Ok(value) = &rendered {
                            let label = if options.colors {
                                STATE_LABEL_COLORED
                            } else {
                                STATE_LABEL
                            };
                            sink.line(label, &Payload::Value(value.clone()));
                        }

                        let started = options.duration.then(Instant::now);
                        let result = set.set(merged.into_partial());
                        if let Some(started) = started {
                            let elapsed = started.elapsed().as_secs_f64() * 1000.0;
                            sink.line("Duration:", &Payload::Text(format!("{elapsed:.3}ms")));
                        }

                        result.and(rendered.map(drop))
                    })
                }
            });

            creator.create(logged, get)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::middleware::{MemorySink, SinkEvent};
    use crate::store::create_store;
    use crate::Action;
    use std::panic::AssertUnwindSafe;

    #[derive(Clone, Serialize)]
    struct Counter {
        count: i32,
        #[serde(skip)]
        increment: Action,
        #[serde(skip)]
        decrement: Action,
    }

    struct CounterPatch {
        count: Option<i32>,
    }

    impl State for Counter {
        type Partial = CounterPatch;

        fn merge(&self, partial: CounterPatch) -> Self {
            let mut next = self.clone();
            if let Some(count) = partial.count {
                next.count = count;
            }
            next
        }

        fn into_partial(self) -> CounterPatch {
            CounterPatch {
                count: Some(self.count),
            }
        }
    }

    fn counter() -> Creator<Counter> {
        Creator::new(|set: SetState<Counter>, _get| Counter {
            count: 0,
            increment: Action::unit({
                let set = set.clone();
                move || {
                    set.update(|state: &Counter| CounterPatch {
                        count: Some(state.count + 1),
                    })
                }
            }),
            decrement: Action::unit(move || {
                set.update(|state: &Counter| CounterPatch {
                    count: Some(state.count - 1),
                })
            }),
        })
    }

    #[test]
    fn logs_each_write() {
        let sink = Arc::new(MemorySink::new());
        let options = LoggerOptions {
            collapsed: true,
            timestamp: true,
            duration: true,
            colors: true,
        };
        let store =
            create_store(counter().with(Logger::new(options).with_sink(sink.clone()))).unwrap();

        store.get_state().increment.run().unwrap();
        assert_eq!(store.get_state().count, 1);
        store.get_state().decrement.run().unwrap();
        assert_eq!(store.get_state().count, 0);

        let events = sink.events();
        assert_eq!(
            events[0],
            SinkEvent::Group {
                label: "State updated".into(),
                collapsed: true
            }
        );
        assert_eq!(
            sink.lines(),
            vec![
                "Timestamp:",
                STATE_LABEL_COLORED,
                "Duration:",
                "Timestamp:",
                STATE_LABEL_COLORED,
                "Duration:"
            ]
        );
        assert_eq!(
            events[2],
            SinkEvent::Line {
                label: STATE_LABEL_COLORED.into(),
                payload: Payload::Value(serde_json::json!({ "count": 1 })),
            }
        );
        assert_eq!(events.last(), Some(&SinkEvent::GroupEnd));
    }

    #[test]
    fn plain_options_log_only_the_state() {
        let sink = Arc::new(MemorySink::new());
        let store = create_store(
            counter().with(Logger::new(LoggerOptions::default()).with_sink(sink.clone())),
        )
        .unwrap();

        store.get_state().increment.run().unwrap();

        assert_eq!(
            sink.events(),
            vec![
                SinkEvent::Group {
                    label: "State updated".into(),
                    collapsed: false
                },
                SinkEvent::Line {
                    label: "New state:".into(),
                    payload: Payload::Value(serde_json::json!({ "count": 1 })),
                },
                SinkEvent::GroupEnd,
            ]
        );
    }

    #[test]
    fn direct_container_writes_bypass_the_logger() {
        let sink = Arc::new(MemorySink::new());
        let store = create_store(
            counter().with(Logger::new(LoggerOptions::default()).with_sink(sink.clone())),
        )
        .unwrap();

        store.set_state(CounterPatch { count: Some(7) });

        assert_eq!(store.get_state().count, 7);
        assert!(sink.is_empty());
    }

    #[test]
    fn group_closes_when_inner_set_panics() {
        let sink = Arc::new(MemorySink::new());
        let store = create_store(
            counter().with(Logger::new(LoggerOptions::default()).with_sink(sink.clone())),
        )
        .unwrap();
        let _sub = store.subscribe(|_| panic!("listener failed"));
        let increment = store.get_state().increment.clone();

        let outcome = std::panic::catch_unwind(AssertUnwindSafe(|| increment.run()));

        assert!(outcome.is_err());
        assert_eq!(sink.events().last(), Some(&SinkEvent::GroupEnd));
        assert_eq!(store.get_state().count, 1);
    }

    #[test]
    fn options_deserialize_from_camel_case() {
        let options: LoggerOptions =
            serde_json::from_str(r#"{ "collapsed": true, "timestamp": true }"#).unwrap();
        assert_eq!(
            options,
            LoggerOptions {
                collapsed: true,
                timestamp: true,
                ..Default::default()
            }
        );
    }
}
