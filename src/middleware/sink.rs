use parking_lot::Mutex;
use serde_json::Value;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};

/// What a middleware shows for one line: pre-rendered text or a structured
/// value the sink renders itself.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Text(String),
    Value(Value),
}

impl fmt::Display for Payload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Payload::Text(text) => f.write_str(text),
            Payload::Value(value) => write!(f, "{value:#}"),
        }
    }
}

/// Grouped output used by the logger and devtools middlewares.
pub trait Sink: Send + Sync {
    /// Open a group; `collapsed` groups start folded where the sink supports it.
    fn group(&self, label: &str, collapsed: bool);

    fn line(&self, label: &str, payload: &Payload);

    fn group_end(&self);
}

/// An open group, ended when dropped, including while unwinding.
pub(crate) struct Group<'a> {
    sink: &'a dyn Sink,
}

impl<'a> Group<'a> {
    pub(crate) fn open(sink: &'a dyn Sink, label: &str, collapsed: bool) -> Self {
        sink.group(label, collapsed);
        Self { sink }
    }
}

impl Drop for Group<'_> {
    fn drop(&mut self) {
        self.sink.group_end();
    }
}

/// Sink writing `tracing` events under the `larder` target.
///
/// Lines are indented by the depth of the groups they belong to.
#[derive(Debug, Default)]
pub struct TracingSink {
    depth: AtomicUsize,
}

impl TracingSink {
    pub fn new() -> Self {
        Self::default()
    }

    fn indent(&self) -> String {
        "  ".repeat(self.depth.load(Ordering::Relaxed))
    }
}

impl Sink for TracingSink {
    fn group(&self, label: &str, collapsed: bool) {
        let marker = if collapsed { '▸' } else { '▾' };
        tracing::info!(target: "larder", collapsed, "{}{marker} {label}", self.indent());
        self.depth.fetch_add(1, Ordering::Relaxed);
    }

    fn line(&self, label: &str, payload: &Payload) {
        tracing::info!(target: "larder", "{}{label} {payload}", self.indent());
    }

    fn group_end(&self) {
        // Saturate so an unbalanced end cannot wrap around.
        let _ = self
            .depth
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |depth| depth.checked_sub(1));
    }
}

/// One call recorded by a [`MemorySink`].
#[derive(Debug, Clone, PartialEq)]
pub enum SinkEvent {
    Group { label: String, collapsed: bool },
    Line { label: String, payload: Payload },
    GroupEnd,
}

/// Sink that records everything it receives.
#[derive(Debug, Default)]
pub struct MemorySink {
    events: Mutex<Vec<SinkEvent>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<SinkEvent> {
        self.events.lock().clone()
    }

    /// Labels of every line, in order.
    pub fn lines(&self) -> Vec<String> {
        self.events
            .lock()
            .iter()
            .filter_map(|event| match event {
                SinkEvent::Line { label, .. } => Some(label.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.events.lock().is_empty()
    }

    pub fn clear(&self) {
        self.events.lock().clear();
    }
}

impl Sink for MemorySink {
    fn group(&self, label: &str, collapsed: bool) {
        self.events.lock().push(SinkEvent::Group {
            label: label.to_string(),
            collapsed,
        });
    }

    fn line(&self, label: &str, payload: &Payload) {
        self.events.lock().push(SinkEvent::Line {
            label: label.to_string(),
            payload: payload.clone(),
        });
    }

    fn group_end(&self) {
        self.events.lock().push(SinkEvent::GroupEnd);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn payload_display() {
        assert_eq!(Payload::Text("plain".into()).to_string(), "plain");
        assert_eq!(
            Payload::Value(json!({ "a": 1 })).to_string(),
            "{\n  \"a\": 1\n}"
        );
    }

    #[test]
    fn tracing_sink_depth_never_underflows() {
        let sink = TracingSink::new();
        sink.group_end();
        sink.group("outer", true);
        sink.group("inner", false);
        sink.group_end();
        sink.group_end();
        sink.group_end();
        assert_eq!(sink.depth.load(Ordering::Relaxed), 0);
    }

    #[test]
    fn memory_sink_records_in_order() {
        let sink = MemorySink::new();
        sink.group("State updated", true);
        sink.line("New state:", &Payload::Text("{}".into()));
        sink.group_end();

        assert_eq!(
            sink.events(),
            vec![
                SinkEvent::Group {
                    label: "State updated".into(),
                    collapsed: true
                },
                SinkEvent::Line {
                    label: "New state:".into(),
                    payload: Payload::Text("{}".into())
                },
                SinkEvent::GroupEnd,
            ]
        );
        sink.clear();
        assert!(sink.is_empty());
    }
}
