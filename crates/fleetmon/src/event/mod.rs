pub mod failures;
pub mod idle;
pub mod publisher;
pub mod sink;

use std::fmt::{Display, Formatter};

use serde::Serialize;
use serde_json::Value;

pub use publisher::{ClusterEventPublisher, PublisherConfig};
pub use sink::{EventSink, LogEventSink, NoopEventSink};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum EventLevel {
    Debug,
    Info,
    Warning,
    Error,
}

impl EventLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            EventLevel::Debug => "DEBUG",
            EventLevel::Info => "INFO",
            EventLevel::Warning => "WARNING",
            EventLevel::Error => "ERROR",
        }
    }

    pub fn log_level(self) -> log::Level {
        match self {
            EventLevel::Debug => log::Level::Debug,
            EventLevel::Info => log::Level::Info,
            EventLevel::Warning => log::Level::Warn,
            EventLevel::Error => log::Level::Error,
        }
    }

    /// `Warning` when something is affected, `otherwise` when the summary is empty.
    pub fn warning_if(non_empty: bool, otherwise: EventLevel) -> EventLevel {
        if non_empty {
            EventLevel::Warning
        } else {
            otherwise
        }
    }
}

impl Display for EventLevel {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lazy, finite sequence of event details.
///
/// It is single-pass: the sink consumes it exactly once. Callers that need to
/// look at the details more than once have to collect them first.
pub struct EventSupplier<'a>(Box<dyn Iterator<Item = Value> + 'a>);

impl<'a> EventSupplier<'a> {
    pub fn new(iter: impl Iterator<Item = Value> + 'a) -> Self {
        Self(Box::new(iter))
    }

    pub fn single(detail: Value) -> Self {
        Self::new(std::iter::once(detail))
    }
}

impl Iterator for EventSupplier<'_> {
    type Item = Value;

    fn next(&mut self) -> Option<Value> {
        self.0.next()
    }
}

pub enum EventPayload<'a> {
    Detail(Value),
    Supplier(EventSupplier<'a>),
}

impl<'a> EventPayload<'a> {
    /// Turns the payload into the sequence of details it carries.
    pub fn into_details(self) -> EventSupplier<'a> {
        match self {
            EventPayload::Detail(detail) => EventSupplier::single(detail),
            EventPayload::Supplier(supplier) => supplier,
        }
    }
}

/// A leveled, typed event handed to an [`EventSink`].
pub struct Event<'a> {
    pub level: EventLevel,
    pub message: &'a str,
    pub event_type: &'a str,
    pub timestamp: &'a str,
    pub payload: EventPayload<'a>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_warning_if() {
        assert_eq!(EventLevel::warning_if(true, EventLevel::Info), EventLevel::Warning);
        assert_eq!(EventLevel::warning_if(false, EventLevel::Info), EventLevel::Info);
        assert_eq!(EventLevel::warning_if(false, EventLevel::Debug), EventLevel::Debug);
    }

    #[test]
    fn test_level_names() {
        assert_eq!(EventLevel::Warning.to_string(), "WARNING");
        assert_eq!(serde_json::to_value(EventLevel::Debug).unwrap(), json!("DEBUG"));
    }

    #[test]
    fn test_payload_into_details() {
        let details: Vec<_> = EventPayload::Detail(json!({"count": 1}))
            .into_details()
            .collect();
        assert_eq!(details, vec![json!({"count": 1})]);

        let supplier = EventSupplier::new((0..3).map(|i| json!({ "index": i })));
        assert_eq!(EventPayload::Supplier(supplier).into_details().count(), 3);
    }
}
