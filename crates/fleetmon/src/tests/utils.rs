use std::cell::RefCell;
use std::fmt::Debug;

use derive_builder::Builder;
use serde_json::Value;

use crate::cluster::{InstanceRecord, NodeRecord};
use crate::common::parser::CharParser;
use crate::event::{Event, EventLevel, EventSink};

pub fn expect_parser_error<T: Debug>(parser: impl CharParser<T>, input: &str) -> String {
    match parser.parse_text(input) {
        Ok(value) => panic!("The parser should have failed, but it returned {value:?}"),
        Err(error) => error.to_string(),
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RecordedEvent {
    pub level: EventLevel,
    pub message: String,
    pub event_type: String,
    pub timestamp: String,
    pub details: Vec<Value>,
}

/// Sink that drains every payload and keeps the events in memory.
#[derive(Default)]
pub struct RecordingSink {
    events: RefCell<Vec<RecordedEvent>>,
}

impl RecordingSink {
    pub fn events(&self) -> Vec<RecordedEvent> {
        self.events.borrow().clone()
    }

    pub fn event_types(&self) -> Vec<String> {
        self.events
            .borrow()
            .iter()
            .map(|event| event.event_type.clone())
            .collect()
    }

    /// All events of the given type, panics if there is none.
    pub fn find(&self, event_type: &str) -> Vec<RecordedEvent> {
        let events: Vec<_> = self
            .events
            .borrow()
            .iter()
            .filter(|event| event.event_type == event_type)
            .cloned()
            .collect();
        assert!(!events.is_empty(), "No {event_type} event was published");
        events
    }

    /// Details of the single event of the given type.
    pub fn details(&self, event_type: &str) -> Vec<Value> {
        let mut events = self.find(event_type);
        assert_eq!(events.len(), 1, "{event_type} was published more than once");
        events.remove(0).details
    }
}

impl EventSink for RecordingSink {
    fn publish(&self, event: Event<'_>) -> anyhow::Result<()> {
        let recorded = RecordedEvent {
            level: event.level,
            message: event.message.to_string(),
            event_type: event.event_type.to_string(),
            timestamp: event.timestamp.to_string(),
            details: event.payload.into_details().collect(),
        };
        self.events.borrow_mut().push(recorded);
        Ok(())
    }
}

/// Sink that rejects every event.
#[derive(Default)]
pub struct FailingSink {
    pub attempts: RefCell<usize>,
}

impl EventSink for FailingSink {
    fn publish(&self, event: Event<'_>) -> anyhow::Result<()> {
        *self.attempts.borrow_mut() += 1;
        anyhow::bail!("Cannot publish {}", event.event_type)
    }
}

#[derive(Builder)]
#[builder(pattern = "owned", build_fn(name = "finish"))]
pub struct TestNode {
    #[builder(setter(into))]
    name: String,
    #[builder(default = "\"IDLE+CLOUD\".to_string()", setter(into))]
    state: String,
    #[builder(default = "\"queue1\".to_string()", setter(into))]
    partitions: String,
    #[builder(default, setter(into, strip_option))]
    reason: Option<String>,
    #[builder(default, setter(into, strip_option))]
    instance_id: Option<String>,
    #[builder(default)]
    idle_time: u64,
}

impl TestNodeBuilder {
    pub fn build(self) -> NodeRecord {
        let TestNode {
            name,
            state,
            partitions,
            reason,
            instance_id,
            idle_time,
        } = self.finish().unwrap();
        let node = NodeRecord::new(
            name.clone(),
            format!("ip-{name}"),
            format!("host-{name}"),
            state,
            partitions,
            reason.as_deref(),
        )
        .with_idle_time(idle_time);
        match instance_id {
            Some(id) => node.with_instance(InstanceRecord::new(
                id,
                format!("ip-{name}"),
                format!("host-{name}"),
                "2023-01-23 17:57:07",
            )),
            None => node,
        }
    }
}

pub fn node(name: &str) -> NodeRecord {
    TestNodeBuilder::default().name(name).build()
}

pub fn node_with_reason(name: &str, reason: &str) -> NodeRecord {
    TestNodeBuilder::default()
        .name(name)
        .state("DOWN+CLOUD")
        .reason(reason)
        .build()
}
