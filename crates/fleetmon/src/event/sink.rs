use serde::Serialize;
use serde_json::Value;

use crate::event::{Event, EventLevel};

/// Log target under which [`LogEventSink`] writes event records.
pub const EVENT_LOG_TARGET: &str = "fleetmon::events";

/// Receiver of published events.
///
/// A detail event is published with a single call; for a supplier payload the
/// sink is expected to drain the supplier, producing one record per detail.
pub trait EventSink {
    fn publish(&self, event: Event<'_>) -> anyhow::Result<()>;
}

impl<F> EventSink for F
where
    F: Fn(Event<'_>) -> anyhow::Result<()>,
{
    fn publish(&self, event: Event<'_>) -> anyhow::Result<()> {
        self(event)
    }
}

/// Discards all events without consuming their suppliers.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopEventSink;

impl EventSink for NoopEventSink {
    fn publish(&self, _event: Event<'_>) -> anyhow::Result<()> {
        Ok(())
    }
}

#[derive(Serialize)]
#[serde(rename_all = "kebab-case")]
struct EventRecord<'a> {
    datetime: &'a str,
    scheduler: &'a str,
    cluster_name: &'a str,
    node_role: &'a str,
    component: &'a str,
    instance_id: &'a str,
    level: EventLevel,
    event_type: &'a str,
    message: &'a str,
    detail: Value,
}

/// Writes every event detail as a single JSON line through the `log` crate.
#[derive(Debug, Clone)]
pub struct LogEventSink {
    cluster_name: String,
    node_role: String,
    component: String,
    instance_id: String,
}

impl LogEventSink {
    pub fn new(
        cluster_name: impl Into<String>,
        node_role: impl Into<String>,
        component: impl Into<String>,
        instance_id: impl Into<String>,
    ) -> Self {
        Self {
            cluster_name: cluster_name.into(),
            node_role: node_role.into(),
            component: component.into(),
            instance_id: instance_id.into(),
        }
    }

    fn format_record(
        &self,
        level: EventLevel,
        message: &str,
        event_type: &str,
        timestamp: &str,
        detail: Value,
    ) -> serde_json::Result<String> {
        serde_json::to_string(&EventRecord {
            datetime: timestamp,
            scheduler: "slurm",
            cluster_name: &self.cluster_name,
            node_role: &self.node_role,
            component: &self.component,
            instance_id: &self.instance_id,
            level,
            event_type,
            message,
            detail,
        })
    }
}

impl EventSink for LogEventSink {
    fn publish(&self, event: Event<'_>) -> anyhow::Result<()> {
        let Event {
            level,
            message,
            event_type,
            timestamp,
            payload,
        } = event;
        let log_level = level.log_level();
        if !log::log_enabled!(target: EVENT_LOG_TARGET, log_level) {
            return Ok(());
        }
        for detail in payload.into_details() {
            let record = self.format_record(level, message, event_type, timestamp, detail)?;
            log::log!(target: EVENT_LOG_TARGET, log_level, "{record}");
        }
        Ok(())
    }
}
