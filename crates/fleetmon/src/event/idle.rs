use serde::Serialize;

use crate::cluster::{NodeKind, NodeRecord};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MostIdleNode<'a> {
    pub name: &'a str,
    pub partition: &'a str,
    pub resource: &'a str,
    #[serde(rename = "instance-id")]
    pub instance_id: Option<&'a str>,
}

/// Most idle node of one node class.
/// Classes without idle nodes serialize as `{"idle-time": 0, "idle-count": 0}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct IdleSummary<'a> {
    pub idle_time: u64,
    pub idle_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub most_idle_node: Option<MostIdleNode<'a>>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IdleSummaries<'a> {
    pub dynamic: IdleSummary<'a>,
    #[serde(rename = "static")]
    pub static_: IdleSummary<'a>,
}

impl<'a> IdleSummary<'a> {
    fn record(&mut self, node: &'a NodeRecord) {
        self.idle_count += 1;
        // Strict comparison keeps the first node reaching the maximum.
        if self.most_idle_node.is_none() || node.idle_time > self.idle_time {
            self.idle_time = node.idle_time;
            self.most_idle_node = Some(MostIdleNode {
                name: &node.name,
                partition: &node.queue_name,
                resource: &node.compute_resource,
                instance_id: node.instance.as_ref().map(|i| i.id.as_str()),
            });
        }
    }
}

/// Finds the most idle node and the number of idle nodes for dynamic and static nodes.
/// Only nodes with a strictly positive idle time are taken into account.
pub fn summarize<'a>(nodes: impl IntoIterator<Item = &'a NodeRecord>) -> IdleSummaries<'a> {
    let mut summaries = IdleSummaries::default();
    for node in nodes.into_iter().filter(|node| node.idle_time > 0) {
        match node.kind {
            NodeKind::Dynamic => summaries.dynamic.record(node),
            NodeKind::Static => summaries.static_.record(node),
        }
    }
    summaries
}
