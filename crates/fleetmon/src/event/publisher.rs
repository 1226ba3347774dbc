//! Publishing of cluster events for individual fleet management scenarios.
//!
//! Every public method of [`ClusterEventPublisher`] computes a single timestamp,
//! emits a summary event (warning when something is affected) followed by
//! per-entity detail events, and never fails: errors produced while building
//! or publishing events are logged and dropped.

use std::collections::HashSet;

use serde_json::{Value, json};

use crate::cluster::{InstanceRecord, NodeRecord};
use crate::common::timeutils::{format_event_timestamp, now_utc};
use crate::event::failures::{FailureDetail, classify};
use crate::event::idle;
use crate::event::sink::EventSink;
use crate::event::{Event, EventLevel, EventPayload, EventSupplier};
use crate::{FailedNodes, Map};

/// Nodes with insufficient capacity errors, grouped by partition and compute resource.
pub type IceNodeMap<'a> = Map<String, Map<String, Vec<&'a NodeRecord>>>;

/// Failure counts grouped by partition and compute resource.
pub type PartitionFailureCounts = Map<String, Map<String, u64>>;

/// Groups nodes that failed with an insufficient capacity error by partition and compute resource.
pub fn build_ice_map(nodes: &[NodeRecord]) -> IceNodeMap<'_> {
    let mut map = IceNodeMap::new();
    for node in nodes.iter().filter(|node| node.is_ice()) {
        map.entry(node.queue_name.clone())
            .or_default()
            .entry(node.compute_resource.clone())
            .or_default()
            .push(node);
    }
    map
}

#[derive(Debug, Clone, Copy, Default)]
pub struct PublisherConfig {
    /// Maximum number of entries of name lists embedded in summary events.
    /// The reported `count` is never truncated.
    pub max_list_size: Option<usize>,
}

fn failure_type(error_code: &str) -> &'static str {
    classify(error_code).as_str()
}

fn node_detail(node: &NodeRecord) -> Value {
    json!({ "node": node.description() })
}

fn name_entry(name: &str) -> Value {
    json!({ "name": name })
}

/// Publishing context of a single scenario call.
struct Emitter<'p, S> {
    sink: &'p S,
    timestamp: String,
    max_list_size: Option<usize>,
}

impl<S: EventSink> Emitter<'_, S> {
    fn detail(
        &self,
        level: EventLevel,
        message: &str,
        event_type: &str,
        detail: Value,
    ) -> anyhow::Result<()> {
        self.sink.publish(Event {
            level,
            message,
            event_type,
            timestamp: &self.timestamp,
            payload: EventPayload::Detail(detail),
        })
    }

    fn supplier<'a>(
        &self,
        level: EventLevel,
        message: &str,
        event_type: &str,
        details: impl Iterator<Item = Value> + 'a,
    ) -> anyhow::Result<()> {
        self.sink.publish(Event {
            level,
            message,
            event_type,
            timestamp: &self.timestamp,
            payload: EventPayload::Supplier(EventSupplier::new(details)),
        })
    }

    /// Builds `{"count": count, <list_key>: [...]}`, capping the list at the configured size.
    /// `truncated` is set only when the cap dropped some of the items.
    fn summary(
        &self,
        count: usize,
        list_key: &str,
        items: impl Iterator<Item = Value>,
    ) -> serde_json::Map<String, Value> {
        let limit = self.max_list_size.unwrap_or(usize::MAX);
        let mut items = items.peekable();
        let listed: Vec<Value> = items.by_ref().take(limit).collect();
        let mut detail = serde_json::Map::new();
        detail.insert("count".to_string(), json!(count));
        if items.peek().is_some() {
            detail.insert("truncated".to_string(), Value::Bool(true));
        }
        detail.insert(list_key.to_string(), Value::Array(listed));
        detail
    }

    fn node_summary<'a>(&self, nodes: impl ExactSizeIterator<Item = &'a str>) -> Value {
        Value::Object(self.summary(nodes.len(), "nodes", nodes.map(name_entry)))
    }
}

pub struct ClusterEventPublisher<S> {
    sink: S,
    config: PublisherConfig,
}

impl<S: EventSink> ClusterEventPublisher<S> {
    pub fn new(sink: S) -> Self {
        Self::with_config(sink, PublisherConfig::default())
    }

    pub fn with_config(sink: S, config: PublisherConfig) -> Self {
        Self { sink, config }
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    fn guarded<F>(&self, scenario: &str, publish: F)
    where
        F: FnOnce(&Emitter<'_, S>) -> anyhow::Result<()>,
    {
        let emitter = Emitter {
            sink: &self.sink,
            timestamp: format_event_timestamp(&now_utc()),
            max_list_size: self.config.max_list_size,
        };
        if let Err(error) = publish(&emitter) {
            log::error!("{scenario} failed: {error:?}");
        }
    }

    pub fn publish_cluster_node_events(&self, cluster_nodes: &[NodeRecord]) {
        self.guarded("publish_cluster_node_events", |emitter| {
            let mut state_counts: Vec<(&str, usize)> = Vec::new();
            for node in cluster_nodes {
                match state_counts
                    .iter_mut()
                    .find(|(state, _)| *state == node.state_string)
                {
                    Some((_, count)) => *count += 1,
                    None => state_counts.push((node.state_string.as_str(), 1)),
                }
            }
            emitter.supplier(
                EventLevel::Info,
                "Node State Counts",
                "node-state-count",
                state_counts
                    .into_iter()
                    .map(|(state, count)| json!({ "state": state, "count": count })),
            )?;
            emitter.supplier(
                EventLevel::Info,
                "Idle node times",
                "idle-node-time",
                std::iter::once_with(|| json!(idle::summarize(cluster_nodes))),
            )?;
            emitter.supplier(
                EventLevel::Debug,
                "Node Info",
                "node-info",
                cluster_nodes.iter().map(node_detail),
            )
        });
    }

    pub fn publish_powering_down_node_events(&self, powering_down_nodes: &[NodeRecord]) {
        self.guarded("publish_powering_down_node_events", |emitter| {
            emitter.detail(
                EventLevel::Info,
                "Powering down node count",
                "node-powering-down-count",
                emitter.node_summary(powering_down_nodes.iter().map(|n| n.name.as_str())),
            )?;
            emitter.supplier(
                EventLevel::Debug,
                "Powering down node",
                "node-powering-down",
                powering_down_nodes.iter().map(node_detail),
            )
        });
    }

    pub fn publish_unhealthy_dynamic_node_events(&self, unhealthy_dynamic_nodes: &[NodeRecord]) {
        self.guarded("publish_unhealthy_dynamic_node_events", |emitter| {
            emitter.detail(
                EventLevel::warning_if(!unhealthy_dynamic_nodes.is_empty(), EventLevel::Info),
                "Number of dynamic nodes failing scheduler health check",
                "unhealthy-dynamic-node-count",
                emitter.node_summary(unhealthy_dynamic_nodes.iter().map(|n| n.name.as_str())),
            )?;
            emitter.supplier(
                EventLevel::Info,
                "Dynamic node failing scheduler health check",
                "dynamic-node-health-check-failure",
                unhealthy_dynamic_nodes.iter().map(node_detail),
            )
        });
    }

    pub fn publish_unhealthy_dynamic_node_action_events(
        &self,
        instances_to_terminate: &[String],
        power_down_nodes: &[String],
    ) {
        self.guarded("publish_unhealthy_dynamic_node_action_events", |emitter| {
            emitter.detail(
                EventLevel::Info,
                "Number of instances being terminating due to backing unhealthy dynamic nodes",
                "dynamic-node-health-check-failure-instance-terminate-count",
                Value::Object(emitter.summary(
                    instances_to_terminate.len(),
                    "instances",
                    instances_to_terminate.iter().map(|id| json!({ "id": id })),
                )),
            )?;
            emitter.detail(
                EventLevel::Info,
                "Number of unhealthy dynamic nodes set to down and power_down",
                "dynamic-node-health-check-failure-power-down-count",
                emitter.node_summary(power_down_nodes.iter().map(String::as_str)),
            )
        });
    }

    pub fn publish_unhealthy_static_node_events(&self, unhealthy_static_nodes: &[NodeRecord]) {
        self.guarded("publish_unhealthy_static_node_events", |emitter| {
            emitter.detail(
                EventLevel::warning_if(!unhealthy_static_nodes.is_empty(), EventLevel::Info),
                "Number of static nodes failing scheduler health check",
                "unhealthy-static-node-count",
                emitter.node_summary(unhealthy_static_nodes.iter().map(|n| n.name.as_str())),
            )?;
            emitter.supplier(
                EventLevel::Info,
                "Static node failing scheduler health check",
                "unhealthy-static-node",
                unhealthy_static_nodes.iter().map(node_detail),
            )
        });
    }

    pub fn publish_static_nodes_in_replacement(
        &self,
        unhealthy_static_nodes: &[NodeRecord],
        nodes_in_replacement: &[String],
        failed_nodes: &FailedNodes,
    ) {
        self.guarded("publish_static_nodes_in_replacement", |emitter| {
            emitter.detail(
                EventLevel::Info,
                "After node maintenance, nodes currently in replacement",
                "static-nodes-in-replacement-count",
                emitter.node_summary(nodes_in_replacement.iter().map(String::as_str)),
            )?;
            let in_replacement: HashSet<&str> =
                nodes_in_replacement.iter().map(String::as_str).collect();
            emitter.supplier(
                EventLevel::Debug,
                "After node maintenance, node currently in replacement",
                "static-node-in-replacement",
                unhealthy_static_nodes
                    .iter()
                    .filter(|node| in_replacement.contains(node.name.as_str()))
                    .map(node_detail),
            )?;

            for (error_code, failed_node_list) in failed_nodes {
                let failure_type = failure_type(error_code);
                let mut detail = emitter.summary(
                    failed_node_list.len(),
                    "nodes",
                    failed_node_list.iter().map(|name| name_entry(name)),
                );
                detail.insert("error-code".to_string(), json!(error_code));
                detail.insert("failure-type".to_string(), json!(failure_type));
                emitter.detail(
                    EventLevel::Warning,
                    "Number of static nodes that failed replacement after node maintenance",
                    "static-nodes-in-replacement-failure-count",
                    Value::Object(detail),
                )?;

                let failed: HashSet<&str> = failed_node_list.iter().map(String::as_str).collect();
                emitter.supplier(
                    EventLevel::Debug,
                    "After node maintenance, node failed replacement",
                    "static-node-in-replacement-failure",
                    unhealthy_static_nodes
                        .iter()
                        .filter(|node| failed.contains(node.name.as_str()))
                        .map(|node| {
                            json!({
                                "node": node.description(),
                                "error-code": error_code,
                                "failure-type": failure_type,
                            })
                        }),
                )?;
            }
            Ok(())
        });
    }

    pub fn publish_insufficient_capacity_events(&self, ice_map: &IceNodeMap<'_>) {
        self.guarded("publish_insufficient_capacity_events", |emitter| {
            let ice_nodes = || {
                ice_map
                    .iter()
                    .flat_map(|(partition, resources)| {
                        resources.iter().map(move |(resource, nodes)| (partition, resource, nodes))
                    })
            };
            let count: usize = ice_nodes().map(|(_, _, nodes)| nodes.len()).sum();
            emitter.detail(
                EventLevel::warning_if(count > 0, EventLevel::Info),
                "Insufficient capacity error count",
                "insufficient-capacity-error-count",
                Value::Object(emitter.summary(
                    count,
                    "nodes",
                    ice_nodes()
                        .flat_map(|(_, _, nodes)| nodes.iter())
                        .map(|node| name_entry(&node.name)),
                )),
            )?;
            emitter.supplier(
                EventLevel::Info,
                "Insufficient capacity errors",
                "insufficient-capacity-errors",
                ice_nodes().map(|(partition, resource, nodes)| {
                    let error_code = nodes.first().and_then(|node| node.error_code.as_deref());
                    let mut detail = emitter.summary(
                        nodes.len(),
                        "nodes",
                        nodes.iter().map(|node| name_entry(&node.name)),
                    );
                    detail.insert("partition".to_string(), json!(partition));
                    detail.insert("resource".to_string(), json!(resource));
                    detail.insert("error-code".to_string(), json!(error_code));
                    detail.insert(
                        "failure-type".to_string(),
                        json!(error_code.map(failure_type)),
                    );
                    Value::Object(detail)
                }),
            )?;
            emitter.supplier(
                EventLevel::Debug,
                "Node with insufficient capacity",
                "insufficient-capacity-node",
                ice_nodes().flat_map(|(partition, resource, nodes)| {
                    nodes.iter().map(move |node| {
                        json!({
                            "partition": partition,
                            "resource": resource,
                            "error-code": node.error_code,
                            "failure-type": node.error_code.as_deref().map(failure_type),
                            "node": node.description(),
                        })
                    })
                }),
            )
        });
    }

    pub fn publish_orphaned_instance_events(
        &self,
        cluster_instances: &[InstanceRecord],
        instances_to_terminate: &[String],
    ) {
        self.guarded("publish_orphaned_instance_events", |emitter| {
            let to_terminate: HashSet<&str> =
                instances_to_terminate.iter().map(String::as_str).collect();
            let orphaned = || {
                cluster_instances
                    .iter()
                    .filter(|instance| to_terminate.contains(instance.id.as_str()))
            };
            emitter.detail(
                EventLevel::warning_if(!instances_to_terminate.is_empty(), EventLevel::Info),
                "Orphaned instance count",
                "orphaned-instance-count",
                Value::Object(emitter.summary(
                    instances_to_terminate.len(),
                    "instances",
                    orphaned().map(|instance| json!({ "id": instance.id })),
                )),
            )?;
            emitter.supplier(
                EventLevel::Info,
                "Found orphaned instance",
                "terminating-orphaned-instance",
                orphaned().map(|instance| json!({ "instance": instance.description() })),
            )
        });
    }

    pub fn publish_entering_protected_mode_events(
        &self,
        partitions_protected_failure_count_map: &PartitionFailureCounts,
    ) {
        self.guarded("publish_entering_protected_mode_events", |emitter| {
            emitter.detail(
                EventLevel::Warning,
                "Setting cluster into protected mode due to failures detected in node provisioning. \
                 Please investigate the issue and then use \
                 'pcluster update-compute-fleet --status START_REQUESTED' command to re-enable the fleet.",
                "cluster-entering-protected-mode",
                json!({ "partition_failures": partitions_protected_failure_count_map }),
            )?;
            emitter.supplier(
                EventLevel::Info,
                "Partition compute resource failure count",
                "partition-compute-resource-failure-count",
                partitions_protected_failure_count_map
                    .iter()
                    .flat_map(|(partition, resources)| {
                        resources.iter().map(move |(resource, count)| {
                            json!({ "partition": partition, "resource": resource, "count": count })
                        })
                    }),
            )
        });
    }

    pub fn publish_nodes_failing_health_check_events(
        &self,
        health_check_type: &str,
        nodes_failing_health_check: &[NodeRecord],
        rebooting_nodes: &[NodeRecord],
    ) {
        self.guarded("publish_nodes_failing_health_check_events", |emitter| {
            let with_type = |summary: Value| {
                let mut summary = summary;
                if let Value::Object(map) = &mut summary {
                    map.insert("health-check-type".to_string(), json!(health_check_type));
                }
                summary
            };
            emitter.detail(
                EventLevel::warning_if(!nodes_failing_health_check.is_empty(), EventLevel::Info),
                &format!("Nodes failing {health_check_type} count"),
                "node-failed-health-check-count",
                with_type(
                    emitter.node_summary(nodes_failing_health_check.iter().map(|n| n.name.as_str())),
                ),
            )?;
            emitter.detail(
                EventLevel::Info,
                &format!("Rebooted nodes ignoring {health_check_type} count"),
                "rebooted-nodes-count",
                with_type(emitter.node_summary(rebooting_nodes.iter().map(|n| n.name.as_str()))),
            )?;
            emitter.supplier(
                EventLevel::Debug,
                &format!("Node failing {health_check_type}, setting to DRAIN"),
                "node-failed-health-check",
                nodes_failing_health_check.iter().map(|node| {
                    json!({
                        "health-check-type": health_check_type,
                        "node": node.description(),
                    })
                }),
            )
        });
    }

    pub fn publish_failed_health_check_nodes_in_replacement(
        &self,
        nodes_in_replacement: &[NodeRecord],
    ) {
        self.guarded("publish_failed_health_check_nodes_in_replacement", |emitter| {
            emitter.detail(
                EventLevel::warning_if(!nodes_in_replacement.is_empty(), EventLevel::Info),
                "Number of static nodes in replacement that failed health checks",
                "static-node-replacement-health-check-failure-count",
                emitter.node_summary(nodes_in_replacement.iter().map(|n| n.name.as_str())),
            )?;
            emitter.supplier(
                EventLevel::Info,
                "Detected failed health check for static node in replacement - \
                 will attempt to replace node again immediately",
                "static-node-replacement-health-check-failure",
                nodes_in_replacement.iter().map(node_detail),
            )
        });
    }

    pub fn publish_node_launch_events(
        &self,
        successful_nodes: &[(String, InstanceRecord)],
        failed_nodes: &FailedNodes,
    ) {
        self.guarded("publish_node_launch_events", |emitter| {
            emitter.detail(
                EventLevel::Info,
                "Number of successfully launched nodes",
                "successful-launch-node-count",
                Value::Object(emitter.summary(
                    successful_nodes.len(),
                    "nodes",
                    successful_nodes
                        .iter()
                        .map(|(name, instance)| json!({ "name": name, "instance-id": instance.id })),
                )),
            )?;
            emitter.supplier(
                EventLevel::Debug,
                "Successfully Launched Node",
                "successful-node-launch",
                successful_nodes.iter().map(|(name, instance)| {
                    json!({
                        "node": { "name": name },
                        "instance": instance.description(),
                    })
                }),
            )?;

            let failures = FailureDetail::build(failed_nodes);
            emitter.detail(
                EventLevel::warning_if(failures.total() > 0, EventLevel::Info),
                "Number of nodes that failed to launch",
                "node-launch-failure-count",
                serde_json::to_value(&failures)?,
            )?;
            emitter.supplier(
                EventLevel::Debug,
                "Setting failed node to DOWN state",
                "node-launch-failure",
                failed_nodes.iter().flat_map(|(error_code, nodes)| {
                    let failure_type = failure_type(error_code);
                    nodes.iter().map(move |name| {
                        json!({
                            "error-code": error_code,
                            "failure-type": failure_type,
                            "node": { "name": name },
                        })
                    })
                }),
            )
        });
    }

    pub fn publish_suspend_events(&self, node_spec: &str, nodes: &[String]) {
        self.guarded("publish_suspend_events", |emitter| {
            let mut detail = emitter.summary(nodes.len(), "nodes", nodes.iter().map(|n| name_entry(n)));
            detail.insert("node-spec".to_string(), json!(node_spec));
            emitter.detail(
                EventLevel::Info,
                "Suspending nodes, backing instances will be cleaned up by clustermgtd",
                "node-suspend",
                Value::Object(detail),
            )
        });
    }

    pub fn publish_suspend_error_events(&self, error_message: &str, node_spec: &str, nodes: &[String]) {
        self.guarded("publish_suspend_error_events", |emitter| {
            let mut detail = emitter.summary(nodes.len(), "nodes", nodes.iter().map(|n| name_entry(n)));
            detail.insert("node-spec".to_string(), json!(node_spec));
            detail.insert("error".to_string(), json!(error_message));
            emitter.detail(
                EventLevel::Error,
                "Failed to suspend nodes",
                "node-suspend-error",
                Value::Object(detail),
            )
        });
    }

    pub fn publish_resume_failure_events(&self, reason: &str, nodes: &[String]) {
        self.guarded("publish_resume_failure_events", |emitter| {
            let error_code = crate::cluster::parse_error_code(reason);
            let failure_type = error_code.map(failure_type);

            let mut detail = emitter.summary(nodes.len(), "nodes", nodes.iter().map(|n| name_entry(n)));
            detail.insert("reason".to_string(), json!(reason));
            detail.insert("error-code".to_string(), json!(error_code));
            detail.insert("failure-type".to_string(), json!(failure_type));
            emitter.detail(
                EventLevel::warning_if(!nodes.is_empty(), EventLevel::Info),
                "Number of nodes set to DOWN after failing to resume",
                "node-resume-failure-count",
                Value::Object(detail),
            )?;
            emitter.supplier(
                EventLevel::Warning,
                "Setting failed node to DOWN state",
                "node-resume-failure",
                nodes.iter().map(move |name| {
                    json!({
                        "reason": reason,
                        "error-code": error_code,
                        "failure-type": failure_type,
                        "node": { "name": name },
                    })
                }),
            )
        });
    }
}
