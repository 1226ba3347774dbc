use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Serialize, Serializer};

use crate::cluster::instance::{InstanceDescription, InstanceRecord};
use crate::event::failures::{FailureCategory, classify};

/// Whether a node is created on demand or expected to be always backed by an instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum NodeKind {
    #[serde(rename = "dy")]
    Dynamic,
    #[serde(rename = "st")]
    Static,
}

impl NodeKind {
    pub fn from_marker(marker: &str) -> Option<Self> {
        match marker {
            "dy" => Some(NodeKind::Dynamic),
            "st" => Some(NodeKind::Static),
            _ => None,
        }
    }

    pub fn marker(self) -> &'static str {
        match self {
            NodeKind::Dynamic => "dy",
            NodeKind::Static => "st",
        }
    }
}

/// Extracts the provider error code from a node reason such as
/// `(Code:InsufficientHostCapacity)Failure when resuming nodes`.
pub fn parse_error_code(reason: &str) -> Option<&str> {
    let rest = reason.strip_prefix("(Code:")?;
    let (code, _) = rest.split_once(')')?;
    (!code.is_empty()).then_some(code)
}

/// Splits `<queue>-<st|dy>-<compute-resource>-<index>` into its parts.
fn parse_node_name(name: &str) -> Option<(&str, NodeKind, &str)> {
    let (prefix, index) = name.rsplit_once('-')?;
    if index.is_empty() || !index.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    let position = [prefix.find("-dy-"), prefix.find("-st-")]
        .into_iter()
        .flatten()
        .min()?;
    let queue = &prefix[..position];
    let kind = NodeKind::from_marker(&prefix[position + 1..position + 3])?;
    let resource = &prefix[position + 4..];
    if queue.is_empty() || resource.is_empty() {
        return None;
    }
    Some((queue, kind, resource))
}

/// Snapshot of a scheduler node, consumed read-only by the event publisher.
#[derive(Debug, Clone)]
pub struct NodeRecord {
    pub name: String,
    pub address: String,
    pub hostname: String,
    pub state_string: String,
    pub partitions: Vec<String>,
    pub queue_name: String,
    pub compute_resource: String,
    pub kind: NodeKind,
    pub instance: Option<InstanceRecord>,
    pub slurmd_start_time: Option<DateTime<Utc>>,
    /// Seconds since slurmd started on the node.
    pub up_time: u64,
    /// Seconds the node has been idle.
    pub idle_time: u64,
    pub running_job: bool,
    pub static_node_in_replacement: bool,
    pub being_replaced: bool,
    pub replacement_timeout: bool,
    pub failing_health_check: bool,
    pub reason: Option<String>,
    pub error_code: Option<String>,
}

impl NodeRecord {
    pub fn new(
        name: impl Into<String>,
        address: impl Into<String>,
        hostname: impl Into<String>,
        state_string: impl Into<String>,
        partitions: impl Into<String>,
        reason: Option<&str>,
    ) -> Self {
        let name = name.into();
        let state_string = state_string.into();
        let partitions: Vec<String> = partitions
            .into()
            .split(',')
            .filter(|p| !p.is_empty())
            .map(|p| p.to_string())
            .collect();
        let (queue_name, kind, compute_resource) = match parse_node_name(&name) {
            Some((queue, kind, resource)) => (queue.to_string(), kind, resource.to_string()),
            None => {
                log::debug!("Node name {name} does not follow the <queue>-<st|dy>-<resource>-<n> convention");
                (String::new(), NodeKind::Dynamic, String::new())
            }
        };
        let error_code = reason.and_then(parse_error_code).map(|c| c.to_string());

        let mut node = Self {
            name,
            address: address.into(),
            hostname: hostname.into(),
            state_string,
            partitions,
            queue_name,
            compute_resource,
            kind,
            instance: None,
            slurmd_start_time: None,
            up_time: 0,
            idle_time: 0,
            running_job: false,
            static_node_in_replacement: false,
            being_replaced: false,
            replacement_timeout: false,
            failing_health_check: false,
            reason: reason.map(|r| r.to_string()),
            error_code,
        };
        node.running_job = matches!(node.state(), "ALLOCATED" | "MIXED" | "COMPLETING")
            && !node.state_flags().any(|flag| flag == "POWERING_UP");
        node
    }

    pub fn with_instance(mut self, instance: InstanceRecord) -> Self {
        self.instance = Some(instance);
        self
    }

    pub fn with_idle_time(mut self, idle_time: u64) -> Self {
        self.idle_time = idle_time;
        self
    }

    /// Base state, e.g. `IDLE` for `IDLE+CLOUD+POWERING_DOWN`.
    pub fn state(&self) -> &str {
        self.state_string
            .split('+')
            .next()
            .unwrap_or(&self.state_string)
    }

    pub fn state_flags(&self) -> impl Iterator<Item = &str> {
        self.state_string.split('+').skip(1).filter(|f| !f.is_empty())
    }

    pub fn is_ice(&self) -> bool {
        self.error_code
            .as_deref()
            .is_some_and(|code| classify(code) == FailureCategory::IceFailures)
    }

    pub fn description(&self) -> NodeDescription<'_> {
        NodeDescription {
            node_name: &self.name,
            address: &self.address,
            hostname: &self.hostname,
            state_string: &self.state_string,
            state: self.state(),
            state_flags: self.state_flags().collect(),
            partitions: &self.partitions,
            queue_name: &self.queue_name,
            compute_resource: &self.compute_resource,
            node_type: self.kind,
            instance: self.instance.as_ref().map(|i| i.description()),
            slurmd_start_time: self
                .slurmd_start_time
                .map(|t| t.to_rfc3339_opts(SecondsFormat::Secs, false)),
            up_time: self.up_time,
            idle_time: self.idle_time,
            is_running_job: self.running_job,
            static_node_in_replacement: self.static_node_in_replacement,
            is_being_replaced: self.being_replaced,
            replacement_timeout: self.replacement_timeout,
            failing_health_check: self.failing_health_check,
            error_code: self.error_code.as_deref(),
            reason: self.reason.as_deref(),
        }
    }
}

fn serialize_instance<S: Serializer>(
    instance: &Option<InstanceDescription>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    match instance {
        Some(instance) => instance.serialize(serializer),
        None => serializer.serialize_str("None"),
    }
}

/// Detail payload describing a node.
#[derive(Debug, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct NodeDescription<'a> {
    pub node_name: &'a str,
    pub address: &'a str,
    pub hostname: &'a str,
    pub state_string: &'a str,
    pub state: &'a str,
    pub state_flags: Vec<&'a str>,
    pub partitions: &'a [String],
    pub queue_name: &'a str,
    pub compute_resource: &'a str,
    pub node_type: NodeKind,
    #[serde(serialize_with = "serialize_instance")]
    pub instance: Option<InstanceDescription>,
    pub slurmd_start_time: Option<String>,
    pub up_time: u64,
    pub idle_time: u64,
    pub is_running_job: bool,
    pub static_node_in_replacement: bool,
    pub is_being_replaced: bool,
    pub replacement_timeout: bool,
    pub failing_health_check: bool,
    pub error_code: Option<&'a str>,
    pub reason: Option<&'a str>,
}
