pub mod instance;
pub mod node;

pub use instance::{InstanceDescription, InstanceRecord, LaunchTime};
pub use node::{NodeDescription, NodeKind, NodeRecord, parse_error_code};
