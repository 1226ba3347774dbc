pub mod cluster;
pub mod common;
pub mod event;
pub mod hostlist;

#[cfg(test)]
pub(crate) mod tests;

pub type Error = crate::common::error::FleetError;
pub type Result<T> = std::result::Result<T, Error>;

pub type Map<K, V> = std::collections::BTreeMap<K, V>;

/// Failed nodes grouped by the provider error code that caused the failure.
pub type FailedNodes = Map<String, Vec<String>>;

pub const FLEETMON_VERSION: &str = env!("CARGO_PKG_VERSION");
