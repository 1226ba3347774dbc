use thiserror::Error;

use crate::common::error::FleetError::GenericError;
use crate::hostlist::HostlistError;

#[derive(Debug, Error)]
pub enum FleetError {
    #[error(transparent)]
    IoError(#[from] std::io::Error),
    #[error("Configuration error: {0}")]
    ConfigError(String),
    #[error("Invalid node list: {0}")]
    HostlistError(#[from] HostlistError),
    #[error("Serialization error: {0}")]
    SerializationError(String),
    #[error("Heartbeat error: {0}")]
    HeartbeatError(String),
    #[error("Error: {0}")]
    GenericError(String),
}

impl From<serde_json::error::Error> for FleetError {
    fn from(e: serde_json::error::Error) -> Self {
        Self::SerializationError(e.to_string())
    }
}

impl From<toml::de::Error> for FleetError {
    fn from(error: toml::de::Error) -> Self {
        Self::ConfigError(error.to_string())
    }
}

impl From<anyhow::Error> for FleetError {
    fn from(error: anyhow::Error) -> Self {
        Self::GenericError(error.to_string())
    }
}

impl From<String> for FleetError {
    fn from(e: String) -> Self {
        GenericError(e)
    }
}

pub fn error<T>(message: String) -> crate::Result<T> {
    Err(GenericError(message))
}
