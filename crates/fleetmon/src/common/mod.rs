pub mod config;
pub mod error;
pub mod heartbeat;
pub mod parser;
pub mod setup;
pub mod timeutils;
