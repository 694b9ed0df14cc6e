//! HTTP front door that publishes caller supplied messages to a Kafka topic

pub mod config;
pub mod publish;
pub mod server;
