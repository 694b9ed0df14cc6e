//! Publishing messages to the broker
//!
//! The [`PublishCoordinator`] owns the broker connection and turns a
//! [`PublishRequest`] into a single, time-bounded write. Broker access goes
//! through the [`Connector`]/[`BrokerConnection`] traits:
//! - Production code uses [`KafkaConnector`] (librdkafka, leader acknowledged)
//! - Tests use `MockConnector` which records writes in memory

mod coordinator;
pub mod kafka;
pub mod partitioner;

#[cfg(test)]
pub mod mock;

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

pub use coordinator::PublishCoordinator;
pub use kafka::KafkaConnector;

/// Key used for partition routing when the caller does not supply one
pub const DEFAULT_PARTITION_KEY: &[u8] = b"health";

/// Why a publish attempt did not succeed
#[derive(Debug, Clone, Error, PartialEq)]
pub enum PublishError {
    #[error("publish deadline of {0:?} exceeded")]
    Timeout(Duration),

    #[error("broker connection failed: {0}")]
    Connect(String),

    #[error("broker rejected write: {0}")]
    Write(String),

    #[error("broker connection already released")]
    Closed,
}

impl PublishError {
    /// Short stable label, used for metrics and log fields
    pub fn label(&self) -> &'static str {
        match self {
            PublishError::Timeout(_) => "timeout",
            PublishError::Connect(_) => "connect",
            PublishError::Write(_) => "write",
            PublishError::Closed => "closed",
        }
    }
}

/// Result of one publish attempt
#[derive(Debug, Clone, PartialEq)]
pub enum PublishOutcome {
    Success,
    Failure(PublishError),
}

impl PublishOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, PublishOutcome::Success)
    }

    pub fn label(&self) -> &'static str {
        match self {
            PublishOutcome::Success => "success",
            PublishOutcome::Failure(e) => e.label(),
        }
    }
}

#[derive(Debug, Error, PartialEq)]
#[error("message must not be empty")]
pub struct EmptyMessage;

/// A caller supplied message waiting to be published
#[derive(Debug, Clone, PartialEq)]
pub struct PublishRequest {
    message: String,
    partition_key: Option<Vec<u8>>,
}

impl PublishRequest {
    /// Create a request for a non-empty message
    pub fn new(message: impl Into<String>) -> Result<Self, EmptyMessage> {
        let message = message.into();
        if message.is_empty() {
            return Err(EmptyMessage);
        }
        Ok(Self {
            message,
            partition_key: None,
        })
    }

    /// Route the message by an explicit key instead of the default one
    pub fn with_partition_key(mut self, key: impl Into<Vec<u8>>) -> Self {
        self.partition_key = Some(key.into());
        self
    }

    pub fn partition_key(&self) -> Option<&[u8]> {
        self.partition_key.as_deref()
    }

    /// Resolve into the record written to the broker
    pub fn into_record(self) -> BrokerRecord {
        BrokerRecord {
            key: self
                .partition_key
                .unwrap_or_else(|| DEFAULT_PARTITION_KEY.to_vec()),
            value: self.message.into_bytes(),
        }
    }
}

/// Key/value pair as it goes onto the wire
#[derive(Debug, Clone, PartialEq)]
pub struct BrokerRecord {
    pub key: Vec<u8>,
    pub value: Vec<u8>,
}

/// Opens connections to the broker
#[async_trait]
pub trait Connector: Send + Sync {
    async fn connect(&self) -> Result<Box<dyn BrokerConnection>, PublishError>;
}

/// An open connection able to append records to the configured topic
#[async_trait]
pub trait BrokerConnection: Send {
    /// Append exactly one record, waiting for the broker acknowledgement
    async fn produce(&mut self, record: BrokerRecord) -> Result<(), PublishError>;

    /// Release the connection. Called at most once, never followed by produce.
    async fn close(&mut self) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_message_is_rejected() {
        assert_eq!(PublishRequest::new(""), Err(EmptyMessage));
    }

    #[test]
    fn test_record_uses_default_key() {
        let record = PublishRequest::new("hello").unwrap().into_record();

        assert_eq!(record.key, b"health".to_vec());
        assert_eq!(record.value, b"hello".to_vec());
    }

    #[test]
    fn test_record_uses_explicit_key() {
        let request = PublishRequest::new("hello")
            .unwrap()
            .with_partition_key("tenant-7");
        assert_eq!(request.partition_key(), Some(&b"tenant-7"[..]));

        let record = request.into_record();
        assert_eq!(record.key, b"tenant-7".to_vec());
    }

    #[test]
    fn test_outcome_labels() {
        assert_eq!(PublishOutcome::Success.label(), "success");
        assert_eq!(
            PublishOutcome::Failure(PublishError::Timeout(Duration::from_secs(5))).label(),
            "timeout"
        );
        assert_eq!(
            PublishOutcome::Failure(PublishError::Connect("refused".into())).label(),
            "connect"
        );
        assert_eq!(
            PublishOutcome::Failure(PublishError::Write("too large".into())).label(),
            "write"
        );
        assert!(!PublishOutcome::Failure(PublishError::Closed).is_success());
    }
}
