//! Kafka broker adapter
//!
//! Opens a producer against the bootstrap brokers, resolves the partition count
//! of the configured topic and produces single records, routed by key. Every
//! record is acknowledged by the partition leader only (`acks=1`).

use super::partitioner::partition_for_key;
use super::{BrokerConnection, BrokerRecord, Connector, PublishError};
use async_trait::async_trait;
use rdkafka::config::ClientConfig;
use rdkafka::error::{KafkaError, RDKafkaErrorCode};
use rdkafka::producer::{FutureProducer, FutureRecord, Producer};
use std::time::Duration;
use tracing::{debug, info};

/// Acknowledgement required from the broker: the partition leader alone
pub const LEADER_ACK: &str = "1";

/// Smallest socket setup timeout librdkafka accepts
const MIN_SOCKET_SETUP: Duration = Duration::from_secs(1);

/// Production connector talking to Kafka through librdkafka
#[derive(Debug, Clone)]
pub struct KafkaConnector {
    brokers: Vec<String>,
    topic: String,
    publish_timeout: Duration,
    connect_timeout: Duration,
}

impl KafkaConnector {
    /// Connector whose dial and delivery deadlines fit inside `publish_timeout`
    ///
    /// Connecting (metadata lookup included) gets half of the publish
    /// deadline, so an unreachable broker is reported as a connect failure
    /// before the publish deadline fires.
    pub fn new(brokers: Vec<String>, topic: impl Into<String>, publish_timeout: Duration) -> Self {
        Self {
            brokers,
            topic: topic.into(),
            publish_timeout,
            connect_timeout: publish_timeout / 2,
        }
    }

    fn producer_config(&self) -> ClientConfig {
        let socket_setup = self.connect_timeout.max(MIN_SOCKET_SETUP);

        let mut config = ClientConfig::new();
        config
            .set("bootstrap.servers", self.brokers.join(","))
            .set("acks", LEADER_ACK)
            .set("enable.idempotence", "false")
            // One write per publish; the caller decides about retries
            .set("retries", "0")
            .set("linger.ms", "0")
            .set(
                "message.timeout.ms",
                self.publish_timeout.as_millis().to_string(),
            )
            .set(
                "socket.connection.setup.timeout.ms",
                socket_setup.as_millis().to_string(),
            )
            .set("allow.auto.create.topics", "false");
        config
    }
}

#[async_trait]
impl Connector for KafkaConnector {
    async fn connect(&self) -> Result<Box<dyn BrokerConnection>, PublishError> {
        let producer: FutureProducer = self
            .producer_config()
            .create()
            .map_err(|e| PublishError::Connect(e.to_string()))?;

        // Metadata lookups block the calling thread
        let lookup = producer.clone();
        let topic = self.topic.clone();
        let deadline = self.connect_timeout;
        let partition_count =
            tokio::task::spawn_blocking(move || topic_partition_count(&lookup, &topic, deadline))
                .await
                .map_err(|e| PublishError::Connect(e.to_string()))??;

        info!(
            brokers = ?self.brokers,
            topic = %self.topic,
            partitions = partition_count,
            "Connected to Kafka"
        );

        Ok(Box::new(KafkaConnection {
            producer: Some(producer),
            topic: self.topic.clone(),
            partition_count,
            publish_timeout: self.publish_timeout,
        }))
    }
}

fn topic_partition_count(
    producer: &FutureProducer,
    topic: &str,
    deadline: Duration,
) -> Result<i32, PublishError> {
    let metadata = producer
        .client()
        .fetch_metadata(Some(topic), deadline)
        .map_err(|e| PublishError::Connect(format!("metadata request failed: {}", e)))?;

    let entry = metadata
        .topics()
        .iter()
        .find(|t| t.name() == topic)
        .ok_or_else(|| PublishError::Connect(format!("unknown topic '{}'", topic)))?;

    if let Some(err) = entry.error() {
        return Err(PublishError::Connect(format!(
            "topic '{}' unavailable: {:?}",
            topic, err
        )));
    }
    if entry.partitions().is_empty() {
        return Err(PublishError::Connect(format!(
            "topic '{}' has no partitions",
            topic
        )));
    }

    Ok(entry.partitions().len() as i32)
}

/// Map a delivery failure onto the publish failure reasons
fn delivery_error(err: &KafkaError, publish_timeout: Duration) -> PublishError {
    match err.rdkafka_error_code() {
        Some(RDKafkaErrorCode::MessageTimedOut) => PublishError::Timeout(publish_timeout),
        Some(RDKafkaErrorCode::BrokerTransportFailure)
        | Some(RDKafkaErrorCode::AllBrokersDown)
        | Some(RDKafkaErrorCode::Resolve) => PublishError::Connect(err.to_string()),
        _ => PublishError::Write(err.to_string()),
    }
}

/// Open producer bound to one topic
struct KafkaConnection {
    // Taken on close/drop so the blocking teardown runs off the async workers
    producer: Option<FutureProducer>,
    topic: String,
    partition_count: i32,
    publish_timeout: Duration,
}

#[async_trait]
impl BrokerConnection for KafkaConnection {
    async fn produce(&mut self, record: BrokerRecord) -> Result<(), PublishError> {
        let producer = self.producer.as_ref().ok_or(PublishError::Closed)?;
        let partition = partition_for_key(&record.key, self.partition_count);

        let delivery = producer
            .send(
                FutureRecord::to(&self.topic)
                    .partition(partition)
                    .key(&record.key)
                    .payload(&record.value),
                Duration::ZERO,
            )
            .await;

        match delivery {
            Ok(_) => {
                debug!(topic = %self.topic, partition, "Record appended");
                Ok(())
            }
            Err((err, _)) => Err(delivery_error(&err, self.publish_timeout)),
        }
    }

    async fn close(&mut self) {
        if let Some(producer) = self.producer.take() {
            // Nothing is queued: a connection only survives successful writes
            let _ = tokio::task::spawn_blocking(move || drop(producer)).await;
        }
        info!(topic = %self.topic, "Kafka connection released");
    }
}

impl Drop for KafkaConnection {
    fn drop(&mut self) {
        // Dropping the producer purges queued records and joins its poll thread
        if let Some(producer) = self.producer.take() {
            match tokio::runtime::Handle::try_current() {
                Ok(handle) => {
                    handle.spawn_blocking(move || drop(producer));
                }
                Err(_) => drop(producer),
            }
        }
    }
}
