//! Time-bounded publishing over one shared broker connection

use super::{
    BrokerConnection, BrokerRecord, Connector, PublishError, PublishOutcome, PublishRequest,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{info, warn};

/// State of the shared connection
enum Slot {
    /// Nothing open yet, or the last connection was discarded
    Idle,
    Open(Box<dyn BrokerConnection>),
    /// Released during shutdown; never reopened
    Released,
}

/// Owns the broker connection and runs one bounded write per publish
///
/// Writes are serialized through the slot mutex. The connection is taken out
/// of the slot for the duration of a write and only put back when the write
/// succeeds, so a write aborted by the deadline (or failed by the transport)
/// drops its connection and the next publish reconnects.
pub struct PublishCoordinator {
    connector: Arc<dyn Connector>,
    slot: Mutex<Slot>,
    timeout: Duration,
}

impl PublishCoordinator {
    pub fn new(connector: Arc<dyn Connector>, timeout: Duration) -> Self {
        Self {
            connector,
            slot: Mutex::new(Slot::Idle),
            timeout,
        }
    }

    /// Publish one message, giving up after the configured timeout
    ///
    /// Exactly one write is attempted; there is no retry. Dropping the
    /// returned future (e.g. client disconnect) aborts the write.
    pub async fn publish(&self, request: PublishRequest) -> PublishOutcome {
        let record = request.into_record();

        match tokio::time::timeout(self.timeout, self.write(record)).await {
            Ok(Ok(())) => PublishOutcome::Success,
            Ok(Err(e)) => {
                warn!(error = %e, reason = e.label(), "Kafka write failed");
                PublishOutcome::Failure(e)
            }
            Err(_) => {
                let e = PublishError::Timeout(self.timeout);
                warn!(error = %e, reason = e.label(), "Kafka write failed");
                PublishOutcome::Failure(e)
            }
        }
    }

    async fn write(&self, record: BrokerRecord) -> Result<(), PublishError> {
        let mut slot = self.slot.lock().await;

        let mut connection = match std::mem::replace(&mut *slot, Slot::Idle) {
            Slot::Open(connection) => connection,
            Slot::Idle => self.connector.connect().await?,
            Slot::Released => {
                *slot = Slot::Released;
                return Err(PublishError::Closed);
            }
        };

        connection.produce(record).await?;
        *slot = Slot::Open(connection);
        Ok(())
    }

    /// Release the broker connection
    ///
    /// Returns true only for the call that performed the release; later
    /// publishes fail with [`PublishError::Closed`].
    pub async fn close(&self) -> bool {
        let mut slot = self.slot.lock().await;

        match std::mem::replace(&mut *slot, Slot::Released) {
            Slot::Open(mut connection) => {
                connection.close().await;
                info!("Broker connection released");
                true
            }
            Slot::Idle => {
                info!("Publisher closed (no open broker connection)");
                true
            }
            Slot::Released => false,
        }
    }

    /// Whether a connection is currently held open
    pub async fn is_connected(&self) -> bool {
        matches!(*self.slot.lock().await, Slot::Open(_))
    }
}

#[cfg(test)]
#[path = "coordinator_test.rs"]
mod tests;
