//! In-memory broker for tests
//!
//! Stores produced records so tests can assert on exactly what was
//! delivered, and can be told to fail, hang or panic.

use super::{BrokerConnection, BrokerRecord, Connector, PublishError};
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// How the mock behaves on the next operations
#[derive(Debug, Clone, Default)]
pub enum MockBehavior {
    #[default]
    Accept,
    RefuseConnect,
    RejectWrite,
    /// Sleep before acknowledging; the record is only stored after the delay
    Delay(Duration),
    PanicOnWrite,
}

#[derive(Default)]
struct Shared {
    records: Mutex<Vec<BrokerRecord>>,
    behavior: Mutex<MockBehavior>,
    connects: AtomicUsize,
    produce_calls: AtomicUsize,
    closes: AtomicUsize,
}

#[derive(Clone, Default)]
pub struct MockConnector {
    shared: Arc<Shared>,
}

#[allow(clippy::unwrap_used)]
impl MockConnector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_behavior(behavior: MockBehavior) -> Self {
        let mock = Self::new();
        mock.set_behavior(behavior);
        mock
    }

    pub fn set_behavior(&self, behavior: MockBehavior) {
        *self.shared.behavior.lock().unwrap() = behavior;
    }

    fn behavior(&self) -> MockBehavior {
        self.shared.behavior.lock().unwrap().clone()
    }

    /// Records acknowledged by the mock broker
    pub fn delivered(&self) -> Vec<BrokerRecord> {
        self.shared.records.lock().unwrap().clone()
    }

    pub fn connects(&self) -> usize {
        self.shared.connects.load(Ordering::SeqCst)
    }

    /// Number of produce calls, including failed and aborted ones
    pub fn produce_calls(&self) -> usize {
        self.shared.produce_calls.load(Ordering::SeqCst)
    }

    pub fn closes(&self) -> usize {
        self.shared.closes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Connector for MockConnector {
    async fn connect(&self) -> Result<Box<dyn BrokerConnection>, PublishError> {
        self.shared.connects.fetch_add(1, Ordering::SeqCst);
        if let MockBehavior::RefuseConnect = self.behavior() {
            return Err(PublishError::Connect("connection refused".to_string()));
        }
        Ok(Box::new(MockConnection {
            connector: self.clone(),
        }))
    }
}

struct MockConnection {
    connector: MockConnector,
}

#[allow(clippy::unwrap_used)]
#[async_trait]
impl BrokerConnection for MockConnection {
    async fn produce(&mut self, record: BrokerRecord) -> Result<(), PublishError> {
        let shared = &self.connector.shared;
        shared.produce_calls.fetch_add(1, Ordering::SeqCst);

        match self.connector.behavior() {
            MockBehavior::Accept | MockBehavior::RefuseConnect => {}
            MockBehavior::RejectWrite => {
                return Err(PublishError::Write("MESSAGE_TOO_LARGE".to_string()));
            }
            MockBehavior::Delay(delay) => tokio::time::sleep(delay).await,
            MockBehavior::PanicOnWrite => panic!("mock broker exploded"),
        }

        shared.records.lock().unwrap().push(record);
        Ok(())
    }

    async fn close(&mut self) {
        self.connector.shared.closes.fetch_add(1, Ordering::SeqCst);
    }
}
