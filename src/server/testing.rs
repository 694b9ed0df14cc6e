//! Helpers for tests that run the real HTTP server on an ephemeral port

use super::{create_metrics, serve, shutdown_channel, AppState, ShutdownController};
use crate::publish::mock::MockConnector;
use crate::publish::PublishCoordinator;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

pub struct TestApp {
    pub addr: SocketAddr,
    pub state: AppState,
    pub broker: MockConnector,
    pub shutdown: ShutdownController,
    pub handle: JoinHandle<Result<(), std::io::Error>>,
}

impl TestApp {
    pub fn url(&self, path_and_query: &str) -> String {
        format!("http://{}{}", self.addr, path_and_query)
    }
}

pub fn app_state(broker: &MockConnector, publish_timeout: Duration) -> AppState {
    let publisher = Arc::new(PublishCoordinator::new(
        Arc::new(broker.clone()),
        publish_timeout,
    ));
    #[allow(clippy::unwrap_used)]
    let metrics = create_metrics().unwrap();
    AppState::new(publisher, metrics)
}

/// Start the server with a mock broker
pub async fn spawn_app(broker: MockConnector, publish_timeout: Duration, grace: Duration) -> TestApp {
    let state = app_state(&broker, publish_timeout);
    spawn_app_with_state(state, broker, grace).await
}

/// Start the server with prepared state; `broker` must back `state.publisher`
#[allow(clippy::unwrap_used)]
pub async fn spawn_app_with_state(state: AppState, broker: MockConnector, grace: Duration) -> TestApp {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (shutdown, signal) = shutdown_channel();

    let server_state = state.clone();
    let handle = tokio::spawn(async move { serve(listener, server_state, signal, grace).await });

    TestApp {
        addr,
        state,
        broker,
        shutdown,
        handle,
    }
}
