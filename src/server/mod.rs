//! HTTP server for the writer service
//!
//! Provides:
//! - `/health_check` - Liveness probe
//! - `/kafka_write` - Publish a message to Kafka
//! - `/metrics` - Prometheus metrics
//!
//! Also drives graceful shutdown: on the first interrupt the listener stops
//! accepting, in-flight requests get a grace period, then the broker
//! connection is released.

mod error;
pub mod lifecycle;
pub mod metrics;
mod router;
pub mod shutdown;

#[cfg(test)]
mod testing;

pub use error::ApiError;
pub use lifecycle::{LifecycleState, Phase};
pub use metrics::{create_metrics, Metrics, SharedMetrics};
pub use router::AppState;
pub use shutdown::{shutdown_channel, InterruptListener, ShutdownController, ShutdownSignal};

use router::build_router;
use std::future::IntoFuture;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::TcpListener;
use tracing::{info, warn};

/// Bind the HTTP listener on all interfaces
///
/// Failing to bind is the one error that aborts startup.
pub async fn bind(port: u16) -> Result<TcpListener, std::io::Error> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = TcpListener::bind(addr).await?;
    info!(port = %port, "HTTP server listening");
    Ok(listener)
}

/// Serve requests until `shutdown` fires, then shut down in order
///
/// 1. Draining: stop accepting connections, refuse new publishes
/// 2. Wait up to `grace` for in-flight requests, then force close
/// 3. Release the broker connection
/// 4. Closed
pub async fn serve(
    listener: TcpListener,
    state: AppState,
    shutdown: ShutdownSignal,
    grace: Duration,
) -> Result<(), std::io::Error> {
    let app = build_router(state.clone());

    let mut drain_signal = shutdown.clone();
    let drain_lifecycle = state.lifecycle.clone();
    let server = axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            drain_signal.wait().await;
            if drain_lifecycle.begin_draining() {
                info!("Draining: listener closed, waiting for in-flight requests");
            }
        })
        .into_future();
    let mut server = std::pin::pin!(server);

    let mut trigger = shutdown;
    let result = tokio::select! {
        res = &mut server => res,
        _ = trigger.wait() => {
            state.lifecycle.begin_draining();
            match tokio::time::timeout(grace, &mut server).await {
                Ok(res) => res,
                Err(_) => {
                    warn!(grace = ?grace, "Grace period elapsed, closing remaining connections");
                    Ok(())
                }
            }
        }
    };

    state.lifecycle.begin_draining();
    state.publisher.close().await;
    if state.lifecycle.mark_closed() {
        info!("Server closed");
    }

    result
}

#[cfg(test)]
#[path = "serve_test.rs"]
mod serve_tests;

#[cfg(test)]
#[path = "shutdown_test.rs"]
mod shutdown_tests;
