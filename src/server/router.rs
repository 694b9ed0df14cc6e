//! HTTP routes
//!
//! - `GET /health_check` - Liveness, always `{"status":"ok"}`
//! - `GET /kafka_write?message=..` - Publish `message` to the configured topic
//! - `GET /metrics` - Prometheus metrics in text format
//!
//! Every route runs behind [`fault_barrier`], which turns a panicking handler
//! into a 500 response instead of dropping the connection, and behind a
//! request timeout that answers 408 once the global ceiling is exceeded.

use super::error::ApiError;
use super::lifecycle::LifecycleState;
use super::metrics::SharedMetrics;
use crate::config::DEFAULT_REQUEST_TIMEOUT;
use crate::publish::{PublishCoordinator, PublishOutcome, PublishRequest};
use axum::{
    extract::{rejection::QueryRejection, Query, Request, State},
    http::{header::CONTENT_TYPE, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use futures::FutureExt;
use serde::Serialize;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tower_http::timeout::TimeoutLayer;
use tracing::{debug, error, warn};

/// `status` values of the success bodies
pub const HEALTH_OK: &str = "ok";
pub const PUBLISH_OK: &str = "kafka 📝";

/// State shared by all handlers
#[derive(Clone)]
pub struct AppState {
    pub publisher: Arc<PublishCoordinator>,
    pub lifecycle: LifecycleState,
    pub metrics: SharedMetrics,
    /// Ceiling on handling one request, publish included
    pub request_timeout: Duration,
}

impl AppState {
    pub fn new(publisher: Arc<PublishCoordinator>, metrics: SharedMetrics) -> Self {
        Self {
            publisher,
            lifecycle: LifecycleState::new(),
            metrics,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    pub fn with_request_timeout(mut self, request_timeout: Duration) -> Self {
        self.request_timeout = request_timeout;
        self
    }
}

#[derive(Debug, Serialize)]
struct StatusBody {
    status: &'static str,
}

/// Liveness probe handler
async fn health_check() -> Json<StatusBody> {
    Json(StatusBody { status: HEALTH_OK })
}

/// Publish handler
///
/// The first `message` query parameter is published; a missing or empty one
/// is rejected before the broker is touched.
async fn kafka_write(
    State(state): State<AppState>,
    query: Result<Query<Vec<(String, String)>>, QueryRejection>,
) -> Result<Json<StatusBody>, ApiError> {
    if state.lifecycle.is_draining() {
        return Err(ApiError::ShuttingDown);
    }

    let message = query
        .ok()
        .and_then(|Query(params)| params.into_iter().find(|(k, _)| k == "message"))
        .map(|(_, v)| v)
        .unwrap_or_default();
    let request = PublishRequest::new(message).map_err(|_| ApiError::MissingMessage)?;

    let started = Instant::now();
    let outcome = state.publisher.publish(request).await;
    state
        .metrics
        .record_publish(&outcome, started.elapsed().as_secs_f64());

    match outcome {
        PublishOutcome::Success => {
            debug!("Message published");
            Ok(Json(StatusBody { status: PUBLISH_OK }))
        }
        PublishOutcome::Failure(e) => Err(ApiError::PublishFailed(e)),
    }
}

/// Prometheus metrics handler
async fn metrics(State(state): State<AppState>) -> Response {
    match state.metrics.encode() {
        Ok(body) => (
            StatusCode::OK,
            [(CONTENT_TYPE, "text/plain; version=0.0.4; charset=utf-8")],
            body,
        )
            .into_response(),
        Err(e) => {
            error!(error = %e, "Failed to encode metrics");
            ApiError::Internal.into_response()
        }
    }
}

async fn not_found() -> ApiError {
    ApiError::NotFound
}

async fn method_not_allowed() -> ApiError {
    ApiError::MethodNotAllowed
}

/// Catch panics from the wrapped handler and answer with a JSON 500
pub async fn fault_barrier(State(metrics): State<SharedMetrics>, req: Request, next: Next) -> Response {
    let method = req.method().clone();
    let path = req.uri().path().to_string();

    match AssertUnwindSafe(next.run(req)).catch_unwind().await {
        Ok(response) => response,
        Err(panic) => {
            metrics.record_panic();
            error!(
                method = %method,
                path = %path,
                panic = %panic_message(panic.as_ref()),
                "Handler panicked, recovered at fault barrier"
            );
            ApiError::Internal.into_response()
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

/// Render the bare 408 of the timeout layer as a JSON error
async fn timeout_as_json(response: Response) -> Response {
    if response.status() == StatusCode::REQUEST_TIMEOUT {
        warn!("Request exceeded the global timeout ceiling");
        return ApiError::RequestTimeout.into_response();
    }
    response
}

/// Routes without the fault barrier
fn routes(state: AppState) -> Router {
    Router::new()
        .route("/health_check", get(health_check).fallback(method_not_allowed))
        .route("/kafka_write", get(kafka_write).fallback(method_not_allowed))
        .route("/metrics", get(self::metrics).fallback(method_not_allowed))
        .fallback(not_found)
        .with_state(state)
}

/// Wrap every route of `router` in the fault barrier
fn with_fault_barrier(router: Router, metrics: SharedMetrics) -> Router {
    router.layer(middleware::from_fn_with_state(metrics, fault_barrier))
}

/// Cut off any request still running after `timeout`
///
/// The handler future is dropped, so an unfinished publish never completes.
fn with_request_timeout(router: Router, timeout: Duration) -> Router {
    router
        .layer(TimeoutLayer::new(timeout))
        .layer(middleware::map_response(timeout_as_json))
}

/// Build the full application router
pub fn build_router(state: AppState) -> Router {
    let metrics = state.metrics.clone();
    let request_timeout = state.request_timeout;
    with_request_timeout(with_fault_barrier(routes(state), metrics), request_timeout)
}

#[cfg(test)]
#[path = "router_test.rs"]
mod tests;
