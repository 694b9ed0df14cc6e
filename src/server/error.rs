//! Error responses returned by the HTTP handlers
//!
//! Every error renders as `{"error": "<message>"}` with a matching status.

use crate::publish::PublishError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("missing 'message' query param")]
    MissingMessage,

    #[error("kafka write failed")]
    PublishFailed(#[source] PublishError),

    #[error("server is shutting down")]
    ShuttingDown,

    #[error("not found")]
    NotFound,

    #[error("method not allowed")]
    MethodNotAllowed,

    #[error("request timed out")]
    RequestTimeout,

    #[error("internal server error")]
    Internal,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::MissingMessage => StatusCode::BAD_REQUEST,
            ApiError::PublishFailed(_) => StatusCode::BAD_GATEWAY,
            ApiError::ShuttingDown => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::NotFound => StatusCode::NOT_FOUND,
            ApiError::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            ApiError::RequestTimeout => StatusCode::REQUEST_TIMEOUT,
            ApiError::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: self.to_string(),
        };
        (self.status(), Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(ApiError::MissingMessage.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            ApiError::PublishFailed(PublishError::Closed).status(),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            ApiError::ShuttingDown.status(),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            ApiError::RequestTimeout.status(),
            StatusCode::REQUEST_TIMEOUT
        );
        assert_eq!(
            ApiError::Internal.status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_publish_failure_hides_broker_detail() {
        let err = ApiError::PublishFailed(PublishError::Write("NOT_LEADER".into()));
        assert_eq!(err.to_string(), "kafka write failed");
    }
}
