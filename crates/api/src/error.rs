//! API error types with HTTP response mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use saga::{ErrorKind, SagaError};
use serde::Serialize;
use thiserror::Error;

/// API-level error type that maps to HTTP responses.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Resource not found outside the saga, e.g. a route quote.
    #[error("{0}")]
    NotFound(String),
    /// Bad request from the client.
    #[error("{0}")]
    BadRequest(String),
    /// Failure inside the server itself, e.g. a panicked task.
    #[error("{0}")]
    Internal(String),
    /// Saga, payment or reconciliation error.
    #[error(transparent)]
    Saga(#[from] SagaError),
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
    code: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    booking_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    compensation_failures: Option<usize>,
}

/// Maps an error category to its HTTP status.
pub fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::Invalid => StatusCode::BAD_REQUEST,
        ErrorKind::Conflict => StatusCode::CONFLICT,
        ErrorKind::UpstreamFailure => StatusCode::BAD_GATEWAY,
        ErrorKind::Inconsistent | ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            ApiError::NotFound(msg) => (
                StatusCode::NOT_FOUND,
                ErrorBody {
                    error: msg,
                    code: "NOT_FOUND",
                    booking_id: None,
                    compensation_failures: None,
                },
            ),
            ApiError::BadRequest(msg) => (
                StatusCode::BAD_REQUEST,
                ErrorBody {
                    error: msg,
                    code: "INVALID_REQUEST",
                    booking_id: None,
                    compensation_failures: None,
                },
            ),
            ApiError::Internal(msg) => {
                tracing::error!(error = %msg, "request failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorBody {
                        error: msg,
                        code: "INTERNAL_ERROR",
                        booking_id: None,
                        compensation_failures: None,
                    },
                )
            }
            ApiError::Saga(err) => {
                let status = status_for(err.kind());
                if status.is_server_error() {
                    tracing::error!(error = %err, code = err.code(), "request failed");
                }
                (
                    status,
                    ErrorBody {
                        error: err.to_string(),
                        code: err.code(),
                        booking_id: err.booking_id().map(|id| id.to_string()),
                        compensation_failures: err
                            .compensation()
                            .map(|c| c.failures.len())
                            .filter(|n| *n > 0),
                    },
                )
            }
        };

        (status, axum::Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::{BookingId, RouteId};

    #[test]
    fn test_status_mapping() {
        let cases = [
            (
                SagaError::RouteNotFound(RouteId::new("r-1")),
                StatusCode::NOT_FOUND,
            ),
            (
                SagaError::InvalidRequest("first_name is required".into()),
                StatusCode::BAD_REQUEST,
            ),
            (SagaError::Conflict("busy".into()), StatusCode::CONFLICT),
            (
                SagaError::RefundFailed {
                    booking_id: BookingId::new(),
                    reason: "gateway down".into(),
                },
                StatusCode::BAD_GATEWAY,
            ),
            (
                SagaError::Inconsistent {
                    booking_id: BookingId::new(),
                    reason: "no payment attached".into(),
                },
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (err, status) in cases {
            assert_eq!(ApiError::from(err).into_response().status(), status);
        }
    }

    #[test]
    fn test_internal_and_persist_failures_are_server_errors() {
        let response = ApiError::Internal("booking task failed".into()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let err = SagaError::PersistFailed {
            booking_id: BookingId::new(),
            source: store::StoreError::Backend("db down".into()),
            compensation: saga::CompensationReport::default(),
        };
        assert_eq!(
            ApiError::from(err).into_response().status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_bad_request() {
        let response = ApiError::BadRequest("invalid booking id".into()).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
