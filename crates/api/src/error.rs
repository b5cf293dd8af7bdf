//! API error types with HTTP response mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use domain::DomainError;
use order_store::StoreError;

/// API-level error type that maps to HTTP responses.
#[derive(Debug)]
pub enum ApiError {
    /// Bad request from the client.
    BadRequest(String),
    /// Domain logic error.
    Domain(DomainError),
    /// Order store error.
    Store(StoreError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Domain(err) => domain_error_to_response(err),
            ApiError::Store(err) => store_error_to_response(err),
        };

        let body = serde_json::json!({ "error": message });
        (status, axum::Json(body)).into_response()
    }
}

fn domain_error_to_response(err: DomainError) -> (StatusCode, String) {
    let status = match &err {
        DomainError::CounterNotFound(_)
        | DomainError::OrderNotFound(_)
        | DomainError::ItemIndexOutOfRange { .. } => StatusCode::NOT_FOUND,
        DomainError::DuplicatePin => StatusCode::CONFLICT,
        DomainError::InvalidStatus(_) | DomainError::Validation(_) => StatusCode::BAD_REQUEST,
    };
    (status, err.to_string())
}

fn store_error_to_response(err: StoreError) -> (StatusCode, String) {
    match err {
        StoreError::OrderNotFound(_) => (StatusCode::NOT_FOUND, err.to_string()),
        StoreError::Domain(inner) => domain_error_to_response(inner),
        StoreError::Io(_) | StoreError::Serialization(_) => {
            tracing::error!(error = %err, "order store failure");
            (StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
        }
    }
}

impl From<DomainError> for ApiError {
    fn from(err: DomainError) -> Self {
        ApiError::Domain(err)
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        ApiError::Store(err)
    }
}
