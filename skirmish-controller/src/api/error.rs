//! API Error Handling
//!
//! Converts controller errors into status codes and a JSON body of the form
//! `{"error": <message>, "code": <code>}`. Clients match on `code`.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};

use crate::service::ControllerError;
use crate::store::StoreError;

/// API error type
#[derive(Debug)]
pub enum ApiError {
    NotFound(String),
    NotOwner(String),
    InvalidState(String),
    BadRequest(String),
    StoreUnavailable(StoreError),
}

impl ApiError {
    fn code(&self) -> &'static str {
        match self {
            ApiError::NotFound(_) => "not_found",
            ApiError::NotOwner(_) => "not_owner",
            ApiError::InvalidState(_) => "invalid_state",
            ApiError::BadRequest(_) => "bad_request",
            ApiError::StoreUnavailable(_) => "store_unavailable",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let code = self.code();
        let (status, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::NotOwner(msg) => (StatusCode::CONFLICT, msg),
            ApiError::InvalidState(msg) => (StatusCode::CONFLICT, msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::StoreUnavailable(err) => {
                tracing::error!("Store error: {:?}", err);
                (StatusCode::SERVICE_UNAVAILABLE, err.to_string())
            }
        };

        (
            status,
            Json(serde_json::json!({ "error": message, "code": code })),
        )
            .into_response()
    }
}

impl From<ControllerError> for ApiError {
    fn from(err: ControllerError) -> Self {
        match err {
            ControllerError::NotFound(_) => ApiError::NotFound(err.to_string()),
            ControllerError::NotOwner { .. } => ApiError::NotOwner(err.to_string()),
            ControllerError::InvalidState(msg) => ApiError::InvalidState(msg),
            ControllerError::ValidationError(msg) => ApiError::BadRequest(msg),
            ControllerError::Store(err) => ApiError::StoreUnavailable(err),
        }
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
