//! JSON envelope responses and HTTP error mapping.
//!
//! Every response body is `{code, message, data}`. `code` is 0 on success and the
//! HTTP status otherwise.

use crate::errors::Error;
use axum::{
    Json,
    body::Body,
    extract::{
        Request, State,
        multipart::MultipartError,
        rejection::{JsonRejection, QueryRejection},
    },
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use serde_json::Value;
use std::any::Any;
use tracing::error;

/// Message used for redacted 500s.
pub const INTERNAL_ERROR_MESSAGE: &str = "Internal Server Error";

/// Response body wrapper.
#[derive(Debug, Clone, Serialize)]
pub struct Envelope<T> {
    /// 0 on success, HTTP status otherwise
    pub code: u16,
    /// "ok" or the error message
    pub message: String,
    /// Payload; `null` on errors
    pub data: T,
}

impl<T: Serialize> Envelope<T> {
    /// Wraps a successful payload.
    pub fn ok(data: T) -> Self {
        Self {
            code: 0,
            message: "ok".to_string(),
            data,
        }
    }
}

impl<T: Serialize> IntoResponse for Envelope<T> {
    fn into_response(self) -> Response {
        (StatusCode::OK, Json(self)).into_response()
    }
}

/// Handler result.
pub type ApiResult<T> = Result<Envelope<T>, ApiError>;

/// An error on its way to the client.
#[derive(Debug, Clone)]
pub struct ApiError {
    /// Status to respond with
    pub status: StatusCode,
    /// Message placed in the envelope
    pub message: String,
}

impl ApiError {
    /// 400 with `message`.
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }

    /// 404 with `message`.
    pub fn not_found(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            message: message.into(),
        }
    }

    fn internal(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: message.into(),
        }
    }
}

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        match err {
            Error::Validation { .. } | Error::TaskNotClaimable { .. } => {
                Self::bad_request(err.to_string())
            }
            Error::NotFound { .. } => Self::not_found(err.to_string()),
            other => {
                error!("Request failed: {other}");
                Self::internal(other.to_string())
            }
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::bad_request(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        Self::bad_request(rejection.body_text())
    }
}

impl From<MultipartError> for ApiError {
    fn from(err: MultipartError) -> Self {
        Self::bad_request(err.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Envelope {
            code: self.status.as_u16(),
            message: self.message,
            data: Value::Null,
        };
        (self.status, Json(body)).into_response()
    }
}

/// Replaces the body of every 500 with a generic message when `redact` is on.
pub async fn redact_internal_errors(
    State(redact): State<bool>,
    request: Request,
    next: Next,
) -> Response {
    let response = next.run(request).await;
    if redact && response.status() == StatusCode::INTERNAL_SERVER_ERROR {
        return ApiError::internal(INTERNAL_ERROR_MESSAGE).into_response();
    }
    response
}

/// Renders a caught panic as a 500 envelope.
pub fn panic_response(panic: Box<dyn Any + Send + 'static>) -> Response<Body> {
    let detail = panic
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| panic.downcast_ref::<&str>().copied())
        .unwrap_or("unknown panic");
    error!("Handler panicked: {detail}");
    ApiError::internal(INTERNAL_ERROR_MESSAGE).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_status_mapping() {
        let validation: ApiError = Error::validation("bad").into();
        assert_eq!(validation.status, StatusCode::BAD_REQUEST);
        assert_eq!(validation.message, "bad");

        let claim: ApiError = Error::TaskNotClaimable {
            code: "X".to_string(),
            status: "PENDING".to_string(),
        }
        .into();
        assert_eq!(claim.status, StatusCode::BAD_REQUEST);

        let missing: ApiError = Error::not_found("Task", "X").into();
        assert_eq!(missing.status, StatusCode::NOT_FOUND);

        let llm: ApiError = Error::Llm {
            message: "quota exceeded".to_string(),
        }
        .into();
        assert_eq!(llm.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(llm.message, "quota exceeded");
    }
}
