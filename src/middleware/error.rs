//! Error response formatting
//!
//! Provides standardized error responses with consistent JSON structure,
//! HTTP status codes, error codes, and user-friendly messages.

use crate::error::{AppError, ErrorCode, InfrastructureError, ValidationError};
use axum::{
    extract::rejection::{BytesRejection, JsonRejection},
    http::{StatusCode, Uri},
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::any::Any;

/// Standardized error response structure
///
/// Returned to clients for all error cases.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorResponse {
    /// Human-readable error message
    pub error: String,

    /// Machine-readable error code
    pub code: ErrorCode,

    /// Request ID for debugging and support
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,

    /// RFC 3339 timestamp of the error
    pub timestamp: String,
}

impl ErrorResponse {
    pub fn from_app_error(error: &AppError) -> Self {
        Self {
            error: error.user_message(),
            code: error.error_code(),
            request_id: error.request_id.clone(),
            timestamp: Utc::now().to_rfc3339(),
        }
    }

    pub fn internal_error(request_id: Option<String>) -> Self {
        Self {
            error: "Internal server error".to_string(),
            code: ErrorCode::InternalError,
            request_id,
            timestamp: Utc::now().to_rfc3339(),
        }
    }
}

/// Render `error` as a JSON response without logging it.
pub fn error_response(error: &AppError) -> Response {
    let status_code =
        StatusCode::from_u16(error.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status_code, Json(ErrorResponse::from_app_error(error))).into_response()
}

/// Logs the error, then renders it. The error itself rides along in the
/// response extensions so outer layers can re-render it with a request id.
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status_code = self.status_code();

        if status_code >= 500 {
            tracing::error!(
                error = %self,
                request_id = ?self.request_id,
                context = ?self.context,
                status = status_code,
                "Server error occurred"
            );
        } else {
            tracing::warn!(
                error = %self,
                request_id = ?self.request_id,
                context = ?self.context,
                status = status_code,
                "Client error occurred"
            );
        }

        let mut response = error_response(&self);
        response.extensions_mut().insert(self);
        response
    }
}

/// Fill in `requestId` on an error response produced further down the stack.
/// Status and headers of the original response are kept.
pub fn attach_request_id(response: Response, request_id: &str) -> Response {
    let (mut parts, body) = response.into_parts();
    match parts.extensions.remove::<AppError>() {
        Some(error) if error.request_id.is_none() => {
            let error = error.with_request_id(request_id);
            let (_, body) = error_response(&error).into_parts();
            parts.extensions.insert(error);
            Response::from_parts(parts, body)
        }
        Some(error) => {
            parts.extensions.insert(error);
            Response::from_parts(parts, body)
        }
        None => Response::from_parts(parts, body),
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::validation(ValidationError::MalformedBody {
            reason: rejection.body_text(),
        })
    }
}

impl From<BytesRejection> for AppError {
    fn from(rejection: BytesRejection) -> Self {
        AppError::validation(ValidationError::MalformedBody {
            reason: rejection.body_text(),
        })
    }
}

/// Catch-all for handler panics; the payload is logged and never returned.
pub fn handle_panic(panic: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "unknown panic payload".to_string()
    };

    tracing::error!(panic = %detail, "Handler panicked");

    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorResponse::internal_error(None)),
    )
        .into_response()
}

/// Router fallback for unknown paths
pub async fn route_not_found(uri: Uri) -> AppError {
    AppError::new(crate::error::AppErrorKind::Infrastructure(
        InfrastructureError::RouteNotFound {
            path: uri.path().to_string(),
        },
    ))
}

/// Helper to extract request ID from request headers
pub fn get_request_id_from_headers(headers: &axum::http::HeaderMap) -> Option<String> {
    headers
        .get("x-request-id")
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string())
}
