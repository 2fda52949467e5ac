//! Error handling for the checkout bridge
//!
//! Every failure a handler can produce is an [`AppError`]. The error carries
//! its HTTP status, a stable machine-readable code and a message that is safe
//! to show to callers. Infrastructure details never reach the response body.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::payments::types::PaymentStatus;

/// Error codes for programmatic handling
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // Validation (400)
    ValidationError,
    MalformedBody,

    // Authentication (401/403)
    AuthRequired,
    InvalidApiKey,
    InvalidSignature,

    // Domain
    PaymentNotFound,
    InvalidStateTransition,
    DuplicatePayment,
    AmountExceeded,

    // Infrastructure (5xx)
    InternalError,
    RouteNotFound,
}

/// Payment lifecycle errors
#[derive(Debug, Clone)]
pub enum DomainError {
    /// No record with this identifier
    PaymentNotFound { payment_id: String },
    /// The record's current status does not permit the operation
    InvalidTransition {
        payment_id: String,
        from: PaymentStatus,
        operation: &'static str,
    },
    /// A record with this identifier already exists
    DuplicatePayment { payment_id: String },
    /// Requested amount is larger than what the record allows
    AmountExceeded {
        field: &'static str,
        requested: String,
        limit: String,
    },
}

/// Authentication failures
#[derive(Debug, Clone)]
pub enum AuthError {
    MissingApiKey,
    InvalidApiKey,
    MissingSignature,
    InvalidSignature,
    InvalidPlatformInstance { reason: String },
}

/// Input validation errors
#[derive(Debug, Clone)]
pub enum ValidationError {
    MissingField { field: String },
    InvalidAmount { amount: String, reason: String },
    InvalidCurrency { currency: String },
    InvalidCard { field: &'static str, reason: String },
    InvalidUrl { field: String, reason: String },
    InvalidStatus { status: String },
    MalformedBody { reason: String },
}

/// Unexpected faults
#[derive(Debug, Clone)]
pub enum InfrastructureError {
    Internal { message: String },
    Configuration { message: String },
    RouteNotFound { path: String },
}

/// Unified application error type
#[derive(Debug, Clone)]
pub struct AppError {
    pub kind: AppErrorKind,
    pub request_id: Option<String>,
    pub context: Option<String>,
}

#[derive(Debug, Clone)]
pub enum AppErrorKind {
    Domain(DomainError),
    Auth(AuthError),
    Validation(ValidationError),
    Infrastructure(InfrastructureError),
}

impl AppError {
    pub fn new(kind: AppErrorKind) -> Self {
        Self {
            kind,
            request_id: None,
            context: None,
        }
    }

    pub fn with_request_id(mut self, request_id: impl Into<String>) -> Self {
        self.request_id = Some(request_id.into());
        self
    }

    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    pub fn not_found(payment_id: impl Into<String>) -> Self {
        Self::new(AppErrorKind::Domain(DomainError::PaymentNotFound {
            payment_id: payment_id.into(),
        }))
    }

    pub fn invalid_transition(
        payment_id: impl Into<String>,
        from: PaymentStatus,
        operation: &'static str,
    ) -> Self {
        Self::new(AppErrorKind::Domain(DomainError::InvalidTransition {
            payment_id: payment_id.into(),
            from,
            operation,
        }))
    }

    pub fn validation(err: ValidationError) -> Self {
        Self::new(AppErrorKind::Validation(err))
    }

    pub fn auth(err: AuthError) -> Self {
        Self::new(AppErrorKind::Auth(err))
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(AppErrorKind::Infrastructure(InfrastructureError::Internal {
            message: message.into(),
        }))
    }

    /// Map error to HTTP status code
    pub fn status_code(&self) -> u16 {
        match &self.kind {
            AppErrorKind::Domain(err) => match err {
                DomainError::PaymentNotFound { .. } => 404,
                DomainError::InvalidTransition { .. } => 400,
                DomainError::DuplicatePayment { .. } => 400,
                DomainError::AmountExceeded { .. } => 400,
            },
            AppErrorKind::Auth(err) => match err {
                AuthError::MissingApiKey => 401,
                AuthError::MissingSignature => 401,
                AuthError::InvalidPlatformInstance { .. } => 401,
                AuthError::InvalidApiKey => 403,
                AuthError::InvalidSignature => 403,
            },
            AppErrorKind::Validation(_) => 400,
            AppErrorKind::Infrastructure(err) => match err {
                InfrastructureError::RouteNotFound { .. } => 404,
                InfrastructureError::Internal { .. } => 500,
                InfrastructureError::Configuration { .. } => 500,
            },
        }
    }

    /// Get error code for client handling
    pub fn error_code(&self) -> ErrorCode {
        match &self.kind {
            AppErrorKind::Domain(err) => match err {
                DomainError::PaymentNotFound { .. } => ErrorCode::PaymentNotFound,
                DomainError::InvalidTransition { .. } => ErrorCode::InvalidStateTransition,
                DomainError::DuplicatePayment { .. } => ErrorCode::DuplicatePayment,
                DomainError::AmountExceeded { .. } => ErrorCode::AmountExceeded,
            },
            AppErrorKind::Auth(err) => match err {
                AuthError::MissingApiKey
                | AuthError::MissingSignature
                | AuthError::InvalidPlatformInstance { .. } => ErrorCode::AuthRequired,
                AuthError::InvalidApiKey => ErrorCode::InvalidApiKey,
                AuthError::InvalidSignature => ErrorCode::InvalidSignature,
            },
            AppErrorKind::Validation(ValidationError::MalformedBody { .. }) => {
                ErrorCode::MalformedBody
            }
            AppErrorKind::Validation(_) => ErrorCode::ValidationError,
            AppErrorKind::Infrastructure(InfrastructureError::RouteNotFound { .. }) => {
                ErrorCode::RouteNotFound
            }
            AppErrorKind::Infrastructure(_) => ErrorCode::InternalError,
        }
    }

    /// Get user-friendly error message
    pub fn user_message(&self) -> String {
        match &self.kind {
            AppErrorKind::Domain(err) => match err {
                DomainError::PaymentNotFound { payment_id } => {
                    format!("Payment '{}' not found", payment_id)
                }
                DomainError::InvalidTransition {
                    payment_id,
                    from,
                    operation,
                } => format!(
                    "Cannot {} payment '{}' in status '{}'",
                    operation, payment_id, from
                ),
                DomainError::DuplicatePayment { payment_id } => {
                    format!("Payment '{}' already exists", payment_id)
                }
                DomainError::AmountExceeded {
                    field,
                    requested,
                    limit,
                } => format!(
                    "Requested {} amount {} exceeds the allowed {}",
                    field, requested, limit
                ),
            },
            AppErrorKind::Auth(err) => match err {
                AuthError::MissingApiKey => "Missing API key".to_string(),
                AuthError::InvalidApiKey => "Invalid API key".to_string(),
                AuthError::MissingSignature => "Missing signature".to_string(),
                AuthError::InvalidSignature => "Invalid signature".to_string(),
                AuthError::InvalidPlatformInstance { reason } => {
                    format!("Invalid platform instance: {}", reason)
                }
            },
            AppErrorKind::Validation(err) => match err {
                ValidationError::MissingField { field } => {
                    format!("Required field '{}' is missing", field)
                }
                ValidationError::InvalidAmount { amount, reason } => {
                    format!("Invalid amount '{}': {}", amount, reason)
                }
                ValidationError::InvalidCurrency { currency } => {
                    format!("Invalid currency '{}': expected a 3-letter code", currency)
                }
                ValidationError::InvalidCard { field, reason } => {
                    format!("Invalid card {}: {}", field, reason)
                }
                ValidationError::InvalidUrl { field, reason } => {
                    format!("Invalid URL for '{}': {}", field, reason)
                }
                ValidationError::InvalidStatus { status } => {
                    format!("Unsupported status '{}'", status)
                }
                ValidationError::MalformedBody { reason } => {
                    format!("Malformed request body: {}", reason)
                }
            },
            AppErrorKind::Infrastructure(InfrastructureError::RouteNotFound { path }) => {
                format!("No route for '{}'", path)
            }
            AppErrorKind::Infrastructure(_) => "Internal server error".to_string(),
        }
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            // Internal detail goes to logs through Display, never to the response
            AppErrorKind::Infrastructure(InfrastructureError::Internal { message })
            | AppErrorKind::Infrastructure(InfrastructureError::Configuration { message }) => {
                write!(f, "internal error: {}", message)
            }
            _ => write!(f, "{}", self.user_message()),
        }
    }
}

impl std::error::Error for AppError {}

impl From<crate::config::ConfigError> for AppError {
    fn from(err: crate::config::ConfigError) -> Self {
        AppError::new(AppErrorKind::Infrastructure(
            InfrastructureError::Configuration {
                message: err.to_string(),
            },
        ))
    }
}

/// Result type for operations that can fail with AppError
pub type AppResult<T> = Result<T, AppError>;
