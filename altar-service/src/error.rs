use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display};
use thiserror::Error;

use crate::collaboration::InviteStatus;
use crate::i18n::I18n;

/// Main service error type
#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("{0}")]
    Ai(#[from] AiError),

    #[error("{0}")]
    Collaboration(#[from] CollaborationError),

    #[error("Unknown AI provider: {provider}")]
    UnknownProvider { provider: String },

    #[error("Invalid request: {message}")]
    InvalidRequest { message: String },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Internal error: {message}")]
    Internal { message: String },
}

/// Semantic class of a failed generative-AI request.
///
/// Only `RateLimited` and `Transient` are eligible for retry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, AsRefStr)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum FailureKind {
    NotInitialized,
    InvalidRequest,
    RateLimited,
    QuotaExceeded,
    Unauthorized,
    ContentBlocked,
    Transient,
}

impl FailureKind {
    pub fn is_retryable(self) -> bool {
        matches!(self, FailureKind::RateLimited | FailureKind::Transient)
    }

    /// Fluent key for the user-facing message of this failure
    pub fn message_key(self) -> &'static str {
        match self {
            FailureKind::NotInitialized => "error-ai-not-initialized",
            FailureKind::InvalidRequest => "error-ai-invalid-request",
            FailureKind::RateLimited => "error-ai-rate-limited",
            FailureKind::QuotaExceeded => "error-ai-quota-exceeded",
            FailureKind::Unauthorized => "error-ai-unauthorized",
            FailureKind::ContentBlocked => "error-ai-content-blocked",
            FailureKind::Transient => "error-ai-transient",
        }
    }
}

/// Final classified failure of an AI request, after retries were exhausted
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{provider} request failed ({kind}): {message}")]
pub struct AiError {
    pub provider: String,
    pub kind: FailureKind,
    pub message: String,
}

/// Collaboration session misuse errors
///
/// Transport problems never show up here; they drive reconnection instead.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CollaborationError {
    #[error("Invite {invite_id} expired at {expires_at}")]
    InviteExpired {
        invite_id: String,
        expires_at: DateTime<Utc>,
    },

    #[error("Invite {invite_id} is {status}, not pending")]
    InviteNotPending {
        invite_id: String,
        status: InviteStatus,
    },

    #[error("Comment thread not found: {thread_id}")]
    ThreadNotFound { thread_id: String },

    #[error("Comment not found: {comment_id}")]
    CommentNotFound { comment_id: String },

    #[error("Version not found: {version_id}")]
    VersionNotFound { version_id: String },

    #[error("Notification not found: {notification_id}")]
    NotificationNotFound { notification_id: String },
}

/// API error response
#[derive(Serialize)]
pub struct ErrorResponse {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ServiceError {
    fn status_code(&self) -> StatusCode {
        match self {
            ServiceError::Ai(e) => match e.kind {
                FailureKind::NotInitialized => StatusCode::SERVICE_UNAVAILABLE,
                FailureKind::InvalidRequest => StatusCode::BAD_REQUEST,
                FailureKind::RateLimited => StatusCode::TOO_MANY_REQUESTS,
                FailureKind::QuotaExceeded => StatusCode::PAYMENT_REQUIRED,
                FailureKind::ContentBlocked => StatusCode::UNPROCESSABLE_ENTITY,
                FailureKind::Unauthorized | FailureKind::Transient => StatusCode::BAD_GATEWAY,
            },
            ServiceError::Collaboration(
                CollaborationError::ThreadNotFound { .. }
                | CollaborationError::CommentNotFound { .. }
                | CollaborationError::VersionNotFound { .. }
                | CollaborationError::NotificationNotFound { .. },
            ) => StatusCode::NOT_FOUND,
            ServiceError::Collaboration(CollaborationError::InviteExpired { .. }) => {
                StatusCode::GONE
            }
            ServiceError::Collaboration(CollaborationError::InviteNotPending { .. }) => {
                StatusCode::CONFLICT
            }
            ServiceError::UnknownProvider { .. } => StatusCode::NOT_FOUND,
            ServiceError::InvalidRequest { .. } => StatusCode::BAD_REQUEST,
            ServiceError::Config { .. } | ServiceError::Internal { .. } => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn error_code(&self) -> String {
        match self {
            ServiceError::Ai(e) => format!("ai_{}", e.kind),
            ServiceError::Collaboration(CollaborationError::InviteExpired { .. }) => {
                "invite_expired".to_string()
            }
            ServiceError::Collaboration(CollaborationError::InviteNotPending { .. }) => {
                "invite_not_pending".to_string()
            }
            ServiceError::Collaboration(CollaborationError::ThreadNotFound { .. }) => {
                "thread_not_found".to_string()
            }
            ServiceError::Collaboration(CollaborationError::CommentNotFound { .. }) => {
                "comment_not_found".to_string()
            }
            ServiceError::Collaboration(CollaborationError::VersionNotFound { .. }) => {
                "version_not_found".to_string()
            }
            ServiceError::Collaboration(CollaborationError::NotificationNotFound { .. }) => {
                "notification_not_found".to_string()
            }
            ServiceError::UnknownProvider { .. } => "unknown_provider".to_string(),
            ServiceError::InvalidRequest { .. } => "invalid_request".to_string(),
            ServiceError::Config { .. } => "config_error".to_string(),
            ServiceError::Internal { .. } => "internal_error".to_string(),
        }
    }

    /// Structured context for clients; AI failures carry provider and kind
    fn details(&self) -> Option<serde_json::Value> {
        match self {
            ServiceError::Ai(e) => Some(serde_json::json!({
                "provider": e.provider,
                "kind": e.kind,
            })),
            _ => None,
        }
    }

    /// Get a user-friendly translated message
    pub fn user_message(&self, i18n: &I18n, locale: &str) -> String {
        match self {
            ServiceError::Ai(e) => match e.kind {
                FailureKind::NotInitialized | FailureKind::Unauthorized => {
                    i18n.format(locale, e.kind.message_key(), &[("provider", &e.provider)])
                }
                FailureKind::Transient => {
                    i18n.format(locale, e.kind.message_key(), &[("message", &e.message)])
                }
                _ => i18n.get(locale, e.kind.message_key(), None),
            },
            ServiceError::UnknownProvider { provider } => {
                i18n.format(locale, "error-unknown-provider", &[("provider", provider)])
            }
            ServiceError::Collaboration(CollaborationError::InviteExpired { .. }) => {
                i18n.get(locale, "error-invite-expired", None)
            }
            ServiceError::Internal { .. } => i18n.get(locale, "error-internal", None),
            // For other errors, fall back to the technical message
            _ => self.to_string(),
        }
    }

    /// Convert to an error response with i18n support
    pub fn into_response_with_i18n(self, i18n: &I18n, locale: &str) -> Response {
        let status = self.status_code();
        let code = self.error_code();
        let message = self.user_message(i18n, locale);

        let response = ErrorResponse {
            message,
            code: Some(code),
            details: self.details(),
        };

        (status, Json(response)).into_response()
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let code = self.error_code();

        let response = ErrorResponse {
            message: self.to_string(),
            code: Some(code),
            details: self.details(),
        };

        (status, Json(response)).into_response()
    }
}

/// Result type alias for service operations
pub type ServiceResult<T> = Result<T, ServiceError>;

/// Error wrapper with i18n support for API responses
pub struct I18nError {
    pub error: ServiceError,
    pub i18n: std::sync::Arc<I18n>,
    pub locale: String,
}

impl I18nError {
    pub fn new(error: ServiceError, i18n: std::sync::Arc<I18n>, locale: impl Into<String>) -> Self {
        Self {
            error,
            i18n,
            locale: locale.into(),
        }
    }
}

impl IntoResponse for I18nError {
    fn into_response(self) -> Response {
        self.error.into_response_with_i18n(&self.i18n, &self.locale)
    }
}
