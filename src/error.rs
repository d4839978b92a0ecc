//! Authentication Error Types
//!
//! Centralized error handling for all authentication operations.

use crate::password::PasswordError;
use crate::store::StoreError;
use crate::token::TokenError;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};

/// Why a refresh was refused for an otherwise authentic refresh token
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionRejection {
    Revoked,
    IdentityMismatch,
    StaleToken,
    Expired,
}

impl SessionRejection {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionRejection::Revoked => "session revoked",
            SessionRejection::IdentityMismatch => "identity mismatch",
            SessionRejection::StaleToken => "stale or replayed refresh token",
            SessionRejection::Expired => "session expired",
        }
    }
}

impl std::fmt::Display for SessionRejection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Error categories, for mapping onto a transport status
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Bad input shape; nothing changed
    Validation,
    /// Unknown user or wrong password
    Credential,
    /// Missing, malformed, forged or expired token
    Token,
    /// Refresh refused by the session record
    SessionPolicy,
    /// Unique constraint hit
    Conflict,
    /// Collaborator failure
    Storage,
    /// Unusable configuration or key
    Configuration,
    Internal,
}

/// Authentication errors
#[derive(Debug, Clone, thiserror::Error)]
pub enum AuthError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("User already exists: {0}")]
    DuplicateUser(String),

    #[error("User not found")]
    UserNotFound,

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error(transparent)]
    Token(#[from] TokenError),

    #[error(transparent)]
    Password(#[from] PasswordError),

    #[error("Authorization header is not provided")]
    MissingCredential,

    #[error("Invalid authorization header format")]
    MalformedCredential,

    #[error("Unsupported authorization type {0}")]
    UnsupportedScheme(String),

    #[error("Session not found")]
    SessionNotFound,

    #[error("Unauthorized: {0}")]
    Unauthorized(SessionRejection),

    #[error(transparent)]
    Storage(#[from] StoreError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AuthError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            AuthError::Validation(_) => ErrorKind::Validation,
            AuthError::DuplicateUser(_) => ErrorKind::Conflict,
            AuthError::UserNotFound | AuthError::InvalidCredentials => ErrorKind::Credential,
            AuthError::Token(TokenError::WeakKey { .. } | TokenError::Key(_)) => {
                ErrorKind::Configuration
            }
            AuthError::Token(TokenError::InvalidDuration) => ErrorKind::Internal,
            AuthError::Token(_)
            | AuthError::MissingCredential
            | AuthError::MalformedCredential
            | AuthError::UnsupportedScheme(_) => ErrorKind::Token,
            AuthError::SessionNotFound | AuthError::Unauthorized(_) => ErrorKind::SessionPolicy,
            AuthError::Storage(_) => ErrorKind::Storage,
            AuthError::Config(_) => ErrorKind::Configuration,
            AuthError::Password(PasswordError::Hashing(_)) => ErrorKind::Validation,
            AuthError::Password(PasswordError::Verification(_)) | AuthError::Internal(_) => {
                ErrorKind::Internal
            }
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let (status, error_code, message) = match self.kind() {
            ErrorKind::Validation => (StatusCode::BAD_REQUEST, "validation_error", self.to_string()),
            // Same body for unknown user and wrong password
            ErrorKind::Credential => (
                StatusCode::UNAUTHORIZED,
                "invalid_credentials",
                AuthError::InvalidCredentials.to_string(),
            ),
            ErrorKind::Token | ErrorKind::SessionPolicy => {
                tracing::debug!(error = %self, "Request unauthorized");
                (StatusCode::UNAUTHORIZED, "unauthorized", self.to_string())
            }
            ErrorKind::Conflict => (StatusCode::CONFLICT, "user_exists", self.to_string()),
            ErrorKind::Storage | ErrorKind::Configuration | ErrorKind::Internal => {
                tracing::error!(error = %self, "Authentication internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "An internal error occurred".to_string(),
                )
            }
        };

        (
            status,
            Json(serde_json::json!({
                "error": error_code,
                "message": message
            })),
        )
            .into_response()
    }
}

impl From<validator::ValidationErrors> for AuthError {
    fn from(err: validator::ValidationErrors) -> Self {
        AuthError::Validation(err.to_string())
    }
}

impl From<tokio::task::JoinError> for AuthError {
    fn from(err: tokio::task::JoinError) -> Self {
        tracing::error!("Blocking task failed: {:?}", err);
        AuthError::Internal(err.to_string())
    }
}
