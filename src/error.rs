use chrono::{DateTime, Utc};
use std::time::Duration;
use thiserror::Error;

/// Error kinds returned by the authentication core.
///
/// Every variant except `Internal` is a recoverable, expected outcome that
/// callers map to their own status signals. `Internal` is reserved for
/// storage-layer unavailability.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("validation error: {0}")]
    Validation(String),

    #[error("rate limited, retry after {retry_after:?}")]
    RateLimited { retry_after: Duration },

    #[error("no matching code")]
    NotFound,

    #[error("code expired")]
    Expired,

    #[error("code already used")]
    AlreadyUsed,

    #[error("attempt limit reached")]
    Exhausted,

    #[error("code was issued for a different purpose")]
    PurposeMismatch,

    #[error("invalid code")]
    InvalidCode,

    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("account locked until {until}")]
    AccountLocked { until: DateTime<Utc> },

    #[error("invalid token")]
    TokenInvalid,

    #[error("token has been revoked")]
    TokenBlacklisted,

    #[error("delivery failure: {0}")]
    DeliveryFailure(String),

    #[error("contact maps to more than one identity")]
    IdentityConflict,

    #[error("internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, AuthError>;

impl From<sqlx::Error> for AuthError {
    fn from(err: sqlx::Error) -> Self {
        AuthError::Internal(format!("database error: {err}"))
    }
}

impl From<redis::RedisError> for AuthError {
    fn from(err: redis::RedisError) -> Self {
        AuthError::Internal(format!("redis error: {err}"))
    }
}

impl From<jsonwebtoken::errors::Error> for AuthError {
    fn from(_err: jsonwebtoken::errors::Error) -> Self {
        AuthError::TokenInvalid
    }
}
