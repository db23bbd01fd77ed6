use crate::models::IdentityKind;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Access tokens authenticate requests; refresh tokens are single-use and
/// mint the next pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenKind {
    Access,
    Refresh,
}

impl TokenKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenKind::Access => "access",
            TokenKind::Refresh => "refresh",
        }
    }
}

/// Claims carried by every signed session token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenClaims {
    /// Subject id: uuid for general users, integer for operator staff.
    pub sub: String,
    /// Which identity store the subject lives in.
    pub kind: IdentityKind,
    /// Owning organization, operator staff only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub operator_id: Option<i64>,
    /// Role, operator staff only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    /// Unique token id, the unit of revocation.
    pub jti: String,
    /// Issued at (unix seconds).
    pub iat: i64,
    /// Expiry (unix seconds).
    pub exp: i64,
    pub token_type: TokenKind,
}

/// Access + refresh token pair handed out on login and refresh.
#[derive(Debug, Clone, Serialize)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    /// Access token lifetime in seconds.
    pub expires_in: i64,
}

/// Blacklist entry for a revoked token id. `expires_at` is copied from the
/// token so the entry can be pruned once the token would have expired anyway.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RevocationEntry {
    pub jti: String,
    pub subject_id: String,
    pub token_type: TokenKind,
    pub expires_at: DateTime<Utc>,
}

impl RevocationEntry {
    pub fn from_claims(claims: &TokenClaims) -> Self {
        Self {
            jti: claims.jti.clone(),
            subject_id: claims.sub.clone(),
            token_type: claims.token_type,
            expires_at: DateTime::from_timestamp(claims.exp, 0).unwrap_or_else(Utc::now),
        }
    }
}
