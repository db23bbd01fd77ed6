//! Signed session tokens: mint, validate, rotate.
//!
//! Tokens are self-contained HS256 JWTs carrying [`TokenClaims`]. Validation
//! verifies the signature, checks expiry against the injected clock, then
//! consults the revocation registry by jti. Refresh tokens are single-use:
//! a refresh revokes the presented token before minting the next pair.

use crate::clock::Clock;
use crate::error::{AuthError, Result};
use crate::models::{Identity, RevocationEntry, TokenClaims, TokenKind, TokenPair};
use crate::store::RevocationStore;
use chrono::Duration;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use std::sync::Arc;
use uuid::Uuid;

pub struct TokenIssuer {
    encoding: EncodingKey,
    decoding: DecodingKey,
    access_ttl: Duration,
    refresh_ttl: Duration,
    clock: Arc<dyn Clock>,
    revocations: Arc<dyn RevocationStore>,
}

impl TokenIssuer {
    pub fn new(
        jwt_secret: &str,
        access_ttl: Duration,
        refresh_ttl: Duration,
        clock: Arc<dyn Clock>,
        revocations: Arc<dyn RevocationStore>,
    ) -> Self {
        Self {
            encoding: EncodingKey::from_secret(jwt_secret.as_bytes()),
            decoding: DecodingKey::from_secret(jwt_secret.as_bytes()),
            access_ttl,
            refresh_ttl,
            clock,
            revocations,
        }
    }

    pub fn access_ttl_secs(&self) -> i64 {
        self.access_ttl.num_seconds()
    }

    pub fn issue_access(&self, identity: &Identity) -> Result<String> {
        self.mint(claim_parts_of(identity), TokenKind::Access)
    }

    pub fn issue_refresh(&self, identity: &Identity) -> Result<String> {
        self.mint(claim_parts_of(identity), TokenKind::Refresh)
    }

    pub fn issue_pair(&self, identity: &Identity) -> Result<TokenPair> {
        Ok(TokenPair {
            access_token: self.issue_access(identity)?,
            refresh_token: self.issue_refresh(identity)?,
            expires_in: self.access_ttl.num_seconds(),
        })
    }

    /// Verify signature, expiry, token type and revocation state.
    pub async fn validate(&self, token: &str, expected: TokenKind) -> Result<TokenClaims> {
        let claims = self.decode_claims(token)?;

        if claims.token_type != expected {
            return Err(AuthError::TokenInvalid);
        }
        if self.revocations.is_revoked(&claims.jti).await? {
            return Err(AuthError::TokenBlacklisted);
        }

        Ok(claims)
    }

    /// Rotate a refresh token: validate it, revoke its jti, mint a fresh
    /// pair bound to the same subject.
    pub async fn refresh(&self, refresh_token: &str) -> Result<TokenPair> {
        let claims = self.validate(refresh_token, TokenKind::Refresh).await?;

        self.revocations
            .revoke(RevocationEntry::from_claims(&claims))
            .await?;

        let parts = ClaimParts {
            sub: claims.sub,
            kind: claims.kind,
            operator_id: claims.operator_id,
            role: claims.role,
        };
        let pair = TokenPair {
            access_token: self.mint(parts.clone(), TokenKind::Access)?,
            refresh_token: self.mint(parts, TokenKind::Refresh)?,
            expires_in: self.access_ttl.num_seconds(),
        };

        tracing::info!("refresh token rotated");
        Ok(pair)
    }

    /// Revoke a token's jti. The entry carries the token's own expiry so the
    /// registry can prune it once the token would have died anyway.
    pub async fn revoke(&self, claims: &TokenClaims) -> Result<()> {
        self.revocations
            .revoke(RevocationEntry::from_claims(claims))
            .await?;
        tracing::info!(jti = %claims.jti, "token revoked");
        Ok(())
    }

    fn mint(&self, parts: ClaimParts, token_type: TokenKind) -> Result<String> {
        let now = self.clock.now();
        let ttl = match token_type {
            TokenKind::Access => self.access_ttl,
            TokenKind::Refresh => self.refresh_ttl,
        };
        let claims = TokenClaims {
            sub: parts.sub,
            kind: parts.kind,
            operator_id: parts.operator_id,
            role: parts.role,
            jti: Uuid::new_v4().to_string(),
            iat: now.timestamp(),
            exp: (now + ttl).timestamp(),
            token_type,
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|_| AuthError::Internal("failed to encode token".to_string()))
    }

    /// Signature check via jsonwebtoken; expiry checked manually against the
    /// injected clock so time-dependent behavior stays deterministic under
    /// test.
    fn decode_claims(&self, token: &str) -> Result<TokenClaims> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;

        let data = decode::<TokenClaims>(token, &self.decoding, &validation)
            .map_err(|_| AuthError::TokenInvalid)?;

        let claims = data.claims;
        if claims.jti.trim().is_empty() {
            return Err(AuthError::TokenInvalid);
        }
        if claims.exp <= self.clock.now().timestamp() {
            return Err(AuthError::TokenInvalid);
        }

        Ok(claims)
    }
}

#[derive(Clone)]
struct ClaimParts {
    sub: String,
    kind: crate::models::IdentityKind,
    operator_id: Option<i64>,
    role: Option<String>,
}

fn claim_parts_of(identity: &Identity) -> ClaimParts {
    ClaimParts {
        sub: identity.subject_id(),
        kind: identity.kind(),
        operator_id: identity.operator_id(),
        role: identity.role().map(str::to_string),
    }
}
