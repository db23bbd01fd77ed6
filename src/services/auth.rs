//! The orchestrator: composes the normalizer, rate limiter, OTP ledger,
//! credential manager, identity resolver and token issuer into the login
//! surface flows.

use crate::clock::Clock;
use crate::config::AuthConfig;
use crate::contact::{mask_contact, normalize_contact};
use crate::error::{AuthError, Result};
use crate::models::{Channel, Identity, OtpPurpose, Profile, TokenKind, TokenPair};
use crate::security::password::{hash_password, validate_policy, verify_password};
use crate::security::TokenIssuer;
use crate::services::credentials::CredentialManager;
use crate::services::delivery::NotificationDelivery;
use crate::services::identity::IdentityResolver;
use crate::services::otp_ledger::OtpLedger;
use crate::services::rate_limiter::{RateAction, RateLimiter};
use crate::store::{
    CounterStore, GeneralUserStore, OperatorStore, OtpStore, RevocationStore,
};
use chrono::Duration;
use std::sync::Arc;

/// The injected persistence surface. Production wiring hands in the Redis
/// and Postgres implementations; tests hand in the in-memory ones.
#[derive(Clone)]
pub struct StoreBundle {
    pub counters: Arc<dyn CounterStore>,
    pub otps: Arc<dyn OtpStore>,
    pub revocations: Arc<dyn RevocationStore>,
    pub users: Arc<dyn GeneralUserStore>,
    pub operators: Arc<dyn OperatorStore>,
}

pub struct AuthService {
    clock: Arc<dyn Clock>,
    rate_limiter: RateLimiter,
    ledger: OtpLedger,
    credentials: CredentialManager,
    resolver: IdentityResolver,
    issuer: TokenIssuer,
    revocations: Arc<dyn RevocationStore>,
    delivery: Arc<dyn NotificationDelivery>,
    otp_ttl_secs: i64,
}

impl AuthService {
    pub fn new(
        config: &AuthConfig,
        stores: StoreBundle,
        delivery: Arc<dyn NotificationDelivery>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let issuer = TokenIssuer::new(
            &config.jwt_secret,
            Duration::seconds(config.access_token_ttl_secs),
            Duration::seconds(config.refresh_token_ttl_secs),
            Arc::clone(&clock),
            Arc::clone(&stores.revocations),
        );
        Self {
            rate_limiter: RateLimiter::new(Arc::clone(&stores.counters), config),
            ledger: OtpLedger::new(Arc::clone(&stores.otps), Arc::clone(&clock), config),
            credentials: CredentialManager::new(
                Arc::clone(&stores.users),
                Arc::clone(&stores.operators),
                Arc::clone(&clock),
                config,
            ),
            resolver: IdentityResolver::new(
                Arc::clone(&stores.users),
                Arc::clone(&stores.operators),
            ),
            issuer,
            revocations: stores.revocations,
            delivery,
            clock,
            otp_ttl_secs: config.otp_ttl_secs,
        }
    }

    /// Issue and deliver a one-time code.
    ///
    /// A delivery failure is reported but the issued record and the consumed
    /// rate-limit budget stand: a resend goes through a fresh issuance, so
    /// induced delivery failures cannot bypass the limiter.
    pub async fn request_otp(
        &self,
        contact: &str,
        channel: Channel,
        purpose: OtpPurpose,
    ) -> Result<()> {
        let contact = normalize_contact(contact, channel)?;
        self.rate_limiter
            .check_and_consume(&contact, RateAction::OtpRequest)
            .await?;

        let code = self.ledger.issue(&contact, channel, purpose).await?;
        let message = self.otp_message(&code);
        self.delivery.send(&contact, channel, &message).await
    }

    /// Redeem a one-time code. Registration purposes additionally promote
    /// the matching identity: the redeemed channel is marked verified and
    /// the account activated.
    pub async fn verify_otp(
        &self,
        contact: &str,
        channel: Channel,
        code: &str,
        purpose: OtpPurpose,
    ) -> Result<()> {
        let contact = normalize_contact(contact, channel)?;
        self.ledger
            .redeem(&contact, channel, code, purpose)
            .await?
            .into_result()?;

        match purpose {
            OtpPurpose::Registration | OtpPurpose::OperatorRegistration => {
                let identity = self
                    .resolver
                    .find_by_contact(&contact, channel)
                    .await?
                    .ok_or(AuthError::NotFound)?;
                self.resolver
                    .mark_channel_verified(&identity, channel)
                    .await?;
                tracing::info!(
                    contact = %mask_contact(&contact),
                    subject = %identity.subject_id(),
                    "account verified and activated"
                );
            }
            OtpPurpose::Login | OtpPurpose::PasswordUpdate => {}
        }
        Ok(())
    }

    /// Create a pending account and send the registration code for it.
    pub async fn register(
        &self,
        contact: &str,
        channel: Channel,
        password: &str,
        display_name: Option<&str>,
    ) -> Result<()> {
        let contact = normalize_contact(contact, channel)?;
        self.rate_limiter
            .check_and_consume(&contact, RateAction::Registration)
            .await?;
        validate_policy(password)?;

        if self
            .resolver
            .find_by_contact(&contact, channel)
            .await?
            .is_some()
        {
            return Err(AuthError::IdentityConflict);
        }

        let password_hash = hash_password(password)?;
        let identity = self
            .resolver
            .create_pending_general_user(&contact, channel, &password_hash, display_name)
            .await?;
        tracing::info!(
            contact = %mask_contact(&contact),
            subject = %identity.subject_id(),
            "pending registration created"
        );

        self.request_otp(&contact, channel, OtpPurpose::Registration)
            .await
    }

    pub async fn login_with_password(
        &self,
        contact: &str,
        channel: Channel,
        password: &str,
    ) -> Result<TokenPair> {
        let contact = normalize_contact(contact, channel)?;
        self.rate_limiter
            .check_and_consume(&contact, RateAction::Login)
            .await?;

        let identity = self
            .resolver
            .find_by_contact(&contact, channel)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;
        ensure_active(&identity)?;
        self.credentials.ensure_not_locked(&identity)?;

        match verify_password(password, identity.password_hash()) {
            Ok(()) => {
                self.credentials.record_success(&identity).await?;
            }
            Err(AuthError::InvalidCredentials) => {
                return Err(match self.credentials.record_failure(&identity).await? {
                    Some(until) => AuthError::AccountLocked { until },
                    None => AuthError::InvalidCredentials,
                });
            }
            Err(other) => return Err(other),
        }

        let pair = self.issuer.issue_pair(&identity)?;
        tracing::info!(
            subject = %identity.subject_id(),
            contact = %mask_contact(&contact),
            "password login succeeded"
        );
        Ok(pair)
    }

    /// Possession of the contact channel is the credential here, so lockout
    /// counters are untouched by this path.
    pub async fn login_with_otp(
        &self,
        contact: &str,
        channel: Channel,
        code: &str,
    ) -> Result<TokenPair> {
        let contact = normalize_contact(contact, channel)?;
        self.rate_limiter
            .check_and_consume(&contact, RateAction::Login)
            .await?;

        self.ledger
            .redeem(&contact, channel, code, OtpPurpose::Login)
            .await?
            .into_result()?;

        let identity = self
            .resolver
            .find_by_contact(&contact, channel)
            .await?
            .ok_or(AuthError::NotFound)?;
        ensure_active(&identity)?;

        let pair = self.issuer.issue_pair(&identity)?;
        tracing::info!(
            subject = %identity.subject_id(),
            contact = %mask_contact(&contact),
            "otp login succeeded"
        );
        Ok(pair)
    }

    /// Rotate a refresh token: the presented token is revoked and a fresh
    /// pair minted for the same subject, provided it still resolves to an
    /// active account.
    pub async fn refresh_token(&self, refresh_token: &str) -> Result<TokenPair> {
        let claims = self.issuer.validate(refresh_token, TokenKind::Refresh).await?;
        let identity = self
            .resolver
            .find_by_subject(&claims.sub)
            .await?
            .ok_or(AuthError::TokenInvalid)?;
        if !identity.is_active() {
            return Err(AuthError::TokenInvalid);
        }
        self.issuer.refresh(refresh_token).await
    }

    /// Revoke the session's token ids. The access token must be valid; the
    /// refresh token is revoked too when presented and still valid.
    pub async fn logout(&self, access_token: &str, refresh_token: Option<&str>) -> Result<()> {
        let claims = self.issuer.validate(access_token, TokenKind::Access).await?;
        self.issuer.revoke(&claims).await?;

        if let Some(refresh_token) = refresh_token {
            if let Ok(refresh_claims) =
                self.issuer.validate(refresh_token, TokenKind::Refresh).await
            {
                self.issuer.revoke(&refresh_claims).await?;
            }
        }

        tracing::info!(subject = %claims.sub, "logged out");
        Ok(())
    }

    pub async fn change_password(
        &self,
        access_token: &str,
        current_password: &str,
        new_password: &str,
    ) -> Result<()> {
        let claims = self.issuer.validate(access_token, TokenKind::Access).await?;
        let identity = self
            .resolver
            .find_by_subject(&claims.sub)
            .await?
            .ok_or(AuthError::TokenInvalid)?;
        self.credentials.ensure_not_locked(&identity)?;

        match verify_password(current_password, identity.password_hash()) {
            Ok(()) => {}
            Err(AuthError::InvalidCredentials) => {
                return Err(match self.credentials.record_failure(&identity).await? {
                    Some(until) => AuthError::AccountLocked { until },
                    None => AuthError::InvalidCredentials,
                });
            }
            Err(other) => return Err(other),
        }

        validate_policy(new_password)?;
        let hash = hash_password(new_password)?;
        self.credentials.update_password_hash(&identity, &hash).await?;
        self.credentials.record_success(&identity).await?;

        tracing::info!(subject = %identity.subject_id(), "password changed");
        Ok(())
    }

    pub async fn request_password_reset(&self, contact: &str, channel: Channel) -> Result<()> {
        self.request_otp(contact, channel, OtpPurpose::PasswordUpdate)
            .await
    }

    /// OTP-verified password reset. Deliberately bypasses lockout: proving
    /// channel possession is the recovery path out of a locked account, and
    /// a successful reset clears the lockout state.
    pub async fn reset_password(
        &self,
        contact: &str,
        channel: Channel,
        code: &str,
        new_password: &str,
    ) -> Result<()> {
        let contact = normalize_contact(contact, channel)?;
        self.ledger
            .redeem(&contact, channel, code, OtpPurpose::PasswordUpdate)
            .await?
            .into_result()?;

        let identity = self
            .resolver
            .find_by_contact(&contact, channel)
            .await?
            .ok_or(AuthError::NotFound)?;

        validate_policy(new_password)?;
        let hash = hash_password(new_password)?;
        self.credentials.update_password_hash(&identity, &hash).await?;
        self.credentials.clear_lockout(&identity).await?;

        tracing::info!(subject = %identity.subject_id(), "password reset via otp");
        Ok(())
    }

    pub async fn get_profile(&self, access_token: &str) -> Result<Profile> {
        let claims = self.issuer.validate(access_token, TokenKind::Access).await?;
        let identity = self
            .resolver
            .find_by_subject(&claims.sub)
            .await?
            .ok_or(AuthError::NotFound)?;
        Ok(Profile::from(&identity))
    }

    /// Housekeeping: drop revocation entries whose tokens have expired.
    pub async fn prune_revoked_tokens(&self) -> Result<u64> {
        self.revocations.prune_expired(self.clock.now()).await
    }

    /// Housekeeping: drop OTP records expired longer than `grace` ago.
    pub async fn purge_expired_otps(&self, grace: std::time::Duration) -> Result<u64> {
        self.ledger.purge_expired(grace).await
    }

    fn otp_message(&self, code: &str) -> String {
        format!(
            "Your verification code is {code}. It expires in {} minutes.",
            self.otp_ttl_secs / 60
        )
    }
}

fn ensure_active(identity: &Identity) -> Result<()> {
    if identity.is_active() {
        Ok(())
    } else {
        Err(AuthError::Validation(
            "account is not active; verify your contact first".to_string(),
        ))
    }
}
