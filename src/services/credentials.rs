//! Lockout bookkeeping over the two identity stores.
//!
//! Password hashing and policy checks live in [`crate::security::password`];
//! this manager owns the failed-attempt counter and the lockout window.

use crate::clock::Clock;
use crate::config::AuthConfig;
use crate::error::{AuthError, Result};
use crate::models::Identity;
use crate::store::{GeneralUserStore, OperatorStore};
use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;

pub struct CredentialManager {
    users: Arc<dyn GeneralUserStore>,
    operators: Arc<dyn OperatorStore>,
    clock: Arc<dyn Clock>,
    max_failed_logins: i32,
    lockout: Duration,
}

impl CredentialManager {
    pub fn new(
        users: Arc<dyn GeneralUserStore>,
        operators: Arc<dyn OperatorStore>,
        clock: Arc<dyn Clock>,
        config: &AuthConfig,
    ) -> Self {
        Self {
            users,
            operators,
            clock,
            max_failed_logins: config.max_failed_logins,
            lockout: Duration::seconds(config.lockout_secs),
        }
    }

    /// Reject with `AccountLocked` while a lockout window is open. A lapsed
    /// lockout timestamp no longer blocks; the counter resets on the next
    /// successful verification.
    pub fn ensure_not_locked(&self, identity: &Identity) -> Result<()> {
        if let Some(until) = identity.locked_until() {
            if self.clock.now() < until {
                return Err(AuthError::AccountLocked { until });
            }
        }
        Ok(())
    }

    /// Count one failed password attempt; reaching the threshold opens a
    /// lockout window and returns its end, so the caller can report
    /// `AccountLocked` on the attempt that tripped it. The increment is
    /// atomic in the store, so concurrent failures cannot lose counts.
    pub async fn record_failure(&self, identity: &Identity) -> Result<Option<DateTime<Utc>>> {
        let attempts = match identity {
            Identity::General(user) => self.users.increment_login_attempts(user.id).await?,
            Identity::Operator(staff) => self.operators.increment_login_attempts(staff.id).await?,
        };

        if attempts < self.max_failed_logins {
            return Ok(None);
        }

        let until = self.clock.now() + self.lockout;
        match identity {
            Identity::General(user) => self.users.set_lockout(user.id, until).await?,
            Identity::Operator(staff) => self.operators.set_lockout(staff.id, until).await?,
        }
        tracing::warn!(
            subject = %identity.subject_id(),
            attempts,
            %until,
            "account locked after repeated failures"
        );
        Ok(Some(until))
    }

    /// Reset the counter and clear any lockout after a successful
    /// verification.
    pub async fn record_success(&self, identity: &Identity) -> Result<()> {
        match identity {
            Identity::General(user) => self.users.clear_lockout(user.id).await,
            Identity::Operator(staff) => self.operators.clear_lockout(staff.id).await,
        }
    }

    /// Replace the stored password hash.
    pub async fn update_password_hash(&self, identity: &Identity, hash: &str) -> Result<()> {
        match identity {
            Identity::General(user) => self.users.update_password_hash(user.id, hash).await,
            Identity::Operator(staff) => self.operators.update_password_hash(staff.id, hash).await,
        }
    }

    /// Clear lockout state outright (used by the OTP-verified reset path,
    /// which deliberately bypasses lockout).
    pub async fn clear_lockout(&self, identity: &Identity) -> Result<()> {
        self.record_success(identity).await
    }
}
