//! One-time code ledger: issuance, supersession and atomic redemption.

use crate::clock::Clock;
use crate::config::AuthConfig;
use crate::contact::mask_contact;
use crate::error::Result;
use crate::models::{Channel, OtpKey, OtpPurpose, OtpRecord, RedeemOutcome};
use crate::security::constant_time_eq;
use crate::store::OtpStore;
use chrono::Duration;
use rand::Rng;
use std::sync::Arc;

pub struct OtpLedger {
    store: Arc<dyn OtpStore>,
    clock: Arc<dyn Clock>,
    ttl: Duration,
    code_length: usize,
    max_attempts: u32,
}

impl OtpLedger {
    pub fn new(store: Arc<dyn OtpStore>, clock: Arc<dyn Clock>, config: &AuthConfig) -> Self {
        Self {
            store,
            clock,
            ttl: Duration::seconds(config.otp_ttl_secs),
            code_length: config.otp_length,
            max_attempts: config.otp_max_attempts,
        }
    }

    /// Generate and activate a fresh code for the key, superseding any prior
    /// live record. Returns the code for handoff to the delivery
    /// collaborator; the ledger itself never sends anything.
    pub async fn issue(
        &self,
        contact: &str,
        channel: Channel,
        purpose: OtpPurpose,
    ) -> Result<String> {
        let code = self.generate_code();
        let now = self.clock.now();
        let record = OtpRecord {
            contact: contact.to_string(),
            channel,
            purpose,
            code: code.clone(),
            created_at: now,
            expires_at: now + self.ttl,
            attempts: 0,
            is_used: false,
            is_superseded: false,
        };
        self.store.put_live(record).await?;

        tracing::info!(
            contact = %mask_contact(contact),
            %channel,
            %purpose,
            "otp issued"
        );
        Ok(code)
    }

    /// Redeem a submitted code against the live record for the key.
    ///
    /// State checks run in a fixed order (missing, expired, used, exhausted,
    /// code compare), so a correct code submitted after the attempt budget
    /// is spent still reports `Exhausted`. The used-flag flip is a
    /// compare-and-swap in the store: of two concurrent correct submissions
    /// exactly one sees `Verified`, the other `AlreadyUsed`.
    pub async fn redeem(
        &self,
        contact: &str,
        channel: Channel,
        code: &str,
        purpose: OtpPurpose,
    ) -> Result<RedeemOutcome> {
        let key = OtpKey::new(contact, channel, purpose);
        let now = self.clock.now();

        let Some(record) = self.store.get_current(&key).await? else {
            // No record under this purpose. A live record under another
            // purpose carrying this exact code is a cross-purpose
            // submission; anything else is a plain miss.
            if self
                .store
                .live_purpose_for_code(contact, channel, code, purpose, now)
                .await?
                .is_some()
            {
                return Ok(RedeemOutcome::PurposeMismatch);
            }
            return Ok(RedeemOutcome::NotFound);
        };

        if now > record.expires_at {
            return Ok(RedeemOutcome::Expired);
        }
        if record.is_used {
            return Ok(RedeemOutcome::AlreadyUsed);
        }
        if record.attempts >= self.max_attempts {
            return Ok(RedeemOutcome::Exhausted);
        }

        if !constant_time_eq(code.as_bytes(), record.code.as_bytes()) {
            // A code from a superseded record no longer exists as far as
            // redemption is concerned; it neither burns an attempt nor
            // counts as a wrong guess.
            if self.store.superseded_code_exists(&key, code).await? {
                return Ok(RedeemOutcome::NotFound);
            }
            let attempts = self.store.record_failure(&key).await?;
            tracing::warn!(
                contact = %mask_contact(contact),
                %purpose,
                attempts,
                "invalid otp submitted"
            );
            // The submission that spends the last attempt already reports
            // the budget as gone.
            if attempts >= self.max_attempts {
                return Ok(RedeemOutcome::Exhausted);
            }
            return Ok(RedeemOutcome::InvalidCode);
        }

        if self.store.mark_used(&key).await? {
            tracing::info!(
                contact = %mask_contact(contact),
                %purpose,
                "otp verified"
            );
            Ok(RedeemOutcome::Verified)
        } else {
            Ok(RedeemOutcome::AlreadyUsed)
        }
    }

    /// Housekeeping hook: drop records expired longer than `grace` ago.
    pub async fn purge_expired(&self, grace: std::time::Duration) -> Result<u64> {
        self.store.purge_expired(self.clock.now(), grace).await
    }

    fn generate_code(&self) -> String {
        let mut rng = rand::thread_rng();
        (0..self.code_length)
            .map(|_| char::from(b'0' + rng.gen_range(0..10)))
            .collect()
    }
}
