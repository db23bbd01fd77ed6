//! Store contracts the core is written against.
//!
//! Every shared mutable resource (counters, OTP records, revocation entries,
//! the two identity stores) sits behind one of these traits. Methods that the
//! flows rely on for correctness under concurrency are atomic read-modify-
//! write operations: `incr_window`, `record_failure`, `mark_used` (CAS) and
//! `increment_login_attempts`. Implementations must not require the caller
//! to hold anything across round trips.

pub mod memory;
pub mod postgres;
pub mod redis;

use crate::error::Result;
use crate::models::{Channel, GeneralUser, OperatorStaff, OtpKey, OtpPurpose, OtpRecord, RevocationEntry};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::time::Duration;
use uuid::Uuid;

/// Windowed counters keyed by an opaque string.
#[async_trait]
pub trait CounterStore: Send + Sync {
    /// Atomically increment the counter for `key`, starting a fresh fixed
    /// window if none is active or the current one has elapsed. Returns the
    /// post-increment count and the time remaining until the window resets.
    async fn incr_window(&self, key: &str, window: Duration) -> Result<(u32, Duration)>;
}

/// One-time code records. The store keeps the newest record per key as the
/// authoritative one and marks prior records superseded.
#[async_trait]
pub trait OtpStore: Send + Sync {
    /// Activate `record` as the live record for its key, marking any prior
    /// record for the same key superseded first.
    async fn put_live(&self, record: OtpRecord) -> Result<()>;

    /// The newest (non-superseded) record for the key, regardless of its
    /// used/expired state. Superseded records are never returned here.
    async fn get_current(&self, key: &OtpKey) -> Result<Option<OtpRecord>>;

    /// Whether a superseded record for this key carried exactly this code.
    async fn superseded_code_exists(&self, key: &OtpKey, code: &str) -> Result<bool>;

    /// Purpose of a live record for (contact, channel) carrying this exact
    /// code value, excluding `except`. Used to tell a cross-purpose
    /// submission apart from a plain miss.
    async fn live_purpose_for_code(
        &self,
        contact: &str,
        channel: Channel,
        code: &str,
        except: OtpPurpose,
        now: DateTime<Utc>,
    ) -> Result<Option<OtpPurpose>>;

    /// Atomically increment the attempt counter of the current record.
    /// Returns the post-increment count, or 0 if no current record exists.
    async fn record_failure(&self, key: &OtpKey) -> Result<u32>;

    /// Compare-and-swap on the used flag of the current record. Returns
    /// true iff this call flipped it; a second concurrent redeemer gets
    /// false.
    async fn mark_used(&self, key: &OtpKey) -> Result<bool>;

    /// Housekeeping: drop records expired longer than `grace` ago. Not
    /// required for correctness, expiry is evaluated lazily at redemption.
    async fn purge_expired(&self, now: DateTime<Utc>, grace: Duration) -> Result<u64>;
}

/// Append-only blacklist of revoked token ids.
#[async_trait]
pub trait RevocationStore: Send + Sync {
    /// Idempotent insert.
    async fn revoke(&self, entry: RevocationEntry) -> Result<()>;

    async fn is_revoked(&self, jti: &str) -> Result<bool>;

    /// Drop entries whose token would have expired anyway. Returns the
    /// number removed.
    async fn prune_expired(&self, now: DateTime<Utc>) -> Result<u64>;
}

/// Persistence for general end-user accounts.
#[async_trait]
pub trait GeneralUserStore: Send + Sync {
    async fn find_by_contact(&self, contact: &str, channel: Channel)
        -> Result<Option<GeneralUser>>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<GeneralUser>>;

    /// Insert a pending (inactive, unverified) account. A contact collision
    /// is `IdentityConflict`.
    async fn create_pending(
        &self,
        contact: &str,
        channel: Channel,
        password_hash: &str,
        display_name: Option<&str>,
    ) -> Result<GeneralUser>;

    /// Mark the channel verified and activate the account.
    async fn update_verification_flags(&self, id: Uuid, channel: Channel) -> Result<()>;

    async fn update_password_hash(&self, id: Uuid, password_hash: &str) -> Result<()>;

    /// Atomic increment; returns the post-increment count.
    async fn increment_login_attempts(&self, id: Uuid) -> Result<i32>;

    async fn set_lockout(&self, id: Uuid, until: DateTime<Utc>) -> Result<()>;

    /// Clear the lockout timestamp and reset the attempt counter.
    async fn clear_lockout(&self, id: Uuid) -> Result<()>;
}

/// Persistence for organization-scoped operator staff accounts.
#[async_trait]
pub trait OperatorStore: Send + Sync {
    async fn find_by_contact(&self, contact: &str, channel: Channel)
        -> Result<Option<OperatorStaff>>;

    async fn find_by_id(&self, id: i64) -> Result<Option<OperatorStaff>>;

    async fn update_verification_flags(&self, id: i64, channel: Channel) -> Result<()>;

    async fn update_password_hash(&self, id: i64, password_hash: &str) -> Result<()>;

    async fn increment_login_attempts(&self, id: i64) -> Result<i32>;

    async fn set_lockout(&self, id: i64, until: DateTime<Utc>) -> Result<()>;

    async fn clear_lockout(&self, id: i64) -> Result<()>;
}
