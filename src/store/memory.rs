//! In-memory store implementations.
//!
//! Each store keeps its state behind a single `tokio::sync::RwLock`, so every
//! read-modify-write the traits require to be atomic happens under one write
//! guard. Paired with [`crate::clock::ManualClock`] these back the test
//! suite; they are also usable as single-process defaults.

use crate::clock::Clock;
use crate::error::{AuthError, Result};
use crate::models::{
    Channel, GeneralUser, OperatorStaff, OtpKey, OtpPurpose, OtpRecord, RevocationEntry,
};
use crate::store::{
    CounterStore, GeneralUserStore, OperatorStore, OtpStore, RevocationStore,
};
use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use uuid::Uuid;

pub struct MemoryCounterStore {
    clock: Arc<dyn Clock>,
    windows: RwLock<HashMap<String, (DateTime<Utc>, u32)>>,
}

impl MemoryCounterStore {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            windows: RwLock::new(HashMap::new()),
        }
    }
}

#[async_trait]
impl CounterStore for MemoryCounterStore {
    async fn incr_window(&self, key: &str, window: Duration) -> Result<(u32, Duration)> {
        let window_chrono = ChronoDuration::from_std(window)
            .map_err(|_| AuthError::Internal("window duration out of range".to_string()))?;
        let now = self.clock.now();

        let mut windows = self.windows.write().await;
        match windows.get_mut(key) {
            Some((start, count)) if now < *start + window_chrono => {
                *count += 1;
                let remaining = (*start + window_chrono - now)
                    .to_std()
                    .unwrap_or_default();
                Ok((*count, remaining))
            }
            _ => {
                windows.insert(key.to_string(), (now, 1));
                Ok((1, window))
            }
        }
    }
}

/// Records per key, newest last. `put_live` marks everything before the
/// newest as superseded, so the current record is always the final element.
#[derive(Default)]
pub struct MemoryOtpStore {
    records: RwLock<HashMap<OtpKey, Vec<OtpRecord>>>,
}

impl MemoryOtpStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl OtpStore for MemoryOtpStore {
    async fn put_live(&self, record: OtpRecord) -> Result<()> {
        let mut records = self.records.write().await;
        let history = records.entry(record.key()).or_default();
        for prior in history.iter_mut() {
            prior.is_superseded = true;
        }
        history.push(record);
        Ok(())
    }

    async fn get_current(&self, key: &OtpKey) -> Result<Option<OtpRecord>> {
        let records = self.records.read().await;
        Ok(records
            .get(key)
            .and_then(|history| history.last())
            .filter(|record| !record.is_superseded)
            .cloned())
    }

    async fn superseded_code_exists(&self, key: &OtpKey, code: &str) -> Result<bool> {
        let records = self.records.read().await;
        Ok(records
            .get(key)
            .map(|history| {
                history
                    .iter()
                    .any(|record| record.is_superseded && record.code == code)
            })
            .unwrap_or(false))
    }

    async fn live_purpose_for_code(
        &self,
        contact: &str,
        channel: Channel,
        code: &str,
        except: OtpPurpose,
        now: DateTime<Utc>,
    ) -> Result<Option<OtpPurpose>> {
        let records = self.records.read().await;
        for purpose in OtpPurpose::ALL {
            if purpose == except {
                continue;
            }
            let key = OtpKey::new(contact, channel, purpose);
            if let Some(record) = records.get(&key).and_then(|history| history.last()) {
                if record.is_live(now) && record.code == code {
                    return Ok(Some(purpose));
                }
            }
        }
        Ok(None)
    }

    async fn record_failure(&self, key: &OtpKey) -> Result<u32> {
        let mut records = self.records.write().await;
        let Some(record) = records
            .get_mut(key)
            .and_then(|history| history.last_mut())
            .filter(|record| !record.is_superseded)
        else {
            return Ok(0);
        };
        record.attempts += 1;
        Ok(record.attempts)
    }

    async fn mark_used(&self, key: &OtpKey) -> Result<bool> {
        let mut records = self.records.write().await;
        let Some(record) = records
            .get_mut(key)
            .and_then(|history| history.last_mut())
            .filter(|record| !record.is_superseded)
        else {
            return Ok(false);
        };
        if record.is_used {
            return Ok(false);
        }
        record.is_used = true;
        Ok(true)
    }

    async fn purge_expired(&self, now: DateTime<Utc>, grace: Duration) -> Result<u64> {
        let grace = ChronoDuration::from_std(grace)
            .map_err(|_| AuthError::Internal("grace duration out of range".to_string()))?;
        let mut records = self.records.write().await;
        let mut removed = 0u64;
        for history in records.values_mut() {
            let before = history.len();
            history.retain(|record| record.expires_at + grace >= now);
            removed += (before - history.len()) as u64;
        }
        records.retain(|_, history| !history.is_empty());
        Ok(removed)
    }
}

#[derive(Default)]
pub struct MemoryRevocationStore {
    entries: RwLock<HashMap<String, RevocationEntry>>,
}

impl MemoryRevocationStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RevocationStore for MemoryRevocationStore {
    async fn revoke(&self, entry: RevocationEntry) -> Result<()> {
        let mut entries = self.entries.write().await;
        entries.entry(entry.jti.clone()).or_insert(entry);
        Ok(())
    }

    async fn is_revoked(&self, jti: &str) -> Result<bool> {
        Ok(self.entries.read().await.contains_key(jti))
    }

    async fn prune_expired(&self, now: DateTime<Utc>) -> Result<u64> {
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|_, entry| entry.expires_at > now);
        Ok((before - entries.len()) as u64)
    }
}

pub struct MemoryGeneralUserStore {
    clock: Arc<dyn Clock>,
    users: RwLock<HashMap<Uuid, GeneralUser>>,
}

impl MemoryGeneralUserStore {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            users: RwLock::new(HashMap::new()),
        }
    }

    /// Seed an account directly, bypassing the pending-registration flow.
    pub async fn insert(&self, user: GeneralUser) {
        self.users.write().await.insert(user.id, user);
    }
}

fn contact_matches_user(user: &GeneralUser, contact: &str, channel: Channel) -> bool {
    match channel {
        Channel::Email => user.email.as_deref() == Some(contact),
        Channel::Messaging => user.mobile.as_deref() == Some(contact),
    }
}

#[async_trait]
impl GeneralUserStore for MemoryGeneralUserStore {
    async fn find_by_contact(
        &self,
        contact: &str,
        channel: Channel,
    ) -> Result<Option<GeneralUser>> {
        let users = self.users.read().await;
        Ok(users
            .values()
            .find(|user| contact_matches_user(user, contact, channel))
            .cloned())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<GeneralUser>> {
        Ok(self.users.read().await.get(&id).cloned())
    }

    async fn create_pending(
        &self,
        contact: &str,
        channel: Channel,
        password_hash: &str,
        display_name: Option<&str>,
    ) -> Result<GeneralUser> {
        let mut users = self.users.write().await;
        if users
            .values()
            .any(|user| contact_matches_user(user, contact, channel))
        {
            return Err(AuthError::IdentityConflict);
        }

        let now = self.clock.now();
        let user = GeneralUser {
            id: Uuid::new_v4(),
            email: (channel == Channel::Email).then(|| contact.to_string()),
            mobile: (channel == Channel::Messaging).then(|| contact.to_string()),
            display_name: display_name.map(str::to_string),
            password_hash: password_hash.to_string(),
            email_verified: false,
            mobile_verified: false,
            is_active: false,
            failed_login_attempts: 0,
            locked_until: None,
            created_at: now,
            updated_at: now,
        };
        users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn update_verification_flags(&self, id: Uuid, channel: Channel) -> Result<()> {
        let mut users = self.users.write().await;
        let user = users.get_mut(&id).ok_or(AuthError::NotFound)?;
        match channel {
            Channel::Email => user.email_verified = true,
            Channel::Messaging => user.mobile_verified = true,
        }
        user.is_active = true;
        user.updated_at = self.clock.now();
        Ok(())
    }

    async fn update_password_hash(&self, id: Uuid, password_hash: &str) -> Result<()> {
        let mut users = self.users.write().await;
        let user = users.get_mut(&id).ok_or(AuthError::NotFound)?;
        user.password_hash = password_hash.to_string();
        user.updated_at = self.clock.now();
        Ok(())
    }

    async fn increment_login_attempts(&self, id: Uuid) -> Result<i32> {
        let mut users = self.users.write().await;
        let user = users.get_mut(&id).ok_or(AuthError::NotFound)?;
        user.failed_login_attempts += 1;
        Ok(user.failed_login_attempts)
    }

    async fn set_lockout(&self, id: Uuid, until: DateTime<Utc>) -> Result<()> {
        let mut users = self.users.write().await;
        let user = users.get_mut(&id).ok_or(AuthError::NotFound)?;
        user.locked_until = Some(until);
        Ok(())
    }

    async fn clear_lockout(&self, id: Uuid) -> Result<()> {
        let mut users = self.users.write().await;
        let user = users.get_mut(&id).ok_or(AuthError::NotFound)?;
        user.locked_until = None;
        user.failed_login_attempts = 0;
        Ok(())
    }
}

pub struct MemoryOperatorStore {
    clock: Arc<dyn Clock>,
    staff: RwLock<HashMap<i64, OperatorStaff>>,
}

impl MemoryOperatorStore {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            staff: RwLock::new(HashMap::new()),
        }
    }

    /// Seed a staff account. Operator onboarding itself is owned by the
    /// operator management service, not this core.
    pub async fn insert(&self, staff: OperatorStaff) {
        self.staff.write().await.insert(staff.id, staff);
    }
}

fn contact_matches_staff(staff: &OperatorStaff, contact: &str, channel: Channel) -> bool {
    match channel {
        Channel::Email => staff.email.as_deref() == Some(contact),
        Channel::Messaging => staff.mobile.as_deref() == Some(contact),
    }
}

#[async_trait]
impl OperatorStore for MemoryOperatorStore {
    async fn find_by_contact(
        &self,
        contact: &str,
        channel: Channel,
    ) -> Result<Option<OperatorStaff>> {
        let staff = self.staff.read().await;
        Ok(staff
            .values()
            .find(|member| contact_matches_staff(member, contact, channel))
            .cloned())
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<OperatorStaff>> {
        Ok(self.staff.read().await.get(&id).cloned())
    }

    async fn update_verification_flags(&self, id: i64, channel: Channel) -> Result<()> {
        let mut staff = self.staff.write().await;
        let member = staff.get_mut(&id).ok_or(AuthError::NotFound)?;
        match channel {
            Channel::Email => member.email_verified = true,
            Channel::Messaging => member.mobile_verified = true,
        }
        member.is_active = true;
        member.updated_at = self.clock.now();
        Ok(())
    }

    async fn update_password_hash(&self, id: i64, password_hash: &str) -> Result<()> {
        let mut staff = self.staff.write().await;
        let member = staff.get_mut(&id).ok_or(AuthError::NotFound)?;
        member.password_hash = password_hash.to_string();
        member.updated_at = self.clock.now();
        Ok(())
    }

    async fn increment_login_attempts(&self, id: i64) -> Result<i32> {
        let mut staff = self.staff.write().await;
        let member = staff.get_mut(&id).ok_or(AuthError::NotFound)?;
        member.failed_login_attempts += 1;
        Ok(member.failed_login_attempts)
    }

    async fn set_lockout(&self, id: i64, until: DateTime<Utc>) -> Result<()> {
        let mut staff = self.staff.write().await;
        let member = staff.get_mut(&id).ok_or(AuthError::NotFound)?;
        member.locked_until = Some(until);
        Ok(())
    }

    async fn clear_lockout(&self, id: i64) -> Result<()> {
        let mut staff = self.staff.write().await;
        let member = staff.get_mut(&id).ok_or(AuthError::NotFound)?;
        member.locked_until = None;
        member.failed_login_attempts = 0;
        Ok(())
    }
}
