//! Redis-backed stores for counters, OTP records and revocation entries.
//!
//! Counters use INCR with a window-length expiry on first increment. OTP
//! records are JSON values mutated under Lua scripts so attempt increments
//! and the used-flag compare-and-swap are single atomic round trips.
//! Revocation entries live under their own keys with the token's residual
//! lifetime as TTL, so Redis prunes them itself.

use crate::error::{AuthError, Result};
use crate::models::{Channel, OtpKey, OtpPurpose, OtpRecord, RevocationEntry};
use crate::store::{CounterStore, OtpStore, RevocationStore};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use redis::aio::ConnectionManager;
use redis::Script;
use std::time::Duration;

const RATE_LIMIT_PREFIX: &str = "auth:rate:";
const OTP_PREFIX: &str = "auth:";
const OTP_SUPERSEDED_SUFFIX: &str = ":superseded";
const REVOKED_PREFIX: &str = "auth:revoked:";

/// Grace period added to OTP key TTLs past logical expiry, so redemption can
/// still report `Expired` rather than `NotFound` shortly after the deadline.
const OTP_TTL_GRACE_SECS: i64 = 600;

pub struct RedisCounterStore {
    conn: ConnectionManager,
}

impl RedisCounterStore {
    pub fn new(conn: ConnectionManager) -> Self {
        Self { conn }
    }
}

#[async_trait]
impl CounterStore for RedisCounterStore {
    async fn incr_window(&self, key: &str, window: Duration) -> Result<(u32, Duration)> {
        let key = format!("{RATE_LIMIT_PREFIX}{key}");
        let mut conn = self.conn.clone();

        let count: u32 = redis::cmd("INCR").arg(&key).query_async(&mut conn).await?;
        if count == 1 {
            redis::cmd("EXPIRE")
                .arg(&key)
                .arg(window.as_secs())
                .query_async::<_, ()>(&mut conn)
                .await?;
            return Ok((count, window));
        }

        let ttl: i64 = redis::cmd("TTL").arg(&key).query_async(&mut conn).await?;
        // A key without expiry means the EXPIRE after the first INCR was
        // lost; reinstate it rather than leaving the window open forever.
        if ttl < 0 {
            redis::cmd("EXPIRE")
                .arg(&key)
                .arg(window.as_secs())
                .query_async::<_, ()>(&mut conn)
                .await?;
            return Ok((count, window));
        }

        Ok((count, Duration::from_secs(ttl as u64)))
    }
}

pub struct RedisOtpStore {
    conn: ConnectionManager,
    put_live_script: Script,
    record_failure_script: Script,
    mark_used_script: Script,
}

impl RedisOtpStore {
    pub fn new(conn: ConnectionManager) -> Self {
        Self {
            conn,
            // KEYS[1] record key, KEYS[2] superseded-code set,
            // ARGV[1] record json, ARGV[2] ttl secs
            put_live_script: Script::new(
                r#"
                local v = redis.call('GET', KEYS[1])
                if v then
                    local old = cjson.decode(v)
                    redis.call('SADD', KEYS[2], old['code'])
                    redis.call('EXPIRE', KEYS[2], ARGV[2])
                end
                redis.call('SET', KEYS[1], ARGV[1], 'EX', ARGV[2])
                return 1
                "#,
            ),
            // KEYS[1] record key -> post-increment attempts, 0 when absent
            record_failure_script: Script::new(
                r#"
                local v = redis.call('GET', KEYS[1])
                if not v then return 0 end
                local rec = cjson.decode(v)
                rec['attempts'] = rec['attempts'] + 1
                redis.call('SET', KEYS[1], cjson.encode(rec), 'KEEPTTL')
                return rec['attempts']
                "#,
            ),
            // KEYS[1] record key -> 1 iff this call flipped the used flag
            mark_used_script: Script::new(
                r#"
                local v = redis.call('GET', KEYS[1])
                if not v then return 0 end
                local rec = cjson.decode(v)
                if rec['is_used'] then return 0 end
                rec['is_used'] = true
                redis.call('SET', KEYS[1], cjson.encode(rec), 'KEEPTTL')
                return 1
                "#,
            ),
        }
    }

    fn record_key(key: &OtpKey) -> String {
        format!("{OTP_PREFIX}{}", key.storage_key())
    }

    fn superseded_key(key: &OtpKey) -> String {
        format!("{OTP_PREFIX}{}{OTP_SUPERSEDED_SUFFIX}", key.storage_key())
    }

    async fn get_record(&self, key: &OtpKey) -> Result<Option<OtpRecord>> {
        let mut conn = self.conn.clone();
        let raw: Option<String> = redis::cmd("GET")
            .arg(Self::record_key(key))
            .query_async(&mut conn)
            .await?;
        match raw {
            Some(json) => {
                let record = serde_json::from_str(&json)
                    .map_err(|e| AuthError::Internal(format!("corrupt otp record: {e}")))?;
                Ok(Some(record))
            }
            None => Ok(None),
        }
    }
}

#[async_trait]
impl OtpStore for RedisOtpStore {
    async fn put_live(&self, record: OtpRecord) -> Result<()> {
        let ttl = (record.expires_at - record.created_at).num_seconds() + OTP_TTL_GRACE_SECS;
        let json = serde_json::to_string(&record)
            .map_err(|e| AuthError::Internal(format!("failed to encode otp record: {e}")))?;

        let key = record.key();
        let mut conn = self.conn.clone();
        self.put_live_script
            .key(Self::record_key(&key))
            .key(Self::superseded_key(&key))
            .arg(json)
            .arg(ttl)
            .invoke_async::<_, ()>(&mut conn)
            .await?;
        Ok(())
    }

    async fn get_current(&self, key: &OtpKey) -> Result<Option<OtpRecord>> {
        self.get_record(key).await
    }

    async fn superseded_code_exists(&self, key: &OtpKey, code: &str) -> Result<bool> {
        let mut conn = self.conn.clone();
        let member: bool = redis::cmd("SISMEMBER")
            .arg(Self::superseded_key(key))
            .arg(code)
            .query_async(&mut conn)
            .await?;
        Ok(member)
    }

    async fn live_purpose_for_code(
        &self,
        contact: &str,
        channel: Channel,
        code: &str,
        except: OtpPurpose,
        now: DateTime<Utc>,
    ) -> Result<Option<OtpPurpose>> {
        for purpose in OtpPurpose::ALL {
            if purpose == except {
                continue;
            }
            let key = OtpKey::new(contact, channel, purpose);
            if let Some(record) = self.get_record(&key).await? {
                if record.is_live(now) && record.code == code {
                    return Ok(Some(purpose));
                }
            }
        }
        Ok(None)
    }

    async fn record_failure(&self, key: &OtpKey) -> Result<u32> {
        let mut conn = self.conn.clone();
        let attempts: u32 = self
            .record_failure_script
            .key(Self::record_key(key))
            .invoke_async(&mut conn)
            .await?;
        Ok(attempts)
    }

    async fn mark_used(&self, key: &OtpKey) -> Result<bool> {
        let mut conn = self.conn.clone();
        let flipped: i32 = self
            .mark_used_script
            .key(Self::record_key(key))
            .invoke_async(&mut conn)
            .await?;
        Ok(flipped == 1)
    }

    async fn purge_expired(&self, _now: DateTime<Utc>, _grace: Duration) -> Result<u64> {
        // Key TTLs already cover garbage collection.
        Ok(0)
    }
}

pub struct RedisRevocationStore {
    conn: ConnectionManager,
}

impl RedisRevocationStore {
    pub fn new(conn: ConnectionManager) -> Self {
        Self { conn }
    }

    fn key(jti: &str) -> String {
        format!("{REVOKED_PREFIX}{jti}")
    }
}

#[async_trait]
impl RevocationStore for RedisRevocationStore {
    async fn revoke(&self, entry: RevocationEntry) -> Result<()> {
        let remaining = (entry.expires_at - Utc::now()).num_seconds().max(1);
        let json = serde_json::to_string(&entry)
            .map_err(|e| AuthError::Internal(format!("failed to encode entry: {e}")))?;

        let mut conn = self.conn.clone();
        redis::cmd("SET")
            .arg(Self::key(&entry.jti))
            .arg(json)
            .arg("EX")
            .arg(remaining)
            .query_async::<_, ()>(&mut conn)
            .await?;
        Ok(())
    }

    async fn is_revoked(&self, jti: &str) -> Result<bool> {
        let mut conn = self.conn.clone();
        let exists: bool = redis::cmd("EXISTS")
            .arg(Self::key(jti))
            .query_async(&mut conn)
            .await?;
        Ok(exists)
    }

    async fn prune_expired(&self, _now: DateTime<Utc>) -> Result<u64> {
        // Entries expire with their keys.
        Ok(0)
    }
}
