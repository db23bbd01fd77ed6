use crate::error::{AuthError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Delivery medium a contact string belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Channel {
    Email,
    Messaging,
}

impl Channel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Channel::Email => "email",
            Channel::Messaging => "messaging",
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Intended use of a one-time code. Purpose is part of the lookup key, so a
/// code issued for one purpose can never redeem under another.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OtpPurpose {
    Registration,
    Login,
    PasswordUpdate,
    OperatorRegistration,
}

impl OtpPurpose {
    pub const ALL: [OtpPurpose; 4] = [
        OtpPurpose::Registration,
        OtpPurpose::Login,
        OtpPurpose::PasswordUpdate,
        OtpPurpose::OperatorRegistration,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            OtpPurpose::Registration => "registration",
            OtpPurpose::Login => "login",
            OtpPurpose::PasswordUpdate => "password_update",
            OtpPurpose::OperatorRegistration => "operator_registration",
        }
    }
}

impl fmt::Display for OtpPurpose {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lookup key for one-time codes: at most one record is live per key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OtpKey {
    pub contact: String,
    pub channel: Channel,
    pub purpose: OtpPurpose,
}

impl OtpKey {
    pub fn new(contact: impl Into<String>, channel: Channel, purpose: OtpPurpose) -> Self {
        Self {
            contact: contact.into(),
            channel,
            purpose,
        }
    }

    /// Storage key, e.g. `otp:email:registration:a@b.com`.
    pub fn storage_key(&self) -> String {
        format!("otp:{}:{}:{}", self.channel, self.purpose, self.contact)
    }
}

/// A stored one-time code and its redemption state.
///
/// Records are never deleted by the core; they expire logically and may be
/// garbage-collected by the store after expiry plus a grace period.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OtpRecord {
    pub contact: String,
    pub channel: Channel,
    pub purpose: OtpPurpose,
    pub code: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub attempts: u32,
    pub is_used: bool,
    pub is_superseded: bool,
}

impl OtpRecord {
    pub fn key(&self) -> OtpKey {
        OtpKey::new(self.contact.clone(), self.channel, self.purpose)
    }

    /// Live means redeemable: not used, not superseded, not past expiry.
    pub fn is_live(&self, now: DateTime<Utc>) -> bool {
        !self.is_used && !self.is_superseded && now <= self.expires_at
    }
}

/// Outcome of a redemption attempt. Wrong codes and expired records are
/// expected, frequent outcomes, so they are values rather than errors; only
/// store failures surface as `Err`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RedeemOutcome {
    Verified,
    NotFound,
    Expired,
    AlreadyUsed,
    Exhausted,
    PurposeMismatch,
    InvalidCode,
}

impl RedeemOutcome {
    /// Map a non-verified outcome to its error kind for callers that treat
    /// anything short of `Verified` as a failure.
    pub fn into_result(self) -> Result<()> {
        match self {
            RedeemOutcome::Verified => Ok(()),
            RedeemOutcome::NotFound => Err(AuthError::NotFound),
            RedeemOutcome::Expired => Err(AuthError::Expired),
            RedeemOutcome::AlreadyUsed => Err(AuthError::AlreadyUsed),
            RedeemOutcome::Exhausted => Err(AuthError::Exhausted),
            RedeemOutcome::PurposeMismatch => Err(AuthError::PurposeMismatch),
            RedeemOutcome::InvalidCode => Err(AuthError::InvalidCode),
        }
    }
}
