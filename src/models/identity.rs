use crate::models::Channel;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// General end-user account.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct GeneralUser {
    pub id: Uuid,
    pub email: Option<String>,
    pub mobile: Option<String>,
    pub display_name: Option<String>,
    pub password_hash: String,
    pub email_verified: bool,
    pub mobile_verified: bool,
    pub is_active: bool,
    pub failed_login_attempts: i32,
    pub locked_until: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Operator staff account, scoped to the organization (`operator_id`) it
/// works for.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct OperatorStaff {
    pub id: i64,
    pub operator_id: i64,
    pub email: Option<String>,
    pub mobile: Option<String>,
    pub role: String,
    pub password_hash: String,
    pub email_verified: bool,
    pub mobile_verified: bool,
    pub is_active: bool,
    pub failed_login_attempts: i32,
    pub locked_until: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Which identity store a subject belongs to. Serialized into token claims.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdentityKind {
    User,
    Operator,
}

/// One of the two identity variants behind the login surface, with a uniform
/// accessor set so flow logic never inspects the concrete record type.
#[derive(Debug, Clone)]
pub enum Identity {
    General(GeneralUser),
    Operator(OperatorStaff),
}

impl Identity {
    /// Stable string form of the subject id: uuid for general users,
    /// integer for operator staff.
    pub fn subject_id(&self) -> String {
        match self {
            Identity::General(user) => user.id.to_string(),
            Identity::Operator(staff) => staff.id.to_string(),
        }
    }

    pub fn kind(&self) -> IdentityKind {
        match self {
            Identity::General(_) => IdentityKind::User,
            Identity::Operator(_) => IdentityKind::Operator,
        }
    }

    pub fn password_hash(&self) -> &str {
        match self {
            Identity::General(user) => &user.password_hash,
            Identity::Operator(staff) => &staff.password_hash,
        }
    }

    pub fn is_active(&self) -> bool {
        match self {
            Identity::General(user) => user.is_active,
            Identity::Operator(staff) => staff.is_active,
        }
    }

    pub fn channel_verified(&self, channel: Channel) -> bool {
        let (email_verified, mobile_verified) = match self {
            Identity::General(user) => (user.email_verified, user.mobile_verified),
            Identity::Operator(staff) => (staff.email_verified, staff.mobile_verified),
        };
        match channel {
            Channel::Email => email_verified,
            Channel::Messaging => mobile_verified,
        }
    }

    pub fn failed_login_attempts(&self) -> i32 {
        match self {
            Identity::General(user) => user.failed_login_attempts,
            Identity::Operator(staff) => staff.failed_login_attempts,
        }
    }

    pub fn locked_until(&self) -> Option<DateTime<Utc>> {
        match self {
            Identity::General(user) => user.locked_until,
            Identity::Operator(staff) => staff.locked_until,
        }
    }

    pub fn email(&self) -> Option<&str> {
        match self {
            Identity::General(user) => user.email.as_deref(),
            Identity::Operator(staff) => staff.email.as_deref(),
        }
    }

    pub fn mobile(&self) -> Option<&str> {
        match self {
            Identity::General(user) => user.mobile.as_deref(),
            Identity::Operator(staff) => staff.mobile.as_deref(),
        }
    }

    pub fn display_name(&self) -> Option<&str> {
        match self {
            Identity::General(user) => user.display_name.as_deref(),
            Identity::Operator(_) => None,
        }
    }

    /// Role for operator staff, `None` for general users.
    pub fn role(&self) -> Option<&str> {
        match self {
            Identity::General(_) => None,
            Identity::Operator(staff) => Some(&staff.role),
        }
    }

    /// Owning organization for operator staff.
    pub fn operator_id(&self) -> Option<i64> {
        match self {
            Identity::General(_) => None,
            Identity::Operator(staff) => Some(staff.operator_id),
        }
    }
}

/// Read-only projection of an identity returned by `get_profile`.
#[derive(Debug, Clone, Serialize)]
pub struct Profile {
    pub subject_id: String,
    pub kind: IdentityKind,
    pub email: Option<String>,
    pub mobile: Option<String>,
    pub display_name: Option<String>,
    pub email_verified: bool,
    pub mobile_verified: bool,
    pub role: Option<String>,
    pub operator_id: Option<i64>,
}

impl From<&Identity> for Profile {
    fn from(identity: &Identity) -> Self {
        Profile {
            subject_id: identity.subject_id(),
            kind: identity.kind(),
            email: identity.email().map(str::to_string),
            mobile: identity.mobile().map(str::to_string),
            display_name: identity.display_name().map(str::to_string),
            email_verified: identity.channel_verified(Channel::Email),
            mobile_verified: identity.channel_verified(Channel::Messaging),
            role: identity.role().map(str::to_string),
            operator_id: identity.operator_id(),
        }
    }
}
