/// Configuration management
use serde::Deserialize;

/// Authentication policy knobs. `Default` carries the documented production
/// policies; `from_env` overrides them from the environment (`JWT_SECRET`,
/// `OTP_TTL_SECS`, ...).
#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    pub jwt_secret: String,

    #[serde(default = "default_access_token_ttl_secs")]
    pub access_token_ttl_secs: i64,
    #[serde(default = "default_refresh_token_ttl_secs")]
    pub refresh_token_ttl_secs: i64,

    #[serde(default = "default_otp_ttl_secs")]
    pub otp_ttl_secs: i64,
    #[serde(default = "default_otp_length")]
    pub otp_length: usize,
    #[serde(default = "default_otp_max_attempts")]
    pub otp_max_attempts: u32,

    #[serde(default = "default_max_failed_logins")]
    pub max_failed_logins: i32,
    #[serde(default = "default_lockout_secs")]
    pub lockout_secs: i64,

    #[serde(default = "default_otp_request_limit")]
    pub otp_request_limit: u32,
    #[serde(default = "default_otp_request_window_secs")]
    pub otp_request_window_secs: u64,
    #[serde(default = "default_registration_limit")]
    pub registration_limit: u32,
    #[serde(default = "default_registration_window_secs")]
    pub registration_window_secs: u64,
    #[serde(default = "default_login_limit")]
    pub login_limit: u32,
    #[serde(default = "default_login_window_secs")]
    pub login_window_secs: u64,
}

impl AuthConfig {
    pub fn from_env() -> Result<Self, envy::Error> {
        envy::from_env()
    }

    /// Test/dev configuration with the documented defaults and a throwaway
    /// signing secret.
    pub fn with_secret(jwt_secret: impl Into<String>) -> Self {
        Self {
            jwt_secret: jwt_secret.into(),
            access_token_ttl_secs: default_access_token_ttl_secs(),
            refresh_token_ttl_secs: default_refresh_token_ttl_secs(),
            otp_ttl_secs: default_otp_ttl_secs(),
            otp_length: default_otp_length(),
            otp_max_attempts: default_otp_max_attempts(),
            max_failed_logins: default_max_failed_logins(),
            lockout_secs: default_lockout_secs(),
            otp_request_limit: default_otp_request_limit(),
            otp_request_window_secs: default_otp_request_window_secs(),
            registration_limit: default_registration_limit(),
            registration_window_secs: default_registration_window_secs(),
            login_limit: default_login_limit(),
            login_window_secs: default_login_window_secs(),
        }
    }
}

fn default_access_token_ttl_secs() -> i64 {
    30 * 60
}

fn default_refresh_token_ttl_secs() -> i64 {
    7 * 24 * 60 * 60
}

fn default_otp_ttl_secs() -> i64 {
    300
}

fn default_otp_length() -> usize {
    6
}

fn default_otp_max_attempts() -> u32 {
    3
}

fn default_max_failed_logins() -> i32 {
    5
}

fn default_lockout_secs() -> i64 {
    15 * 60
}

fn default_otp_request_limit() -> u32 {
    3
}

fn default_otp_request_window_secs() -> u64 {
    300
}

fn default_registration_limit() -> u32 {
    5
}

fn default_registration_window_secs() -> u64 {
    3600
}

fn default_login_limit() -> u32 {
    10
}

fn default_login_window_secs() -> u64 {
    3600
}
