//! Fixed-window rate limiting keyed by (contact, action kind).

use crate::config::AuthConfig;
use crate::contact::mask_contact;
use crate::error::{AuthError, Result};
use crate::store::CounterStore;
use std::sync::Arc;
use std::time::Duration;

/// Action kinds with independent budgets. Keys are per normalized contact,
/// regardless of which identity (if any) the contact resolves to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateAction {
    OtpRequest,
    Registration,
    Login,
}

impl RateAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            RateAction::OtpRequest => "otp_request",
            RateAction::Registration => "registration",
            RateAction::Login => "login",
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Policy {
    limit: u32,
    window: Duration,
}

pub struct RateLimiter {
    counters: Arc<dyn CounterStore>,
    otp_request: Policy,
    registration: Policy,
    login: Policy,
}

impl RateLimiter {
    pub fn new(counters: Arc<dyn CounterStore>, config: &AuthConfig) -> Self {
        Self {
            counters,
            otp_request: Policy {
                limit: config.otp_request_limit,
                window: Duration::from_secs(config.otp_request_window_secs),
            },
            registration: Policy {
                limit: config.registration_limit,
                window: Duration::from_secs(config.registration_window_secs),
            },
            login: Policy {
                limit: config.login_limit,
                window: Duration::from_secs(config.login_window_secs),
            },
        }
    }

    /// Admit or reject one action. The underlying increment-and-read is a
    /// single atomic operation on the counter store, so concurrent callers
    /// cannot both slip past the limit.
    pub async fn check_and_consume(&self, contact: &str, action: RateAction) -> Result<()> {
        let policy = match action {
            RateAction::OtpRequest => self.otp_request,
            RateAction::Registration => self.registration,
            RateAction::Login => self.login,
        };

        let key = format!("{}:{}", action.as_str(), contact);
        let (count, remaining) = self.counters.incr_window(&key, policy.window).await?;

        if count > policy.limit {
            tracing::warn!(
                contact = %mask_contact(contact),
                action = action.as_str(),
                count,
                "rate limit exceeded"
            );
            return Err(AuthError::RateLimited {
                retry_after: remaining,
            });
        }

        Ok(())
    }
}
