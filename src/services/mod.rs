pub mod auth;
pub mod credentials;
pub mod delivery;
pub mod identity;
pub mod otp_ledger;
pub mod rate_limiter;

pub use auth::{AuthService, StoreBundle};
pub use credentials::CredentialManager;
pub use delivery::{LogOnlyDelivery, NotificationDelivery};
pub use identity::IdentityResolver;
pub use otp_ledger::OtpLedger;
pub use rate_limiter::{RateAction, RateLimiter};
