//! Authentication and session core for the Pulse transit platform.
//!
//! One login surface over two identity kinds (general riders, operator
//! staff), backed by one-time codes delivered over email or messaging,
//! fixed-window rate limits, password lockout bookkeeping, and HS256 session
//! tokens revocable by jti.
//!
//! Transport wiring is out of scope: callers hand [`AuthService`] the store
//! implementations (Redis/Postgres in production, in-memory for tests) and a
//! [`NotificationDelivery`] backend, then map [`AuthError`] kinds to their
//! own status codes.

pub mod clock;
pub mod config;
pub mod contact;
pub mod error;
pub mod models;
pub mod security;
pub mod services;
pub mod store;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::AuthConfig;
pub use error::{AuthError, Result};
pub use models::{
    Channel, GeneralUser, Identity, IdentityKind, OperatorStaff, OtpPurpose, Profile,
    RedeemOutcome, RevocationEntry, TokenClaims, TokenKind, TokenPair,
};
pub use security::TokenIssuer;
pub use services::{
    AuthService, CredentialManager, IdentityResolver, LogOnlyDelivery, NotificationDelivery,
    OtpLedger, RateAction, RateLimiter, StoreBundle,
};
