pub mod identity;
pub mod otp;
pub mod token;

pub use identity::{GeneralUser, Identity, IdentityKind, OperatorStaff, Profile};
pub use otp::{Channel, OtpKey, OtpPurpose, OtpRecord, RedeemOutcome};
pub use token::{RevocationEntry, TokenClaims, TokenKind, TokenPair};
