/// Security primitives: password hashing and session token issuance.
pub mod password;
pub mod token;

pub use password::{hash_password, validate_policy, verify_password};
pub use token::TokenIssuer;

/// Compare two byte strings in constant time, so code checks leak nothing
/// about where the first mismatch sits.
pub(crate) fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut diff = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        diff |= x ^ y;
    }
    diff == 0
}
