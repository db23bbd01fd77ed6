//! Contact normalization and validation.
//!
//! Pure functions: a raw contact string plus its declared channel either
//! canonicalizes cleanly or fails with a validation error. Nothing here
//! touches storage.

use crate::error::{AuthError, Result};
use crate::models::Channel;
use once_cell::sync::Lazy;
use regex::Regex;

static EMAIL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[a-z0-9._%+-]+@[a-z0-9.-]+\.[a-z]{2,}$").expect("valid email regex")
});

/// Canonicalize a contact string against its declared channel.
///
/// Email addresses are trimmed and lowercased; messaging numbers are reduced
/// to canonical E.164 form (`+` followed by 7-15 digits). Formatting
/// characters commonly pasted with phone numbers are stripped first.
pub fn normalize_contact(raw: &str, channel: Channel) -> Result<String> {
    match channel {
        Channel::Email => {
            let email = raw.trim().to_lowercase();
            if EMAIL_RE.is_match(&email) {
                Ok(email)
            } else {
                Err(AuthError::Validation(
                    "invalid email address format".to_string(),
                ))
            }
        }
        Channel::Messaging => {
            let number: String = raw
                .chars()
                .filter(|c| !matches!(c, ' ' | '-' | '(' | ')' | '.'))
                .collect();
            if is_valid_e164(&number) {
                Ok(number)
            } else {
                Err(AuthError::Validation(
                    "phone number must be in E.164 format (e.g., +14155551234)".to_string(),
                ))
            }
        }
    }
}

fn is_valid_e164(number: &str) -> bool {
    let Some(digits) = number.strip_prefix('+') else {
        return false;
    };
    (7..=15).contains(&digits.len()) && digits.chars().all(|c| c.is_ascii_digit())
}

/// Mask a contact for logging. Phone numbers keep the last four digits,
/// email addresses keep the first character and the domain.
pub fn mask_contact(contact: &str) -> String {
    if let Some((local, domain)) = contact.split_once('@') {
        let first = local.chars().next().unwrap_or('*');
        return format!("{first}***@{domain}");
    }
    if contact.len() <= 4 {
        return "****".to_string();
    }
    format!("****{}", &contact[contact.len() - 4..])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_email() {
        let email = normalize_contact("  Rider@Example.COM ", Channel::Email).unwrap();
        assert_eq!(email, "rider@example.com");
    }

    #[test]
    fn test_reject_malformed_email() {
        assert!(normalize_contact("not-an-email", Channel::Email).is_err());
        assert!(normalize_contact("a@b", Channel::Email).is_err());
        assert!(normalize_contact("", Channel::Email).is_err());
    }

    #[test]
    fn test_normalize_messaging_number() {
        let number = normalize_contact("+1 (415) 555-1234", Channel::Messaging).unwrap();
        assert_eq!(number, "+14155551234");
    }

    #[test]
    fn test_reject_malformed_number() {
        assert!(normalize_contact("14155551234", Channel::Messaging).is_err());
        assert!(normalize_contact("+12", Channel::Messaging).is_err());
        assert!(normalize_contact("+1415555123456789", Channel::Messaging).is_err());
        assert!(normalize_contact("+1415abc1234", Channel::Messaging).is_err());
    }

    #[test]
    fn test_mask_contact() {
        assert_eq!(mask_contact("rider@example.com"), "r***@example.com");
        assert_eq!(mask_contact("+14155551234"), "****1234");
        assert_eq!(mask_contact("+12"), "****");
    }
}
