//! Session token lifecycle: validation, rotation, revocation and expiry.

mod common;

use chrono::Duration;
use common::{harness, seed_active_user, Harness, STRONG_PASSWORD};
use pulse_auth::{AuthError, Channel, TokenPair};

const EMAIL: &str = "rider@example.com";

async fn login(h: &Harness) -> TokenPair {
    seed_active_user(h, EMAIL, STRONG_PASSWORD).await;
    h.auth
        .login_with_password(EMAIL, Channel::Email, STRONG_PASSWORD)
        .await
        .unwrap()
}

fn tamper(token: &str) -> String {
    let mut tampered = token.to_string();
    let last = tampered.pop().unwrap();
    tampered.push(if last == 'A' { 'B' } else { 'A' });
    tampered
}

#[tokio::test]
async fn login_issues_a_usable_pair() {
    let h = harness();
    let pair = login(&h).await;
    assert_eq!(pair.expires_in, 1800);

    let profile = h.auth.get_profile(&pair.access_token).await.unwrap();
    assert_eq!(profile.email.as_deref(), Some(EMAIL));
}

#[tokio::test]
async fn logout_revokes_both_tokens() {
    let h = harness();
    let pair = login(&h).await;

    h.auth
        .logout(&pair.access_token, Some(&pair.refresh_token))
        .await
        .unwrap();

    let err = h.auth.get_profile(&pair.access_token).await.unwrap_err();
    assert!(matches!(err, AuthError::TokenBlacklisted));

    let err = h.auth.refresh_token(&pair.refresh_token).await.unwrap_err();
    assert!(matches!(err, AuthError::TokenBlacklisted));
}

#[tokio::test]
async fn refresh_rotates_and_is_single_use() {
    let h = harness();
    let pair = login(&h).await;

    let rotated = h.auth.refresh_token(&pair.refresh_token).await.unwrap();
    assert_ne!(rotated.refresh_token, pair.refresh_token);

    // The consumed refresh token is dead; the rotated pair works.
    let err = h.auth.refresh_token(&pair.refresh_token).await.unwrap_err();
    assert!(matches!(err, AuthError::TokenBlacklisted));
    h.auth.get_profile(&rotated.access_token).await.unwrap();
    h.auth.refresh_token(&rotated.refresh_token).await.unwrap();
}

#[tokio::test]
async fn access_token_expires_before_refresh() {
    let h = harness();
    let pair = login(&h).await;

    h.clock.advance(Duration::seconds(1801));
    let err = h.auth.get_profile(&pair.access_token).await.unwrap_err();
    assert!(matches!(err, AuthError::TokenInvalid));

    // The refresh token is still inside its seven-day window.
    let rotated = h.auth.refresh_token(&pair.refresh_token).await.unwrap();
    h.auth.get_profile(&rotated.access_token).await.unwrap();
}

#[tokio::test]
async fn refresh_token_expires_after_seven_days() {
    let h = harness();
    let pair = login(&h).await;

    h.clock.advance(Duration::days(7) + Duration::seconds(1));
    let err = h.auth.refresh_token(&pair.refresh_token).await.unwrap_err();
    assert!(matches!(err, AuthError::TokenInvalid));
}

#[tokio::test]
async fn token_kind_is_enforced() {
    let h = harness();
    let pair = login(&h).await;

    let err = h.auth.refresh_token(&pair.access_token).await.unwrap_err();
    assert!(matches!(err, AuthError::TokenInvalid));

    let err = h.auth.get_profile(&pair.refresh_token).await.unwrap_err();
    assert!(matches!(err, AuthError::TokenInvalid));
}

#[tokio::test]
async fn tampered_token_is_rejected() {
    let h = harness();
    let pair = login(&h).await;

    let err = h
        .auth
        .get_profile(&tamper(&pair.access_token))
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::TokenInvalid));
}

#[tokio::test]
async fn pruning_drops_revocations_for_expired_tokens() {
    let h = harness();
    let pair = login(&h).await;
    h.auth
        .logout(&pair.access_token, Some(&pair.refresh_token))
        .await
        .unwrap();

    // Both entries still guard live tokens.
    assert_eq!(h.auth.prune_revoked_tokens().await.unwrap(), 0);

    // Access entry lapses with the access token.
    h.clock.advance(Duration::seconds(1801));
    assert_eq!(h.auth.prune_revoked_tokens().await.unwrap(), 1);

    h.clock.advance(Duration::days(7));
    assert_eq!(h.auth.prune_revoked_tokens().await.unwrap(), 1);
}
