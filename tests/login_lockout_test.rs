//! Failed-login bookkeeping: lockout engagement, expiry and recovery.

mod common;

use chrono::Duration;
use common::{harness, seed_active_user, STRONG_PASSWORD};
use pulse_auth::store::GeneralUserStore;
use pulse_auth::{AuthError, Channel, Clock, OtpPurpose};

const EMAIL: &str = "rider@example.com";

#[tokio::test]
async fn fifth_wrong_password_locks_the_account() {
    let h = harness();
    seed_active_user(&h, EMAIL, STRONG_PASSWORD).await;

    for _ in 0..4 {
        let err = h
            .auth
            .login_with_password(EMAIL, Channel::Email, "NotThePassword1!")
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::InvalidCredentials));
    }

    let err = h
        .auth
        .login_with_password(EMAIL, Channel::Email, "NotThePassword1!")
        .await
        .unwrap_err();
    match err {
        AuthError::AccountLocked { until } => {
            assert_eq!(until, h.clock.now() + Duration::seconds(900));
        }
        other => panic!("expected AccountLocked, got {other:?}"),
    }

    // The correct password does not bypass an active lockout.
    let err = h
        .auth
        .login_with_password(EMAIL, Channel::Email, STRONG_PASSWORD)
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::AccountLocked { .. }));
}

#[tokio::test]
async fn lockout_expires_and_success_clears_the_counter() {
    let h = harness();
    let user = seed_active_user(&h, EMAIL, STRONG_PASSWORD).await;

    for _ in 0..5 {
        let _ = h
            .auth
            .login_with_password(EMAIL, Channel::Email, "NotThePassword1!")
            .await;
    }

    h.clock.advance(Duration::seconds(901));
    h.auth
        .login_with_password(EMAIL, Channel::Email, STRONG_PASSWORD)
        .await
        .unwrap();

    let stored = h.users.find_by_id(user.id).await.unwrap().unwrap();
    assert_eq!(stored.failed_login_attempts, 0);
    assert!(stored.locked_until.is_none());
}

#[tokio::test]
async fn otp_reset_bypasses_and_clears_lockout() {
    let h = harness();
    let user = seed_active_user(&h, EMAIL, STRONG_PASSWORD).await;

    for _ in 0..5 {
        let _ = h
            .auth
            .login_with_password(EMAIL, Channel::Email, "NotThePassword1!")
            .await;
    }

    // Proving channel possession is the way out of a locked account.
    h.auth
        .request_password_reset(EMAIL, Channel::Email)
        .await
        .unwrap();
    let code = h.delivery.last_code().await;
    h.auth
        .reset_password(EMAIL, Channel::Email, &code, "FreshSecret7#")
        .await
        .unwrap();

    let stored = h.users.find_by_id(user.id).await.unwrap().unwrap();
    assert_eq!(stored.failed_login_attempts, 0);
    assert!(stored.locked_until.is_none());

    h.auth
        .login_with_password(EMAIL, Channel::Email, "FreshSecret7#")
        .await
        .unwrap();
}

#[tokio::test]
async fn otp_login_leaves_failure_counter_untouched() {
    let h = harness();
    let user = seed_active_user(&h, EMAIL, STRONG_PASSWORD).await;

    for _ in 0..3 {
        let _ = h
            .auth
            .login_with_password(EMAIL, Channel::Email, "NotThePassword1!")
            .await;
    }

    h.auth
        .request_otp(EMAIL, Channel::Email, OtpPurpose::Login)
        .await
        .unwrap();
    let code = h.delivery.last_code().await;
    let pair = h.auth.login_with_otp(EMAIL, Channel::Email, &code).await.unwrap();
    assert!(!pair.access_token.is_empty());

    // Code-based login is not a password success, so the counter stands.
    let stored = h.users.find_by_id(user.id).await.unwrap().unwrap();
    assert_eq!(stored.failed_login_attempts, 3);
}
