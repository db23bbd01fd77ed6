//! Fixed-window rate limits across the service operations.

mod common;

use chrono::Duration;
use common::harness;
use pulse_auth::{AuthError, Channel, OtpPurpose};

const CONTACT: &str = "rider@example.com";

#[tokio::test]
async fn fourth_otp_request_in_window_is_limited() {
    let h = harness();

    for _ in 0..3 {
        h.auth
            .request_otp(CONTACT, Channel::Email, OtpPurpose::Login)
            .await
            .unwrap();
    }

    let err = h
        .auth
        .request_otp(CONTACT, Channel::Email, OtpPurpose::Login)
        .await
        .unwrap_err();
    match err {
        AuthError::RateLimited { retry_after } => {
            assert!(retry_after.as_secs() > 0);
            assert!(retry_after.as_secs() <= 300);
        }
        other => panic!("expected RateLimited, got {other:?}"),
    }

    // The limited request never reached delivery.
    assert_eq!(h.delivery.sent_count().await, 3);
}

#[tokio::test]
async fn otp_request_window_resets() {
    let h = harness();

    for _ in 0..3 {
        h.auth
            .request_otp(CONTACT, Channel::Email, OtpPurpose::Login)
            .await
            .unwrap();
    }
    assert!(matches!(
        h.auth
            .request_otp(CONTACT, Channel::Email, OtpPurpose::Login)
            .await,
        Err(AuthError::RateLimited { .. })
    ));

    h.clock.advance(Duration::seconds(301));
    h.auth
        .request_otp(CONTACT, Channel::Email, OtpPurpose::Login)
        .await
        .unwrap();
}

#[tokio::test]
async fn limits_are_per_contact() {
    let h = harness();

    for _ in 0..3 {
        h.auth
            .request_otp(CONTACT, Channel::Email, OtpPurpose::Login)
            .await
            .unwrap();
    }

    // Another contact has its own budget.
    h.auth
        .request_otp("someone.else@example.com", Channel::Email, OtpPurpose::Login)
        .await
        .unwrap();
}

#[tokio::test]
async fn failed_delivery_still_consumes_budget() {
    let h = harness();

    h.delivery.fail_next();
    let err = h
        .auth
        .request_otp(CONTACT, Channel::Email, OtpPurpose::Login)
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::DeliveryFailure(_)));

    for _ in 0..2 {
        h.auth
            .request_otp(CONTACT, Channel::Email, OtpPurpose::Login)
            .await
            .unwrap();
    }

    // The failed request counted against the window.
    assert!(matches!(
        h.auth
            .request_otp(CONTACT, Channel::Email, OtpPurpose::Login)
            .await,
        Err(AuthError::RateLimited { .. })
    ));
}

#[tokio::test]
async fn login_attempts_are_limited_per_contact() {
    let h = harness();

    // Unknown contact: every attempt fails credentials but still consumes
    // the login budget.
    for _ in 0..10 {
        let err = h
            .auth
            .login_with_password("nobody@example.com", Channel::Email, "Wrong1234!")
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::InvalidCredentials));
    }

    let err = h
        .auth
        .login_with_password("nobody@example.com", Channel::Email, "Wrong1234!")
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::RateLimited { .. }));
}
