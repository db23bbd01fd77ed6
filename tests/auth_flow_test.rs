//! End-to-end flows through the service: registration, verification, login
//! over both identity kinds, and password changes.

mod common;

use common::{harness, seed_active_user, seed_operator, STRONG_PASSWORD};
use pulse_auth::store::GeneralUserStore;
use pulse_auth::{AuthError, Channel, IdentityKind, OtpPurpose};

const EMAIL: &str = "rider@example.com";

#[tokio::test]
async fn registration_verifies_and_activates() {
    let h = harness();

    h.auth
        .register(EMAIL, Channel::Email, STRONG_PASSWORD, Some("Maia"))
        .await
        .unwrap();

    // Pending accounts cannot log in yet.
    let err = h
        .auth
        .login_with_password(EMAIL, Channel::Email, STRONG_PASSWORD)
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::Validation(_)));

    let code = h.delivery.last_code().await;
    h.auth
        .verify_otp(EMAIL, Channel::Email, &code, OtpPurpose::Registration)
        .await
        .unwrap();

    let pair = h
        .auth
        .login_with_password(EMAIL, Channel::Email, STRONG_PASSWORD)
        .await
        .unwrap();
    let profile = h.auth.get_profile(&pair.access_token).await.unwrap();
    assert_eq!(profile.kind, IdentityKind::User);
    assert_eq!(profile.email.as_deref(), Some(EMAIL));
    assert_eq!(profile.display_name.as_deref(), Some("Maia"));
    assert!(profile.email_verified);
    assert!(profile.role.is_none());
}

#[tokio::test]
async fn registration_over_messaging_verifies_the_mobile() {
    let h = harness();

    h.auth
        .register("+31 6 1234-5678", Channel::Messaging, STRONG_PASSWORD, None)
        .await
        .unwrap();

    // Delivery goes to the normalized number.
    {
        let sent = h.delivery.sent.lock().await;
        assert_eq!(sent.last().unwrap().0, "+31612345678");
    }

    let code = h.delivery.last_code().await;
    h.auth
        .verify_otp(
            "+31612345678",
            Channel::Messaging,
            &code,
            OtpPurpose::Registration,
        )
        .await
        .unwrap();

    let pair = h
        .auth
        .login_with_password("+31612345678", Channel::Messaging, STRONG_PASSWORD)
        .await
        .unwrap();
    let profile = h.auth.get_profile(&pair.access_token).await.unwrap();
    assert!(profile.mobile_verified);
    assert!(!profile.email_verified);
}

#[tokio::test]
async fn duplicate_registration_conflicts() {
    let h = harness();
    seed_active_user(&h, EMAIL, STRONG_PASSWORD).await;

    let err = h
        .auth
        .register(EMAIL, Channel::Email, STRONG_PASSWORD, None)
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::IdentityConflict));
}

#[tokio::test]
async fn registration_rejects_weak_passwords_and_bad_contacts() {
    let h = harness();

    let err = h
        .auth
        .register(EMAIL, Channel::Email, "short1!", None)
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::Validation(_)));

    let err = h
        .auth
        .register(EMAIL, Channel::Email, "alllowercase1!", None)
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::Validation(_)));

    let err = h
        .auth
        .register("not-an-email", Channel::Email, STRONG_PASSWORD, None)
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::Validation(_)));

    let err = h
        .auth
        .register("12345", Channel::Messaging, STRONG_PASSWORD, None)
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::Validation(_)));

    // Nothing was sent for any of the rejected requests.
    assert_eq!(h.delivery.sent_count().await, 0);
}

#[tokio::test]
async fn contact_normalization_folds_case_and_whitespace() {
    let h = harness();
    seed_active_user(&h, EMAIL, STRONG_PASSWORD).await;

    h.auth
        .login_with_password("  Rider@Example.COM ", Channel::Email, STRONG_PASSWORD)
        .await
        .unwrap();
}

#[tokio::test]
async fn operator_staff_log_in_with_scoped_claims() {
    let h = harness();
    seed_operator(&h, 7, "staff@operator.example", STRONG_PASSWORD, true).await;

    let pair = h
        .auth
        .login_with_password("staff@operator.example", Channel::Email, STRONG_PASSWORD)
        .await
        .unwrap();
    let profile = h.auth.get_profile(&pair.access_token).await.unwrap();
    assert_eq!(profile.kind, IdentityKind::Operator);
    assert_eq!(profile.subject_id, "7");
    assert_eq!(profile.role.as_deref(), Some("admin"));
    assert_eq!(profile.operator_id, Some(42));
}

#[tokio::test]
async fn operator_registration_code_activates_staff() {
    let h = harness();
    seed_operator(&h, 7, "staff@operator.example", STRONG_PASSWORD, false).await;

    let err = h
        .auth
        .login_with_password("staff@operator.example", Channel::Email, STRONG_PASSWORD)
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::Validation(_)));

    h.auth
        .request_otp(
            "staff@operator.example",
            Channel::Email,
            OtpPurpose::OperatorRegistration,
        )
        .await
        .unwrap();
    let code = h.delivery.last_code().await;
    h.auth
        .verify_otp(
            "staff@operator.example",
            Channel::Email,
            &code,
            OtpPurpose::OperatorRegistration,
        )
        .await
        .unwrap();

    h.auth
        .login_with_password("staff@operator.example", Channel::Email, STRONG_PASSWORD)
        .await
        .unwrap();
}

#[tokio::test]
async fn ambiguous_contact_is_a_conflict() {
    let h = harness();
    seed_active_user(&h, EMAIL, STRONG_PASSWORD).await;
    seed_operator(&h, 7, EMAIL, STRONG_PASSWORD, true).await;

    let err = h
        .auth
        .login_with_password(EMAIL, Channel::Email, STRONG_PASSWORD)
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::IdentityConflict));
}

#[tokio::test]
async fn otp_login_end_to_end() {
    let h = harness();
    seed_active_user(&h, EMAIL, STRONG_PASSWORD).await;

    h.auth
        .request_otp(EMAIL, Channel::Email, OtpPurpose::Login)
        .await
        .unwrap();
    let code = h.delivery.last_code().await;

    let pair = h.auth.login_with_otp(EMAIL, Channel::Email, &code).await.unwrap();
    h.auth.get_profile(&pair.access_token).await.unwrap();

    // Each code carries one session.
    let err = h
        .auth
        .login_with_otp(EMAIL, Channel::Email, &code)
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::AlreadyUsed));
}

#[tokio::test]
async fn change_password_requires_the_current_one() {
    let h = harness();
    let user = seed_active_user(&h, EMAIL, STRONG_PASSWORD).await;
    let pair = h
        .auth
        .login_with_password(EMAIL, Channel::Email, STRONG_PASSWORD)
        .await
        .unwrap();

    let err = h
        .auth
        .change_password(&pair.access_token, "NotTheCurrent1!", "FreshSecret7#")
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::InvalidCredentials));

    // The wrong guess counted toward lockout.
    let stored = h.users.find_by_id(user.id).await.unwrap().unwrap();
    assert_eq!(stored.failed_login_attempts, 1);

    h.auth
        .change_password(&pair.access_token, STRONG_PASSWORD, "FreshSecret7#")
        .await
        .unwrap();

    let err = h
        .auth
        .login_with_password(EMAIL, Channel::Email, STRONG_PASSWORD)
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::InvalidCredentials));
    h.auth
        .login_with_password(EMAIL, Channel::Email, "FreshSecret7#")
        .await
        .unwrap();
}

#[tokio::test]
async fn change_password_rejects_weak_replacements() {
    let h = harness();
    seed_active_user(&h, EMAIL, STRONG_PASSWORD).await;
    let pair = h
        .auth
        .login_with_password(EMAIL, Channel::Email, STRONG_PASSWORD)
        .await
        .unwrap();

    let err = h
        .auth
        .change_password(&pair.access_token, STRONG_PASSWORD, "weak")
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::Validation(_)));

    // The old password still stands.
    h.auth
        .login_with_password(EMAIL, Channel::Email, STRONG_PASSWORD)
        .await
        .unwrap();
}
