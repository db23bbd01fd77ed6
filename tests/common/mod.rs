//! Shared test harness: AuthService wired to in-memory stores, a manual
//! clock and a recording delivery double.
#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use pulse_auth::store::memory::{
    MemoryCounterStore, MemoryGeneralUserStore, MemoryOperatorStore, MemoryOtpStore,
    MemoryRevocationStore,
};
use pulse_auth::{
    AuthConfig, AuthError, AuthService, Channel, Clock, GeneralUser, ManualClock,
    NotificationDelivery, OperatorStaff, Result, StoreBundle,
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;
use uuid::Uuid;

pub const TEST_SECRET: &str = "unit-test-signing-secret-0123456789abcdef";
pub const STRONG_PASSWORD: &str = "CorrectHorse9!";

pub fn start_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap()
}

/// Delivery double that records every message and can be told to fail.
#[derive(Default)]
pub struct RecordingDelivery {
    pub sent: Mutex<Vec<(String, Channel, String)>>,
    pub fail_next: AtomicBool,
}

impl RecordingDelivery {
    pub fn fail_next(&self) {
        self.fail_next.store(true, Ordering::SeqCst);
    }

    /// Code carried by the most recent message.
    pub async fn last_code(&self) -> String {
        let sent = self.sent.lock().await;
        let (_, _, message) = sent.last().expect("no message delivered");
        extract_code(message)
    }

    pub async fn sent_count(&self) -> usize {
        self.sent.lock().await.len()
    }
}

fn extract_code(message: &str) -> String {
    message
        .split_whitespace()
        .map(|token| token.trim_end_matches('.'))
        .find(|token| token.len() == 6 && token.chars().all(|c| c.is_ascii_digit()))
        .expect("message carries no 6-digit code")
        .to_string()
}

#[async_trait]
impl NotificationDelivery for RecordingDelivery {
    async fn send(&self, contact: &str, channel: Channel, message: &str) -> Result<()> {
        if self.fail_next.swap(false, Ordering::SeqCst) {
            return Err(AuthError::DeliveryFailure(
                "delivery backend unavailable".to_string(),
            ));
        }
        self.sent
            .lock()
            .await
            .push((contact.to_string(), channel, message.to_string()));
        Ok(())
    }
}

pub struct Harness {
    pub auth: AuthService,
    pub clock: Arc<ManualClock>,
    pub users: Arc<MemoryGeneralUserStore>,
    pub operators: Arc<MemoryOperatorStore>,
    pub delivery: Arc<RecordingDelivery>,
}

/// Opt-in log output for debugging test failures (`RUST_LOG=debug`).
fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub fn harness() -> Harness {
    init_tracing();
    let clock = Arc::new(ManualClock::new(start_time()));
    let clock_dyn: Arc<dyn Clock> = clock.clone();

    let counters = Arc::new(MemoryCounterStore::new(Arc::clone(&clock_dyn)));
    let otps = Arc::new(MemoryOtpStore::new());
    let revocations = Arc::new(MemoryRevocationStore::new());
    let users = Arc::new(MemoryGeneralUserStore::new(Arc::clone(&clock_dyn)));
    let operators = Arc::new(MemoryOperatorStore::new(Arc::clone(&clock_dyn)));
    let delivery = Arc::new(RecordingDelivery::default());

    let stores = StoreBundle {
        counters,
        otps,
        revocations,
        users: users.clone(),
        operators: operators.clone(),
    };
    let auth = AuthService::new(
        &AuthConfig::with_secret(TEST_SECRET),
        stores,
        delivery.clone(),
        clock_dyn,
    );

    Harness {
        auth,
        clock,
        users,
        operators,
        delivery,
    }
}

/// Seed an already-verified, active rider account.
pub async fn seed_active_user(harness: &Harness, email: &str, password: &str) -> GeneralUser {
    let now = harness.clock.now();
    let user = GeneralUser {
        id: Uuid::new_v4(),
        email: Some(email.to_string()),
        mobile: None,
        display_name: Some("Test Rider".to_string()),
        password_hash: pulse_auth::security::hash_password(password).unwrap(),
        email_verified: true,
        mobile_verified: false,
        is_active: true,
        failed_login_attempts: 0,
        locked_until: None,
        created_at: now,
        updated_at: now,
    };
    harness.users.insert(user.clone()).await;
    user
}

/// Seed an operator staff account.
pub async fn seed_operator(
    harness: &Harness,
    id: i64,
    email: &str,
    password: &str,
    active: bool,
) -> OperatorStaff {
    let now = harness.clock.now();
    let staff = OperatorStaff {
        id,
        operator_id: 42,
        email: Some(email.to_string()),
        mobile: None,
        role: "admin".to_string(),
        password_hash: pulse_auth::security::hash_password(password).unwrap(),
        email_verified: active,
        mobile_verified: false,
        is_active: active,
        failed_login_attempts: 0,
        locked_until: None,
        created_at: now,
        updated_at: now,
    };
    harness.operators.insert(staff.clone()).await;
    staff
}
