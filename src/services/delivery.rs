//! Notification delivery contract.
//!
//! Delivery backends (SMTP, SMS/WhatsApp gateways) live outside this crate;
//! the core only hands a rendered message to this trait and reports failure
//! without retrying.

use crate::contact::mask_contact;
use crate::error::Result;
use crate::models::Channel;
use async_trait::async_trait;

#[async_trait]
pub trait NotificationDelivery: Send + Sync {
    /// Deliver `message` to `contact` over `channel`. Implementations must
    /// not block indefinitely and should return
    /// [`crate::error::AuthError::DeliveryFailure`] on failure.
    async fn send(&self, contact: &str, channel: Channel, message: &str) -> Result<()>;
}

/// Development fallback: logs instead of sending when no delivery backend is
/// configured. The message (which contains the code) is logged at warn so it
/// cannot slip into production info logs unnoticed.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogOnlyDelivery;

#[async_trait]
impl NotificationDelivery for LogOnlyDelivery {
    async fn send(&self, contact: &str, channel: Channel, message: &str) -> Result<()> {
        tracing::warn!(
            contact = %mask_contact(contact),
            %channel,
            message,
            "delivery backend not configured - message logged instead"
        );
        Ok(())
    }
}
