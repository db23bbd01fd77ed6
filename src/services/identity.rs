//! Resolution of a contact or token subject to one of the two identity
//! variants. Resolution happens once per request; flow logic downstream only
//! sees the uniform [`Identity`] surface.

use crate::error::{AuthError, Result};
use crate::models::{Channel, Identity};
use crate::store::{GeneralUserStore, OperatorStore};
use std::sync::Arc;
use uuid::Uuid;

pub struct IdentityResolver {
    users: Arc<dyn GeneralUserStore>,
    operators: Arc<dyn OperatorStore>,
}

impl IdentityResolver {
    pub fn new(users: Arc<dyn GeneralUserStore>, operators: Arc<dyn OperatorStore>) -> Self {
        Self { users, operators }
    }

    /// Look the contact up in both stores. A hit in both is a data error and
    /// surfaces as `IdentityConflict`; this never silently picks one.
    pub async fn find_by_contact(
        &self,
        contact: &str,
        channel: Channel,
    ) -> Result<Option<Identity>> {
        let user = self.users.find_by_contact(contact, channel).await?;
        let staff = self.operators.find_by_contact(contact, channel).await?;

        match (user, staff) {
            (Some(_), Some(_)) => Err(AuthError::IdentityConflict),
            (Some(user), None) => Ok(Some(Identity::General(user))),
            (None, Some(staff)) => Ok(Some(Identity::Operator(staff))),
            (None, None) => Ok(None),
        }
    }

    /// Resolve a token subject: uuids live in the general store, integer ids
    /// in the operator store.
    pub async fn find_by_subject(&self, subject: &str) -> Result<Option<Identity>> {
        if let Ok(id) = subject.parse::<i64>() {
            return Ok(self.operators.find_by_id(id).await?.map(Identity::Operator));
        }
        if let Ok(id) = Uuid::parse_str(subject) {
            return Ok(self.users.find_by_id(id).await?.map(Identity::General));
        }
        Ok(None)
    }

    /// Insert an inactive, unverified general user. Promotion to
    /// verified+active happens only through a successful
    /// registration-purpose redemption.
    pub async fn create_pending_general_user(
        &self,
        contact: &str,
        channel: Channel,
        password_hash: &str,
        display_name: Option<&str>,
    ) -> Result<Identity> {
        let user = self
            .users
            .create_pending(contact, channel, password_hash, display_name)
            .await?;
        Ok(Identity::General(user))
    }

    /// Mark the redeemed channel verified and activate the account.
    pub async fn mark_channel_verified(&self, identity: &Identity, channel: Channel) -> Result<()> {
        match identity {
            Identity::General(user) => {
                self.users.update_verification_flags(user.id, channel).await
            }
            Identity::Operator(staff) => {
                self.operators
                    .update_verification_flags(staff.id, channel)
                    .await
            }
        }
    }
}
