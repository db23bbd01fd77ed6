//! Postgres-backed identity stores (see migrations/0001_auth_schema.sql for
//! the reference schema).

use crate::error::{AuthError, Result};
use crate::models::{Channel, GeneralUser, OperatorStaff};
use crate::store::{GeneralUserStore, OperatorStore};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

pub struct PgGeneralUserStore {
    pool: PgPool,
}

impl PgGeneralUserStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn map_insert_err(e: sqlx::Error) -> AuthError {
    if e.to_string().contains("unique constraint") {
        AuthError::IdentityConflict
    } else {
        e.into()
    }
}

#[async_trait]
impl GeneralUserStore for PgGeneralUserStore {
    async fn find_by_contact(
        &self,
        contact: &str,
        channel: Channel,
    ) -> Result<Option<GeneralUser>> {
        let query = match channel {
            Channel::Email => "SELECT * FROM users WHERE email = $1",
            Channel::Messaging => "SELECT * FROM users WHERE mobile = $1",
        };
        let user = sqlx::query_as::<_, GeneralUser>(query)
            .bind(contact)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<GeneralUser>> {
        let user = sqlx::query_as::<_, GeneralUser>("SELECT * FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    async fn create_pending(
        &self,
        contact: &str,
        channel: Channel,
        password_hash: &str,
        display_name: Option<&str>,
    ) -> Result<GeneralUser> {
        let (email, mobile) = match channel {
            Channel::Email => (Some(contact), None),
            Channel::Messaging => (None, Some(contact)),
        };
        let user = sqlx::query_as::<_, GeneralUser>(
            r#"
            INSERT INTO users
                (id, email, mobile, display_name, password_hash,
                 email_verified, mobile_verified, is_active,
                 failed_login_attempts, created_at, updated_at)
            VALUES (gen_random_uuid(), $1, $2, $3, $4,
                    false, false, false, 0, CURRENT_TIMESTAMP, CURRENT_TIMESTAMP)
            RETURNING *
            "#,
        )
        .bind(email)
        .bind(mobile)
        .bind(display_name)
        .bind(password_hash)
        .fetch_one(&self.pool)
        .await
        .map_err(map_insert_err)?;
        Ok(user)
    }

    async fn update_verification_flags(&self, id: Uuid, channel: Channel) -> Result<()> {
        let query = match channel {
            Channel::Email => {
                "UPDATE users SET email_verified = true, is_active = true,
                 updated_at = CURRENT_TIMESTAMP WHERE id = $1"
            }
            Channel::Messaging => {
                "UPDATE users SET mobile_verified = true, is_active = true,
                 updated_at = CURRENT_TIMESTAMP WHERE id = $1"
            }
        };
        sqlx::query(query).bind(id).execute(&self.pool).await?;
        Ok(())
    }

    async fn update_password_hash(&self, id: Uuid, password_hash: &str) -> Result<()> {
        sqlx::query(
            "UPDATE users SET password_hash = $2, updated_at = CURRENT_TIMESTAMP WHERE id = $1",
        )
        .bind(id)
        .bind(password_hash)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn increment_login_attempts(&self, id: Uuid) -> Result<i32> {
        let attempts: i32 = sqlx::query_scalar(
            r#"
            UPDATE users
            SET failed_login_attempts = failed_login_attempts + 1,
                updated_at = CURRENT_TIMESTAMP
            WHERE id = $1
            RETURNING failed_login_attempts
            "#,
        )
        .bind(id)
        .fetch_one(&self.pool)
        .await?;
        Ok(attempts)
    }

    async fn set_lockout(&self, id: Uuid, until: DateTime<Utc>) -> Result<()> {
        sqlx::query(
            "UPDATE users SET locked_until = $2, updated_at = CURRENT_TIMESTAMP WHERE id = $1",
        )
        .bind(id)
        .bind(until)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn clear_lockout(&self, id: Uuid) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE users
            SET locked_until = NULL, failed_login_attempts = 0,
                updated_at = CURRENT_TIMESTAMP
            WHERE id = $1
            "#,
        )
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

pub struct PgOperatorStore {
    pool: PgPool,
}

impl PgOperatorStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl OperatorStore for PgOperatorStore {
    async fn find_by_contact(
        &self,
        contact: &str,
        channel: Channel,
    ) -> Result<Option<OperatorStaff>> {
        let query = match channel {
            Channel::Email => "SELECT * FROM operator_staff WHERE email = $1",
            Channel::Messaging => "SELECT * FROM operator_staff WHERE mobile = $1",
        };
        let staff = sqlx::query_as::<_, OperatorStaff>(query)
            .bind(contact)
            .fetch_optional(&self.pool)
            .await?;
        Ok(staff)
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<OperatorStaff>> {
        let staff =
            sqlx::query_as::<_, OperatorStaff>("SELECT * FROM operator_staff WHERE id = $1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(staff)
    }

    async fn update_verification_flags(&self, id: i64, channel: Channel) -> Result<()> {
        let query = match channel {
            Channel::Email => {
                "UPDATE operator_staff SET email_verified = true, is_active = true,
                 updated_at = CURRENT_TIMESTAMP WHERE id = $1"
            }
            Channel::Messaging => {
                "UPDATE operator_staff SET mobile_verified = true, is_active = true,
                 updated_at = CURRENT_TIMESTAMP WHERE id = $1"
            }
        };
        sqlx::query(query).bind(id).execute(&self.pool).await?;
        Ok(())
    }

    async fn update_password_hash(&self, id: i64, password_hash: &str) -> Result<()> {
        sqlx::query(
            "UPDATE operator_staff SET password_hash = $2, updated_at = CURRENT_TIMESTAMP WHERE id = $1",
        )
        .bind(id)
        .bind(password_hash)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn increment_login_attempts(&self, id: i64) -> Result<i32> {
        let attempts: i32 = sqlx::query_scalar(
            r#"
            UPDATE operator_staff
            SET failed_login_attempts = failed_login_attempts + 1,
                updated_at = CURRENT_TIMESTAMP
            WHERE id = $1
            RETURNING failed_login_attempts
            "#,
        )
        .bind(id)
        .fetch_one(&self.pool)
        .await?;
        Ok(attempts)
    }

    async fn set_lockout(&self, id: i64, until: DateTime<Utc>) -> Result<()> {
        sqlx::query(
            "UPDATE operator_staff SET locked_until = $2, updated_at = CURRENT_TIMESTAMP WHERE id = $1",
        )
        .bind(id)
        .bind(until)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn clear_lockout(&self, id: i64) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE operator_staff
            SET locked_until = NULL, failed_login_attempts = 0,
                updated_at = CURRENT_TIMESTAMP
            WHERE id = $1
            "#,
        )
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
