use async_trait::async_trait;

use anyhow::Context;

use chrono::{DateTime, Utc};

use sqlx::{PgExecutor, PgPool};

use crate::domain::EmailAddress;
use crate::webhook::SubscriptionStore;

/// Subscription state to write for a paying user
#[derive(Debug, Clone, PartialEq)]
pub struct SubscriptionRecord {
    pub user_email: EmailAddress,
    /// Payment-provider customer ID
    pub customer_id: Option<String>,
    /// Payment-provider subscription ID
    pub subscription_id: Option<String>,
    pub activated_at: DateTime<Utc>,
    pub is_active: bool,
}

impl SubscriptionRecord {
    /// An active record stamped with the current time
    pub fn activate(
        user_email: EmailAddress,
        customer_id: Option<String>,
        subscription_id: Option<String>,
    ) -> Self {
        Self {
            user_email,
            customer_id,
            subscription_id,
            activated_at: Utc::now(),
            is_active: true,
        }
    }
}

/// Stored `pro_users` row
#[cfg(test)]
#[derive(Debug, sqlx::FromRow)]
pub struct ProUser {
    pub id: uuid::Uuid,
    pub user_email: String,
    pub stripe_customer_id: Option<String>,
    pub stripe_subscription_id: Option<String>,
    pub pro_since: DateTime<Utc>,
    pub is_active: bool,
    /// NOTE: Auto-set by the database
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Repository for the `pro_users` table
pub struct ProUsersRepo;

impl ProUsersRepo {
    /// Insert a record, or overwrite every field of the existing record for the same email
    #[tracing::instrument(name = "Upsert pro user", skip(executor))]
    pub async fn upsert<'con>(
        executor: impl PgExecutor<'con>,
        record: &SubscriptionRecord,
    ) -> sqlx::Result<()> {
        sqlx::query(
            r#"
            insert into pro_users
                (user_email, stripe_customer_id, stripe_subscription_id, pro_since, is_active)
            values ($1, $2, $3, $4, $5)
            on conflict (user_email) do update set
                stripe_customer_id = excluded.stripe_customer_id,
                stripe_subscription_id = excluded.stripe_subscription_id,
                pro_since = excluded.pro_since,
                is_active = excluded.is_active,
                updated_at = now()
            "#,
        )
        .bind(record.user_email.as_ref())
        .bind(record.customer_id.as_deref())
        .bind(record.subscription_id.as_deref())
        .bind(record.activated_at)
        .bind(record.is_active)
        .execute(executor)
        .await?;

        Ok(())
    }

    #[cfg(test)]
    pub async fn fetch_by_email<'con>(
        executor: impl PgExecutor<'con>,
        email: &EmailAddress,
    ) -> sqlx::Result<Option<ProUser>> {
        sqlx::query_as::<_, ProUser>(
            r#"
            select id, user_email, stripe_customer_id, stripe_subscription_id,
                   pro_since, is_active, created_at, updated_at
            from pro_users
            where user_email = $1
            "#,
        )
        .bind(email.as_ref())
        .fetch_optional(executor)
        .await
    }
}

#[async_trait]
impl SubscriptionStore for PgPool {
    async fn upsert(&self, record: &SubscriptionRecord) -> anyhow::Result<()> {
        ProUsersRepo::upsert(self, record)
            .await
            .context("Failed to upsert pro user record")
    }
}
