//! Restaurant repository (email configuration and quota ledger columns)

use crate::domain::{EmailSetupUpdate, Restaurant};
use crate::error::{AppError, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::MySqlPool;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RestaurantRepository: Send + Sync {
    async fn find_by_id(&self, id: i64) -> Result<Option<Restaurant>>;

    /// Zero the counter and move the reset instant
    async fn reset_quota(&self, id: i64, reset_at: DateTime<Utc>) -> Result<()>;

    /// Add `count` to the counter in a single statement
    async fn increment_quota(&self, id: i64, count: i64) -> Result<()>;

    /// Apply the provided fields, leaving `None` fields untouched
    async fn update_email_setup(&self, id: i64, update: &EmailSetupUpdate) -> Result<Restaurant>;

    async fn mark_email_verified(&self, id: i64) -> Result<()>;
}

pub struct RestaurantRepositoryImpl {
    pool: MySqlPool,
}

impl RestaurantRepositoryImpl {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RestaurantRepository for RestaurantRepositoryImpl {
    async fn find_by_id(&self, id: i64) -> Result<Option<Restaurant>> {
        let restaurant = sqlx::query_as::<_, Restaurant>(
            r#"
            SELECT id, name, email_provider, email_sender, email_sender_name,
                   sendgrid_sub_key, sendgrid_sub_id, gmail_refresh_token, gmail_email,
                   email_quota_used, email_quota_limit, email_quota_reset_at, email_verified
            FROM restaurants
            WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(restaurant)
    }

    async fn reset_quota(&self, id: i64, reset_at: DateTime<Utc>) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE restaurants
            SET email_quota_used = 0, email_quota_reset_at = ?, updated_at = NOW()
            WHERE id = ?
            "#,
        )
        .bind(reset_at)
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn increment_quota(&self, id: i64, count: i64) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE restaurants
            SET email_quota_used = email_quota_used + ?, updated_at = NOW()
            WHERE id = ?
            "#,
        )
        .bind(count)
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn update_email_setup(&self, id: i64, update: &EmailSetupUpdate) -> Result<Restaurant> {
        let existing = self
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Restaurant {} not found", id)))?;

        let email_provider = update
            .email_provider
            .map(|p| p.as_str().to_string())
            .unwrap_or(existing.email_provider);
        let email_sender = update.email_sender.clone().or(existing.email_sender);
        let email_verified = update.email_verified.unwrap_or(existing.email_verified);
        let email_quota_limit = update.email_quota_limit.unwrap_or(existing.email_quota_limit);
        let sendgrid_sub_key = update.sendgrid_sub_key.clone().or(existing.sendgrid_sub_key);
        let sendgrid_sub_id = update.sendgrid_sub_id.clone().or(existing.sendgrid_sub_id);
        let gmail_refresh_token = update
            .gmail_refresh_token
            .clone()
            .or(existing.gmail_refresh_token);
        let gmail_email = update.gmail_email.clone().or(existing.gmail_email);

        sqlx::query(
            r#"
            UPDATE restaurants
            SET email_provider = ?, email_sender = ?, email_verified = ?, email_quota_limit = ?,
                sendgrid_sub_key = ?, sendgrid_sub_id = ?, gmail_refresh_token = ?, gmail_email = ?,
                updated_at = NOW()
            WHERE id = ?
            "#,
        )
        .bind(&email_provider)
        .bind(&email_sender)
        .bind(email_verified)
        .bind(email_quota_limit)
        .bind(&sendgrid_sub_key)
        .bind(&sendgrid_sub_id)
        .bind(&gmail_refresh_token)
        .bind(&gmail_email)
        .bind(id)
        .execute(&self.pool)
        .await?;

        self.find_by_id(id)
            .await?
            .ok_or_else(|| AppError::Internal(anyhow::anyhow!("Failed to update restaurant")))
    }

    async fn mark_email_verified(&self, id: i64) -> Result<()> {
        let result = sqlx::query(
            "UPDATE restaurants SET email_verified = TRUE, updated_at = NOW() WHERE id = ?",
        )
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Restaurant {} not found", id)));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockall::predicate::*;

    #[tokio::test]
    async fn test_mock_restaurant_repository() {
        let mut mock = MockRestaurantRepository::new();

        let restaurant = Restaurant::new(7, "Le Zinc");
        let restaurant_clone = restaurant.clone();

        mock.expect_find_by_id()
            .with(eq(7))
            .returning(move |_| Ok(Some(restaurant_clone.clone())));
        mock.expect_find_by_id().with(eq(8)).returning(|_| Ok(None));

        assert_eq!(mock.find_by_id(7).await.unwrap().unwrap().name, "Le Zinc");
        assert!(mock.find_by_id(8).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_mock_increment_quota() {
        let mut mock = MockRestaurantRepository::new();
        mock.expect_increment_quota()
            .with(eq(7), eq(3))
            .times(1)
            .returning(|_, _| Ok(()));

        mock.increment_quota(7, 3).await.unwrap();
    }
}
