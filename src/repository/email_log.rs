//! Email log repository (append-only)

use crate::domain::{CreateEmailLogInput, EmailLog};
use crate::error::Result;
use async_trait::async_trait;
use sqlx::MySqlPool;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait EmailLogRepository: Send + Sync {
    async fn create(&self, input: &CreateEmailLogInput) -> Result<()>;

    /// Most recent entries first
    async fn list_by_restaurant(&self, restaurant_id: i64, limit: i64) -> Result<Vec<EmailLog>>;
}

pub struct EmailLogRepositoryImpl {
    pool: MySqlPool,
}

impl EmailLogRepositoryImpl {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl EmailLogRepository for EmailLogRepositoryImpl {
    async fn create(&self, input: &CreateEmailLogInput) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO email_logs (restaurant_id, provider, recipient, subject, status, error, created_at)
            VALUES (?, ?, ?, ?, ?, ?, NOW())
            "#,
        )
        .bind(input.restaurant_id)
        .bind(&input.provider)
        .bind(&input.recipient)
        .bind(&input.subject)
        .bind(input.status.as_str())
        .bind(&input.error)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn list_by_restaurant(&self, restaurant_id: i64, limit: i64) -> Result<Vec<EmailLog>> {
        let logs = sqlx::query_as::<_, EmailLog>(
            r#"
            SELECT id, restaurant_id, provider, recipient, subject, status, error, created_at
            FROM email_logs
            WHERE restaurant_id = ?
            ORDER BY created_at DESC, id DESC
            LIMIT ?
            "#,
        )
        .bind(restaurant_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(logs)
    }
}
