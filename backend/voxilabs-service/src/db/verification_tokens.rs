/// Password reset token storage
use super::VerificationTokenRepository;
use crate::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

pub struct PgVerificationTokenRepository {
    pool: PgPool,
}

impl PgVerificationTokenRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl VerificationTokenRepository for PgVerificationTokenRepository {
    async fn replace(
        &self,
        identifier: &str,
        token_hash: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM verification_tokens WHERE identifier = $1")
            .bind(identifier)
            .execute(&mut *tx)
            .await?;

        sqlx::query(
            r#"
            INSERT INTO verification_tokens (token_hash, identifier, expires_at, created_at)
            VALUES ($1, $2, $3, NOW())
            "#,
        )
        .bind(token_hash)
        .bind(identifier)
        .bind(expires_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn consume(&self, token_hash: &str, now: DateTime<Utc>) -> Result<Option<String>> {
        let identifier = sqlx::query_scalar::<_, String>(
            r#"
            DELETE FROM verification_tokens
            WHERE token_hash = $1 AND expires_at > $2
            RETURNING identifier
            "#,
        )
        .bind(token_hash)
        .bind(now)
        .fetch_optional(&self.pool)
        .await?;

        Ok(identifier)
    }

    async fn delete_expired(&self, now: DateTime<Utc>) -> Result<u64> {
        let result = sqlx::query("DELETE FROM verification_tokens WHERE expires_at <= $1")
            .bind(now)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }
}
