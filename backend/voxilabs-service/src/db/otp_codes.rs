/// OTP code storage, one live code per email
use super::OtpRepository;
use crate::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

pub struct PgOtpRepository {
    pool: PgPool,
}

impl PgOtpRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl OtpRepository for PgOtpRepository {
    async fn upsert(&self, email: &str, code_hash: &str, expires_at: DateTime<Utc>) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO otp_codes (email, code_hash, expires_at, attempts, created_at)
            VALUES ($1, $2, $3, 0, NOW())
            ON CONFLICT (email)
            DO UPDATE SET code_hash = EXCLUDED.code_hash,
                          expires_at = EXCLUDED.expires_at,
                          attempts = 0,
                          created_at = EXCLUDED.created_at
            "#,
        )
        .bind(email)
        .bind(code_hash)
        .bind(expires_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn consume(
        &self,
        email: &str,
        code_hash: &str,
        now: DateTime<Utc>,
        max_attempts: i32,
    ) -> Result<bool> {
        // single statement so two concurrent verifications cannot both succeed
        let consumed = sqlx::query(
            r#"
            DELETE FROM otp_codes
            WHERE email = $1 AND code_hash = $2 AND expires_at > $3 AND attempts < $4
            "#,
        )
        .bind(email)
        .bind(code_hash)
        .bind(now)
        .bind(max_attempts)
        .execute(&self.pool)
        .await?;

        if consumed.rows_affected() > 0 {
            return Ok(true);
        }

        sqlx::query(
            r#"
            UPDATE otp_codes
            SET attempts = attempts + 1
            WHERE email = $1 AND expires_at > $2
            "#,
        )
        .bind(email)
        .bind(now)
        .execute(&self.pool)
        .await?;

        sqlx::query("DELETE FROM otp_codes WHERE email = $1 AND attempts >= $2")
            .bind(email)
            .bind(max_attempts)
            .execute(&self.pool)
            .await?;

        Ok(false)
    }

    async fn delete_expired(&self, now: DateTime<Utc>) -> Result<u64> {
        let result = sqlx::query("DELETE FROM otp_codes WHERE expires_at <= $1")
            .bind(now)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }
}
