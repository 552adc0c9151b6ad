/// One-time verification codes
///
/// A code is six random digits. Only its SHA-256 digest is stored, keyed by
/// email, so issuing a new code replaces the previous one. Verification
/// consumes the row; a code verifies at most once. After
/// [`MAX_OTP_ATTEMPTS`] wrong guesses the code is gone and a new one must be
/// requested.
use crate::db::OtpRepository;
use crate::error::Result;
use crate::models::OTP_LEN;
use chrono::{Duration, Utc};
use crypto_core::hash::sha256_hex;
use std::sync::Arc;

pub const MAX_OTP_ATTEMPTS: i32 = 5;

#[derive(Clone)]
pub struct OtpService {
    repo: Arc<dyn OtpRepository>,
    ttl: Duration,
}

impl OtpService {
    pub fn new(repo: Arc<dyn OtpRepository>, ttl: Duration) -> Self {
        Self { repo, ttl }
    }

    pub fn ttl_minutes(&self) -> i64 {
        self.ttl.num_minutes().max(1)
    }

    /// Create a fresh code for `email`, superseding any earlier one.
    pub async fn issue(&self, email: &str) -> Result<String> {
        let code = crypto_core::random_digits(OTP_LEN);
        let expires_at = Utc::now() + self.ttl;
        self.repo
            .upsert(email, &sha256_hex(&code), expires_at)
            .await?;
        Ok(code)
    }

    /// True if `code` is the live code for `email`. Consumes it on success.
    pub async fn verify(&self, email: &str, code: &str) -> Result<bool> {
        self.repo
            .consume(email, &sha256_hex(code.trim()), Utc::now(), MAX_OTP_ATTEMPTS)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::memory::InMemoryStore;

    fn service(ttl: Duration) -> OtpService {
        OtpService::new(Arc::new(InMemoryStore::default()), ttl)
    }

    #[tokio::test]
    async fn test_code_is_six_digits_and_verifies_once() {
        let otp = service(Duration::minutes(10));
        let code = otp.issue("ada@example.com").await.unwrap();
        assert_eq!(code.len(), 6);
        assert!(code.chars().all(|c| c.is_ascii_digit()));

        assert!(otp.verify("ada@example.com", &code).await.unwrap());
        assert!(!otp.verify("ada@example.com", &code).await.unwrap());
    }

    #[tokio::test]
    async fn test_code_is_bound_to_its_email() {
        let otp = service(Duration::minutes(10));
        let code = otp.issue("ada@example.com").await.unwrap();
        assert!(!otp.verify("grace@example.com", &code).await.unwrap());
        assert!(otp.verify("ada@example.com", &code).await.unwrap());
    }

    #[tokio::test]
    async fn test_reissue_supersedes_previous_code() {
        let otp = service(Duration::minutes(10));
        let first = otp.issue("ada@example.com").await.unwrap();
        let second = otp.issue("ada@example.com").await.unwrap();

        if first != second {
            assert!(!otp.verify("ada@example.com", &first).await.unwrap());
        }
        assert!(otp.verify("ada@example.com", &second).await.unwrap());
    }

    #[tokio::test]
    async fn test_code_is_burned_after_too_many_wrong_guesses() {
        let otp = service(Duration::minutes(10));
        let code = otp.issue("ada@example.com").await.unwrap();
        let wrong = if code == "000000" { "111111" } else { "000000" };

        for _ in 0..MAX_OTP_ATTEMPTS {
            assert!(!otp.verify("ada@example.com", wrong).await.unwrap());
        }
        assert!(!otp.verify("ada@example.com", &code).await.unwrap());

        let fresh = otp.issue("ada@example.com").await.unwrap();
        assert!(otp.verify("ada@example.com", &fresh).await.unwrap());
    }

    #[tokio::test]
    async fn test_a_few_wrong_guesses_leave_the_code_usable() {
        let otp = service(Duration::minutes(10));
        let code = otp.issue("ada@example.com").await.unwrap();
        let wrong = if code == "000000" { "111111" } else { "000000" };

        for _ in 0..MAX_OTP_ATTEMPTS - 1 {
            assert!(!otp.verify("ada@example.com", wrong).await.unwrap());
        }
        assert!(otp.verify("ada@example.com", &code).await.unwrap());
    }

    #[tokio::test]
    async fn test_expired_code_fails() {
        let otp = service(Duration::zero());
        let code = otp.issue("ada@example.com").await.unwrap();
        assert!(!otp.verify("ada@example.com", &code).await.unwrap());
    }
}
