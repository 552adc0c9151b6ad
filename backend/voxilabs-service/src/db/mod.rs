//! Persistence for users, sessions, OTP codes, reset tokens and videos
//!
//! Each table sits behind an async repository trait. Production uses the
//! `sqlx` PostgreSQL implementations in the sibling modules. The
//! [`memory::InMemoryStore`] implements every trait at once for local runs
//! (`DATABASE_URL=memory://`) and tests.

pub mod memory;
pub mod otp_codes;
pub mod sessions;
pub mod users;
pub mod verification_tokens;
pub mod videos;

use crate::error::Result;
use crate::models::{
    NewUser, NewVideo, ProfileUpdate, ProjectQuery, Session, User, Video, VideoTotals,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use std::sync::Arc;
use uuid::Uuid;

#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>>;

    /// Fails with `AppError::DuplicateEmail` when the address is taken.
    async fn create(&self, new_user: NewUser) -> Result<User>;

    /// Returns false when no user has this email.
    async fn mark_email_verified(&self, email: &str, at: DateTime<Utc>) -> Result<bool>;

    async fn update_password(&self, id: Uuid, password_hash: &str) -> Result<bool>;

    async fn update_profile(&self, id: Uuid, update: &ProfileUpdate) -> Result<Option<User>>;

    /// Deletes the user together with their sessions and videos.
    async fn delete(&self, id: Uuid) -> Result<bool>;
}

#[async_trait]
pub trait SessionRepository: Send + Sync {
    async fn create(
        &self,
        session_token: &str,
        user_id: Uuid,
        expires_at: DateTime<Utc>,
    ) -> Result<Session>;

    async fn find_by_token(&self, session_token: &str) -> Result<Option<Session>>;

    async fn delete_by_token(&self, session_token: &str) -> Result<bool>;

    async fn delete_for_user(&self, user_id: Uuid) -> Result<u64>;

    async fn delete_expired(&self, now: DateTime<Utc>) -> Result<u64>;
}

#[async_trait]
pub trait OtpRepository: Send + Sync {
    /// Store the code for `email`, replacing any previous one.
    async fn upsert(&self, email: &str, code_hash: &str, expires_at: DateTime<Utc>) -> Result<()>;

    /// Delete the row if it matches and is still live. True when consumed.
    ///
    /// A mismatch counts against the live code; once `max_attempts` wrong
    /// guesses are recorded the code is deleted.
    async fn consume(
        &self,
        email: &str,
        code_hash: &str,
        now: DateTime<Utc>,
        max_attempts: i32,
    ) -> Result<bool>;

    async fn delete_expired(&self, now: DateTime<Utc>) -> Result<u64>;
}

#[async_trait]
pub trait VerificationTokenRepository: Send + Sync {
    /// Store a token for `identifier`, dropping any earlier ones.
    async fn replace(
        &self,
        identifier: &str,
        token_hash: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<()>;

    /// Delete a live token and return its identifier.
    async fn consume(&self, token_hash: &str, now: DateTime<Utc>) -> Result<Option<String>>;

    async fn delete_expired(&self, now: DateTime<Utc>) -> Result<u64>;
}

#[async_trait]
pub trait VideoRepository: Send + Sync {
    /// Insert a row in `processing`.
    async fn create(&self, new_video: NewVideo) -> Result<Video>;

    /// False when the row had already left `processing`.
    async fn mark_completed(&self, id: Uuid, url: &str, duration: f64) -> Result<bool>;

    async fn mark_failed(&self, id: Uuid, reason: &str) -> Result<()>;

    async fn find_for_user(&self, id: Uuid, user_id: Uuid) -> Result<Option<Video>>;

    async fn list_for_user(&self, user_id: Uuid, query: &ProjectQuery) -> Result<Vec<Video>>;

    /// Delete and return the row if `user_id` owns it.
    async fn delete_for_user(&self, id: Uuid, user_id: Uuid) -> Result<Option<Video>>;

    /// Counts with `created_at` in `[month_start, month_end]` for the monthly figure.
    async fn totals_for_user(
        &self,
        user_id: Uuid,
        month_start: DateTime<Utc>,
        month_end: DateTime<Utc>,
    ) -> Result<VideoTotals>;

    /// Mark rows stuck in `processing` since before `created_before` as failed.
    async fn fail_stale(&self, created_before: DateTime<Utc>, reason: &str) -> Result<u64>;
}

/// Every repository the service needs, behind trait objects
#[derive(Clone)]
pub struct Repositories {
    pub users: Arc<dyn UserRepository>,
    pub sessions: Arc<dyn SessionRepository>,
    pub otp_codes: Arc<dyn OtpRepository>,
    pub verification_tokens: Arc<dyn VerificationTokenRepository>,
    pub videos: Arc<dyn VideoRepository>,
}

impl Repositories {
    pub fn postgres(pool: PgPool) -> Self {
        Self {
            users: Arc::new(users::PgUserRepository::new(pool.clone())),
            sessions: Arc::new(sessions::PgSessionRepository::new(pool.clone())),
            otp_codes: Arc::new(otp_codes::PgOtpRepository::new(pool.clone())),
            verification_tokens: Arc::new(
                verification_tokens::PgVerificationTokenRepository::new(pool.clone()),
            ),
            videos: Arc::new(videos::PgVideoRepository::new(pool)),
        }
    }

    pub fn in_memory() -> Self {
        let store = memory::InMemoryStore::default();
        Self {
            users: Arc::new(store.clone()),
            sessions: Arc::new(store.clone()),
            otp_codes: Arc::new(store.clone()),
            verification_tokens: Arc::new(store.clone()),
            videos: Arc::new(store),
        }
    }
}

/// Escape `%`, `_` and `\` so user input matches literally inside `LIKE`.
pub(crate) fn escape_like(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for c in input.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}
