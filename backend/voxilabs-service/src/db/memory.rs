/// In-memory implementation of every repository
///
/// All tables share one lock so multi-table operations (user delete
/// cascades, uniqueness checks) are atomic, matching the PostgreSQL
/// semantics closely enough for local runs and tests.
use super::{
    OtpRepository, SessionRepository, UserRepository, VerificationTokenRepository,
    VideoRepository,
};
use crate::error::{AppError, Result};
use crate::models::{
    NewUser, NewVideo, ProfileUpdate, ProjectQuery, ProjectSort, Session, User, Video,
    VideoStatus, VideoTotals,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

#[derive(Debug, Clone)]
struct OtpRecord {
    code_hash: String,
    expires_at: DateTime<Utc>,
    attempts: i32,
}

#[derive(Debug, Clone)]
struct TokenRecord {
    identifier: String,
    expires_at: DateTime<Utc>,
}

#[derive(Default)]
struct Tables {
    users: HashMap<Uuid, User>,
    sessions: HashMap<String, Session>,
    otp_codes: HashMap<String, OtpRecord>,
    verification_tokens: HashMap<String, TokenRecord>,
    videos: HashMap<Uuid, Video>,
}

#[derive(Clone, Default)]
pub struct InMemoryStore {
    tables: Arc<RwLock<Tables>>,
}

#[async_trait]
impl UserRepository for InMemoryStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        let tables = self.tables.read().await;
        Ok(tables.users.values().find(|u| u.email == email).cloned())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>> {
        Ok(self.tables.read().await.users.get(&id).cloned())
    }

    async fn create(&self, new_user: NewUser) -> Result<User> {
        let mut tables = self.tables.write().await;
        if tables.users.values().any(|u| u.email == new_user.email) {
            return Err(AppError::DuplicateEmail);
        }

        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4(),
            first_name: new_user.first_name,
            last_name: new_user.last_name,
            email: new_user.email,
            password_hash: new_user.password_hash,
            phone: new_user.phone,
            image: new_user.image,
            two_factor_secret: new_user.two_factor_secret,
            email_verified_at: new_user.email_verified_at,
            created_at: now,
            updated_at: now,
        };
        tables.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn mark_email_verified(&self, email: &str, at: DateTime<Utc>) -> Result<bool> {
        let mut tables = self.tables.write().await;
        match tables.users.values_mut().find(|u| u.email == email) {
            Some(user) => {
                user.email_verified_at.get_or_insert(at);
                user.updated_at = at;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn update_password(&self, id: Uuid, password_hash: &str) -> Result<bool> {
        let mut tables = self.tables.write().await;
        match tables.users.get_mut(&id) {
            Some(user) => {
                user.password_hash = password_hash.to_string();
                user.updated_at = Utc::now();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn update_profile(&self, id: Uuid, update: &ProfileUpdate) -> Result<Option<User>> {
        let mut tables = self.tables.write().await;
        let Some(user) = tables.users.get_mut(&id) else {
            return Ok(None);
        };

        if let Some(first_name) = &update.first_name {
            user.first_name = first_name.clone();
        }
        if let Some(last_name) = &update.last_name {
            user.last_name = last_name.clone();
        }
        if let Some(phone) = &update.phone {
            user.phone = Some(phone.clone());
        }
        if let Some(image) = &update.image {
            user.image = Some(image.clone());
        }
        user.updated_at = Utc::now();
        Ok(Some(user.clone()))
    }

    async fn delete(&self, id: Uuid) -> Result<bool> {
        let mut tables = self.tables.write().await;
        if tables.users.remove(&id).is_none() {
            return Ok(false);
        }
        tables.sessions.retain(|_, s| s.user_id != id);
        tables.videos.retain(|_, v| v.user_id != id);
        Ok(true)
    }
}

#[async_trait]
impl SessionRepository for InMemoryStore {
    async fn create(
        &self,
        session_token: &str,
        user_id: Uuid,
        expires_at: DateTime<Utc>,
    ) -> Result<Session> {
        let mut tables = self.tables.write().await;
        if !tables.users.contains_key(&user_id) {
            return Err(AppError::Storage(format!(
                "sessions.user_id references missing user {user_id}"
            )));
        }
        if tables.sessions.contains_key(session_token) {
            return Err(AppError::Storage("duplicate session token".to_string()));
        }

        let session = Session {
            session_token: session_token.to_string(),
            user_id,
            expires_at,
            created_at: Utc::now(),
        };
        tables
            .sessions
            .insert(session.session_token.clone(), session.clone());
        Ok(session)
    }

    async fn find_by_token(&self, session_token: &str) -> Result<Option<Session>> {
        Ok(self.tables.read().await.sessions.get(session_token).cloned())
    }

    async fn delete_by_token(&self, session_token: &str) -> Result<bool> {
        Ok(self
            .tables
            .write()
            .await
            .sessions
            .remove(session_token)
            .is_some())
    }

    async fn delete_for_user(&self, user_id: Uuid) -> Result<u64> {
        let mut tables = self.tables.write().await;
        let before = tables.sessions.len();
        tables.sessions.retain(|_, s| s.user_id != user_id);
        Ok((before - tables.sessions.len()) as u64)
    }

    async fn delete_expired(&self, now: DateTime<Utc>) -> Result<u64> {
        let mut tables = self.tables.write().await;
        let before = tables.sessions.len();
        tables.sessions.retain(|_, s| s.expires_at > now);
        Ok((before - tables.sessions.len()) as u64)
    }
}

#[async_trait]
impl OtpRepository for InMemoryStore {
    async fn upsert(&self, email: &str, code_hash: &str, expires_at: DateTime<Utc>) -> Result<()> {
        self.tables.write().await.otp_codes.insert(
            email.to_string(),
            OtpRecord {
                code_hash: code_hash.to_string(),
                expires_at,
                attempts: 0,
            },
        );
        Ok(())
    }

    async fn consume(
        &self,
        email: &str,
        code_hash: &str,
        now: DateTime<Utc>,
        max_attempts: i32,
    ) -> Result<bool> {
        let mut tables = self.tables.write().await;
        let Some(record) = tables
            .otp_codes
            .get_mut(email)
            .filter(|r| r.expires_at > now)
        else {
            return Ok(false);
        };

        if record.code_hash == code_hash && record.attempts < max_attempts {
            tables.otp_codes.remove(email);
            return Ok(true);
        }

        record.attempts += 1;
        if record.attempts >= max_attempts {
            tables.otp_codes.remove(email);
        }
        Ok(false)
    }

    async fn delete_expired(&self, now: DateTime<Utc>) -> Result<u64> {
        let mut tables = self.tables.write().await;
        let before = tables.otp_codes.len();
        tables.otp_codes.retain(|_, r| r.expires_at > now);
        Ok((before - tables.otp_codes.len()) as u64)
    }
}

#[async_trait]
impl VerificationTokenRepository for InMemoryStore {
    async fn replace(
        &self,
        identifier: &str,
        token_hash: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<()> {
        let mut tables = self.tables.write().await;
        tables
            .verification_tokens
            .retain(|_, t| t.identifier != identifier);
        tables.verification_tokens.insert(
            token_hash.to_string(),
            TokenRecord {
                identifier: identifier.to_string(),
                expires_at,
            },
        );
        Ok(())
    }

    async fn consume(&self, token_hash: &str, now: DateTime<Utc>) -> Result<Option<String>> {
        let mut tables = self.tables.write().await;
        let live = tables
            .verification_tokens
            .get(token_hash)
            .is_some_and(|t| t.expires_at > now);
        if !live {
            return Ok(None);
        }
        Ok(tables
            .verification_tokens
            .remove(token_hash)
            .map(|t| t.identifier))
    }

    async fn delete_expired(&self, now: DateTime<Utc>) -> Result<u64> {
        let mut tables = self.tables.write().await;
        let before = tables.verification_tokens.len();
        tables.verification_tokens.retain(|_, t| t.expires_at > now);
        Ok((before - tables.verification_tokens.len()) as u64)
    }
}

fn title_matches(title: &str, search: Option<&str>) -> bool {
    match search.map(str::trim).filter(|s| !s.is_empty()) {
        Some(needle) => title.to_lowercase().contains(&needle.to_lowercase()),
        None => true,
    }
}

#[async_trait]
impl VideoRepository for InMemoryStore {
    async fn create(&self, new_video: NewVideo) -> Result<Video> {
        let mut tables = self.tables.write().await;
        if !tables.users.contains_key(&new_video.user_id) {
            return Err(AppError::Storage(format!(
                "videos.user_id references missing user {}",
                new_video.user_id
            )));
        }

        let video = Video {
            id: Uuid::new_v4(),
            user_id: new_video.user_id,
            title: new_video.title,
            prompt: new_video.prompt,
            status: VideoStatus::Processing.as_str().to_string(),
            url: None,
            duration: 0.0,
            error_message: None,
            created_at: new_video.created_at,
            updated_at: new_video.created_at,
        };
        tables.videos.insert(video.id, video.clone());
        Ok(video)
    }

    async fn mark_completed(&self, id: Uuid, url: &str, duration: f64) -> Result<bool> {
        let mut tables = self.tables.write().await;
        let Some(video) = tables
            .videos
            .get_mut(&id)
            .filter(|v| v.status() == VideoStatus::Processing)
        else {
            return Ok(false);
        };

        video.status = VideoStatus::Completed.as_str().to_string();
        video.url = Some(url.to_string());
        video.duration = duration;
        video.error_message = None;
        video.updated_at = Utc::now();
        Ok(true)
    }

    async fn mark_failed(&self, id: Uuid, reason: &str) -> Result<()> {
        let mut tables = self.tables.write().await;
        if let Some(video) = tables
            .videos
            .get_mut(&id)
            .filter(|v| v.status() == VideoStatus::Processing)
        {
            video.status = VideoStatus::Failed.as_str().to_string();
            video.error_message = Some(reason.to_string());
            video.updated_at = Utc::now();
        }
        Ok(())
    }

    async fn find_for_user(&self, id: Uuid, user_id: Uuid) -> Result<Option<Video>> {
        let tables = self.tables.read().await;
        Ok(tables
            .videos
            .get(&id)
            .filter(|v| v.user_id == user_id)
            .cloned())
    }

    async fn list_for_user(&self, user_id: Uuid, query: &ProjectQuery) -> Result<Vec<Video>> {
        let tables = self.tables.read().await;
        let mut videos: Vec<Video> = tables
            .videos
            .values()
            .filter(|v| v.user_id == user_id && title_matches(&v.title, query.search.as_deref()))
            .cloned()
            .collect();

        match query.sort {
            ProjectSort::Title => videos.sort_by(|a, b| {
                a.title
                    .cmp(&b.title)
                    .then_with(|| b.created_at.cmp(&a.created_at))
            }),
            ProjectSort::Duration => videos.sort_by(|a, b| {
                b.duration
                    .total_cmp(&a.duration)
                    .then_with(|| b.created_at.cmp(&a.created_at))
            }),
            ProjectSort::Date => videos.sort_by(|a, b| b.created_at.cmp(&a.created_at)),
        }
        Ok(videos)
    }

    async fn delete_for_user(&self, id: Uuid, user_id: Uuid) -> Result<Option<Video>> {
        let mut tables = self.tables.write().await;
        let owned = tables.videos.get(&id).is_some_and(|v| v.user_id == user_id);
        if !owned {
            return Ok(None);
        }
        Ok(tables.videos.remove(&id))
    }

    async fn totals_for_user(
        &self,
        user_id: Uuid,
        month_start: DateTime<Utc>,
        month_end: DateTime<Utc>,
    ) -> Result<VideoTotals> {
        let tables = self.tables.read().await;
        let mut totals = VideoTotals {
            total_videos: 0,
            monthly_videos: 0,
            total_duration: 0.0,
        };
        for video in tables.videos.values().filter(|v| v.user_id == user_id) {
            totals.total_videos += 1;
            totals.total_duration += video.duration;
            if video.created_at >= month_start && video.created_at <= month_end {
                totals.monthly_videos += 1;
            }
        }
        Ok(totals)
    }

    async fn fail_stale(&self, created_before: DateTime<Utc>, reason: &str) -> Result<u64> {
        let mut tables = self.tables.write().await;
        let now = Utc::now();
        let mut count = 0;
        for video in tables.videos.values_mut().filter(|v| {
            v.status() == VideoStatus::Processing && v.created_at < created_before
        }) {
            video.status = VideoStatus::Failed.as_str().to_string();
            video.error_message = Some(reason.to_string());
            video.updated_at = now;
            count += 1;
        }
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn new_user(email: &str) -> NewUser {
        NewUser {
            first_name: "Ada".into(),
            last_name: "Lovelace".into(),
            email: email.into(),
            password_hash: "hash".into(),
            phone: None,
            image: None,
            two_factor_secret: None,
            email_verified_at: None,
        }
    }

    #[tokio::test]
    async fn test_duplicate_email_rejected() {
        let store = InMemoryStore::default();
        UserRepository::create(&store, new_user("ada@example.com"))
            .await
            .unwrap();
        let err = UserRepository::create(&store, new_user("ada@example.com"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::DuplicateEmail));
    }

    #[tokio::test]
    async fn test_user_delete_cascades() {
        let store = InMemoryStore::default();
        let user = UserRepository::create(&store, new_user("ada@example.com"))
            .await
            .unwrap();
        SessionRepository::create(&store, "tok", user.id, Utc::now() + Duration::days(1))
            .await
            .unwrap();
        VideoRepository::create(
            &store,
            NewVideo {
                user_id: user.id,
                title: "t".into(),
                prompt: "p".into(),
                created_at: Utc::now(),
            },
        )
        .await
        .unwrap();

        assert!(UserRepository::delete(&store, user.id).await.unwrap());
        assert!(store.find_by_token("tok").await.unwrap().is_none());
        let remaining = store
            .list_for_user(user.id, &ProjectQuery::default())
            .await
            .unwrap();
        assert!(remaining.is_empty());
    }

    #[tokio::test]
    async fn test_terminal_status_is_not_overwritten() {
        let store = InMemoryStore::default();
        let user = UserRepository::create(&store, new_user("ada@example.com"))
            .await
            .unwrap();
        let video = VideoRepository::create(
            &store,
            NewVideo {
                user_id: user.id,
                title: "t".into(),
                prompt: "p".into(),
                created_at: Utc::now(),
            },
        )
        .await
        .unwrap();

        store.mark_failed(video.id, "boom").await.unwrap();
        assert!(!store.mark_completed(video.id, "/videos/x.mp4", 5.0).await.unwrap());

        let video = store.find_for_user(video.id, user.id).await.unwrap().unwrap();
        assert_eq!(video.status(), VideoStatus::Failed);
        assert_eq!(video.url, None);
    }

    #[tokio::test]
    async fn test_verification_token_single_use() {
        let store = InMemoryStore::default();
        let now = Utc::now();
        store
            .replace("ada@example.com", "h1", now + Duration::hours(1))
            .await
            .unwrap();
        store
            .replace("ada@example.com", "h2", now + Duration::hours(1))
            .await
            .unwrap();

        // the earlier token was dropped when the second was issued
        assert_eq!(VerificationTokenRepository::consume(&store, "h1", now).await.unwrap(), None);
        assert_eq!(
            VerificationTokenRepository::consume(&store, "h2", now).await.unwrap(),
            Some("ada@example.com".to_string())
        );
        assert_eq!(VerificationTokenRepository::consume(&store, "h2", now).await.unwrap(), None);
    }
}
