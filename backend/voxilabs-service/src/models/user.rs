use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

/// `users` row
#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub password_hash: String,
    pub phone: Option<String>,
    pub image: Option<String>,
    pub two_factor_secret: Option<String>,
    pub email_verified_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn is_verified(&self) -> bool {
        self.email_verified_at.is_some()
    }
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub password_hash: String,
    pub phone: Option<String>,
    pub image: Option<String>,
    pub two_factor_secret: Option<String>,
    pub email_verified_at: Option<DateTime<Utc>>,
}

/// Fields a user may change on their own profile. `None` leaves a field as is.
#[derive(Debug, Clone, Default)]
pub struct ProfileUpdate {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone: Option<String>,
    pub image: Option<String>,
}

/// The user projection returned to clients. Never carries credentials.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PublicUser {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub image: Option<String>,
    pub email_verified: bool,
}

impl From<&User> for PublicUser {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            email: user.email.clone(),
            phone: user.phone.clone(),
            image: user.image.clone(),
            email_verified: user.is_verified(),
        }
    }
}

/// Identity attached to a request once both the token signature and the
/// session row have been checked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedUser {
    pub user_id: Uuid,
    pub email: String,
}

/// `sessions` row. The token string is the primary key.
#[derive(Debug, Clone, FromRow)]
pub struct Session {
    pub session_token: String,
    pub user_id: Uuid,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl Session {
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_public_projection_has_no_credentials() {
        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4(),
            first_name: "Ada".into(),
            last_name: "Lovelace".into(),
            email: "ada@example.com".into(),
            password_hash: "$argon2id$secret".into(),
            phone: None,
            image: None,
            two_factor_secret: Some("totp-seed".into()),
            email_verified_at: Some(now),
            created_at: now,
            updated_at: now,
        };

        let json = serde_json::to_string(&PublicUser::from(&user)).unwrap();
        assert!(json.contains("\"firstName\":\"Ada\""));
        assert!(json.contains("\"emailVerified\":true"));
        assert!(!json.contains("argon2"));
        assert!(!json.contains("totp-seed"));
    }
}
