/// Account lifecycle: registration, verification, login, sessions, password reset
///
/// A bearer token is only ever honoured while its session row exists, so
/// logout and password reset revoke tokens that would still verify
/// cryptographically.
use crate::db::Repositories;
use crate::error::{AppError, Result};
use crate::models::{
    normalize_email, AuthenticatedUser, NewUser, ProfileUpdate, PublicUser, RegisterRequest, User,
};
use crate::security::{hash_password, unusable_password_hash, verify_password};
use crate::services::email::{mask_email, password_reset_email, verification_code_email, Mailer};
use crate::services::oauth::GoogleProfile;
use crate::services::otp::OtpService;
use chrono::{Duration, Utc};
use crypto_core::hash::sha256_hex;
use crypto_core::jwt::JwtKeys;
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Lifetime of a session row
pub const SESSION_TTL_DAYS: i64 = 30;

const RESET_TOKEN_LEN: usize = 32;
const RESET_TOKEN_TTL_HOURS: i64 = 1;

/// A freshly issued token and the user it belongs to
#[derive(Debug, Clone)]
pub struct SignedIn {
    pub token: String,
    pub user: PublicUser,
}

#[derive(Clone)]
pub struct AuthService {
    repos: Repositories,
    jwt: JwtKeys,
    otp: OtpService,
    mailer: Arc<dyn Mailer>,
    password_reset_url: String,
}

impl AuthService {
    pub fn new(
        repos: Repositories,
        jwt: JwtKeys,
        otp: OtpService,
        mailer: Arc<dyn Mailer>,
        password_reset_url: impl Into<String>,
    ) -> Self {
        Self {
            repos,
            jwt,
            otp,
            mailer,
            password_reset_url: password_reset_url.into(),
        }
    }

    /// Create an unverified account and email it a verification code.
    /// Returns the normalized email.
    pub async fn register(&self, req: RegisterRequest) -> Result<String> {
        let req = req.normalized();

        if self.repos.users.find_by_email(&req.email).await?.is_some() {
            return Err(AppError::DuplicateEmail);
        }

        let password_hash = hash_password(&req.password)?;
        let user = self
            .repos
            .users
            .create(NewUser {
                first_name: req.first_name,
                last_name: req.last_name,
                email: req.email,
                password_hash,
                phone: req.phone,
                image: None,
                two_factor_secret: None,
                email_verified_at: None,
            })
            .await?;

        self.send_verification_code(&user).await?;

        info!(user_id = %user.id, email = %mask_email(&user.email), "User registered");
        Ok(user.email)
    }

    pub async fn verify_email(&self, email: &str, code: &str) -> Result<()> {
        let email = normalize_email(email);

        if !self.otp.verify(&email, code).await? {
            return Err(AppError::InvalidOrExpiredCode);
        }
        if !self
            .repos
            .users
            .mark_email_verified(&email, Utc::now())
            .await?
        {
            return Err(AppError::UserNotFound);
        }

        info!(email = %mask_email(&email), "Email verified");
        Ok(())
    }

    /// Password login. Unverified accounts get a fresh code and no session.
    pub async fn login(&self, email: &str, password: &str) -> Result<SignedIn> {
        let email = normalize_email(email);

        let Some(user) = self.repos.users.find_by_email(&email).await? else {
            debug!(email = %mask_email(&email), "Login for unknown email");
            return Err(AppError::InvalidCredentials);
        };

        // Unverified accounts never get a session, whatever the password
        if !user.is_verified() {
            self.send_verification_code(&user).await?;
            return Err(AppError::EmailNotVerified { email: user.email });
        }

        if !verify_password(password, &user.password_hash)? {
            debug!(user_id = %user.id, "Login with wrong password");
            return Err(AppError::InvalidCredentials);
        }

        self.start_session(&user).await
    }

    /// Passwordless login with an emailed code. Also proves control of the
    /// address, so an unverified account becomes verified.
    pub async fn verify_login_otp(&self, email: &str, code: &str) -> Result<SignedIn> {
        let email = normalize_email(email);

        let Some(mut user) = self.repos.users.find_by_email(&email).await? else {
            return Err(AppError::UserNotFound);
        };

        if !self.otp.verify(&email, code).await? {
            return Err(AppError::InvalidOrExpiredCode);
        }

        if !user.is_verified() {
            let now = Utc::now();
            self.repos.users.mark_email_verified(&email, now).await?;
            user.email_verified_at = Some(now);
        }

        self.start_session(&user).await
    }

    pub async fn resend_otp(&self, email: &str) -> Result<()> {
        let email = normalize_email(email);

        let Some(user) = self.repos.users.find_by_email(&email).await? else {
            return Err(AppError::UserNotFound);
        };

        self.send_verification_code(&user).await
    }

    /// Delete the session for `token`. Absent or unknown tokens are a no-op.
    pub async fn logout(&self, token: Option<&str>) -> Result<()> {
        if let Some(token) = token {
            if self.repos.sessions.delete_by_token(token).await? {
                debug!("Session revoked on logout");
            }
        }
        Ok(())
    }

    pub async fn forgot_password(&self, email: &str) -> Result<()> {
        let email = normalize_email(email);

        let Some(user) = self.repos.users.find_by_email(&email).await? else {
            return Err(AppError::UserNotFound);
        };

        let raw_token = crypto_core::random_alphanumeric(RESET_TOKEN_LEN);
        let expires_at = Utc::now() + Duration::hours(RESET_TOKEN_TTL_HOURS);
        self.repos
            .verification_tokens
            .replace(&user.email, &sha256_hex(&raw_token), expires_at)
            .await?;

        let link = self.reset_link(&raw_token);
        self.mailer
            .send(password_reset_email(&user.email, &user.first_name, &link))
            .await?;

        info!(user_id = %user.id, "Password reset requested");
        Ok(())
    }

    /// Consume a reset token, set the new password and revoke every session.
    pub async fn reset_password(&self, token: &str, new_password: &str) -> Result<()> {
        let identifier = self
            .repos
            .verification_tokens
            .consume(&sha256_hex(token.trim()), Utc::now())
            .await?
            .ok_or(AppError::InvalidOrExpiredToken)?;

        let Some(user) = self.repos.users.find_by_email(&identifier).await? else {
            return Err(AppError::UserNotFound);
        };

        let password_hash = hash_password(new_password)?;
        self.repos
            .users
            .update_password(user.id, &password_hash)
            .await?;
        let revoked = self.repos.sessions.delete_for_user(user.id).await?;

        info!(user_id = %user.id, revoked_sessions = revoked, "Password reset completed");
        Ok(())
    }

    /// Resolve a bearer token to a user: signature and expiry first, then
    /// the session row for exactly this token.
    pub async fn authenticate(&self, token: &str) -> Result<AuthenticatedUser> {
        let claims = self.jwt.verify(token).map_err(|e| {
            debug!(error = %e, "Bearer token rejected");
            AppError::InvalidToken
        })?;
        let user_id = claims.user_id().map_err(|_| AppError::InvalidToken)?;

        let session = self
            .repos
            .sessions
            .find_by_token(token)
            .await?
            .ok_or(AppError::SessionExpiredOrInvalid)?;

        if session.user_id != user_id {
            warn!(%user_id, "Session row belongs to a different user");
            return Err(AppError::SessionExpiredOrInvalid);
        }

        if session.is_expired_at(Utc::now()) {
            self.repos.sessions.delete_by_token(token).await?;
            return Err(AppError::SessionExpiredOrInvalid);
        }

        Ok(AuthenticatedUser {
            user_id,
            email: claims.email,
        })
    }

    pub async fn current_user(&self, user_id: Uuid) -> Result<PublicUser> {
        self.repos
            .users
            .find_by_id(user_id)
            .await?
            .map(|u| PublicUser::from(&u))
            .ok_or(AppError::UserNotFound)
    }

    pub async fn update_profile(&self, user_id: Uuid, update: ProfileUpdate) -> Result<PublicUser> {
        self.repos
            .users
            .update_profile(user_id, &update)
            .await?
            .map(|u| PublicUser::from(&u))
            .ok_or(AppError::UserNotFound)
    }

    /// Remove the account. Sessions and video rows go with it.
    pub async fn delete_account(&self, user_id: Uuid) -> Result<()> {
        if !self.repos.users.delete(user_id).await? {
            return Err(AppError::UserNotFound);
        }
        info!(%user_id, "Account deleted");
        Ok(())
    }

    /// Find or create the account for a Google profile and open a session.
    pub async fn sign_in_with_google(&self, profile: &GoogleProfile) -> Result<SignedIn> {
        let email = normalize_email(&profile.email);
        if email.is_empty() {
            return Err(AppError::OAuth("Google profile has no email".to_string()));
        }
        if !profile.verified_email {
            return Err(AppError::OAuth("Google email is not verified".to_string()));
        }

        let user = match self.repos.users.find_by_email(&email).await? {
            Some(mut user) => {
                if !user.is_verified() {
                    let now = Utc::now();
                    self.repos.users.mark_email_verified(&email, now).await?;
                    user.email_verified_at = Some(now);
                }
                user
            }
            None => self.create_oauth_user(&email, profile).await?,
        };

        self.start_session(&user).await
    }

    async fn create_oauth_user(&self, email: &str, profile: &GoogleProfile) -> Result<User> {
        let first_name = profile
            .given_name
            .clone()
            .or_else(|| profile.name.clone())
            .unwrap_or_default();

        let created = self
            .repos
            .users
            .create(NewUser {
                first_name,
                last_name: profile.family_name.clone().unwrap_or_default(),
                email: email.to_string(),
                password_hash: unusable_password_hash()?,
                phone: None,
                image: profile.picture.clone(),
                two_factor_secret: None,
                email_verified_at: Some(Utc::now()),
            })
            .await;

        match created {
            Ok(user) => {
                info!(user_id = %user.id, "User created from Google sign-in");
                Ok(user)
            }
            // lost a race with a concurrent sign-in for the same address
            Err(AppError::DuplicateEmail) => self
                .repos
                .users
                .find_by_email(email)
                .await?
                .ok_or(AppError::UserNotFound),
            Err(e) => Err(e),
        }
    }

    async fn start_session(&self, user: &User) -> Result<SignedIn> {
        let issued = self.jwt.issue(user.id, &user.email)?;
        let expires_at = Utc::now() + Duration::days(SESSION_TTL_DAYS);

        self.repos
            .sessions
            .create(&issued.token, user.id, expires_at)
            .await?;

        info!(user_id = %user.id, "Session started");
        Ok(SignedIn {
            token: issued.token,
            user: PublicUser::from(user),
        })
    }

    async fn send_verification_code(&self, user: &User) -> Result<()> {
        let code = self.otp.issue(&user.email).await?;
        self.mailer
            .send(verification_code_email(
                &user.email,
                &user.first_name,
                &code,
                self.otp.ttl_minutes(),
            ))
            .await
    }

    fn reset_link(&self, raw_token: &str) -> String {
        let separator = if self.password_reset_url.contains('?') {
            '&'
        } else {
            '?'
        };
        format!(
            "{}{}token={}",
            self.password_reset_url,
            separator,
            urlencoding::encode(raw_token)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::test_support::{extract_code, extract_reset_token, RecordingMailer};

    const SECRET: &str = "unit-test-secret-0123456789abcdef";

    struct Fixture {
        auth: AuthService,
        repos: Repositories,
        mailer: Arc<RecordingMailer>,
    }

    fn fixture() -> Fixture {
        let repos = Repositories::in_memory();
        let mailer = Arc::new(RecordingMailer::default());
        let auth = AuthService::new(
            repos.clone(),
            JwtKeys::from_secret(SECRET, 3600).unwrap(),
            OtpService::new(repos.otp_codes.clone(), Duration::minutes(10)),
            mailer.clone(),
            "http://localhost:3000/reset-password",
        );
        Fixture {
            auth,
            repos,
            mailer,
        }
    }

    fn register_request(email: &str) -> RegisterRequest {
        RegisterRequest {
            first_name: "Ada".into(),
            last_name: "Lovelace".into(),
            email: email.into(),
            password: "analytical-engine".into(),
            phone: None,
        }
    }

    async fn registered_and_verified(f: &Fixture, email: &str) {
        f.auth.register(register_request(email)).await.unwrap();
        let code = extract_code(&f.mailer.last_to(email).unwrap()).unwrap();
        f.auth.verify_email(email, &code).await.unwrap();
    }

    #[tokio::test]
    async fn test_register_twice_is_duplicate() {
        let f = fixture();
        f.auth
            .register(register_request("ada@example.com"))
            .await
            .unwrap();
        let err = f
            .auth
            .register(register_request("ADA@example.com "))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::DuplicateEmail));
    }

    #[tokio::test]
    async fn test_unverified_login_sends_new_code_and_issues_no_session() {
        let f = fixture();
        f.auth
            .register(register_request("ada@example.com"))
            .await
            .unwrap();
        assert_eq!(f.mailer.count_to("ada@example.com"), 1);

        let err = f
            .auth
            .login("ada@example.com", "analytical-engine")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::EmailNotVerified { ref email } if email == "ada@example.com"));
        assert_eq!(f.mailer.count_to("ada@example.com"), 2);

        let err = f
            .auth
            .login("ada@example.com", "wrong-password")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::EmailNotVerified { .. }));
        assert_eq!(f.mailer.count_to("ada@example.com"), 3);

        let user = f
            .repos
            .users
            .find_by_email("ada@example.com")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(f.repos.sessions.delete_for_user(user.id).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_wrong_password_and_unknown_email_look_the_same() {
        let f = fixture();
        registered_and_verified(&f, "ada@example.com").await;

        let wrong = f.auth.login("ada@example.com", "nope-nope").await.unwrap_err();
        let unknown = f.auth.login("bob@example.com", "nope-nope").await.unwrap_err();
        assert_eq!(wrong.to_string(), unknown.to_string());
        assert!(matches!(wrong, AppError::InvalidCredentials));
        assert!(matches!(unknown, AppError::InvalidCredentials));
    }

    #[tokio::test]
    async fn test_verified_login_then_logout_revokes_token() {
        let f = fixture();
        registered_and_verified(&f, "ada@example.com").await;

        let signed_in = f
            .auth
            .login("ada@example.com", "analytical-engine")
            .await
            .unwrap();
        assert!(signed_in.user.email_verified);

        let who = f.auth.authenticate(&signed_in.token).await.unwrap();
        assert_eq!(who.user_id, signed_in.user.id);

        f.auth.logout(Some(&signed_in.token)).await.unwrap();
        let err = f.auth.authenticate(&signed_in.token).await.unwrap_err();
        assert!(matches!(err, AppError::SessionExpiredOrInvalid));

        // logging out again, or without a token, is still fine
        f.auth.logout(Some(&signed_in.token)).await.unwrap();
        f.auth.logout(None).await.unwrap();
    }

    #[tokio::test]
    async fn test_expired_session_row_is_rejected_and_deleted() {
        let f = fixture();
        registered_and_verified(&f, "ada@example.com").await;
        let user = f
            .repos
            .users
            .find_by_email("ada@example.com")
            .await
            .unwrap()
            .unwrap();

        let jwt = JwtKeys::from_secret(SECRET, 3600).unwrap();
        let token = jwt.issue(user.id, &user.email).unwrap().token;
        f.repos
            .sessions
            .create(&token, user.id, Utc::now() - Duration::seconds(1))
            .await
            .unwrap();

        let err = f.auth.authenticate(&token).await.unwrap_err();
        assert!(matches!(err, AppError::SessionExpiredOrInvalid));
        assert!(f.repos.sessions.find_by_token(&token).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_valid_signature_without_session_is_rejected() {
        let f = fixture();
        let jwt = JwtKeys::from_secret(SECRET, 3600).unwrap();
        let token = jwt.issue(Uuid::new_v4(), "ghost@example.com").unwrap().token;

        let err = f.auth.authenticate(&token).await.unwrap_err();
        assert!(matches!(err, AppError::SessionExpiredOrInvalid));

        let err = f.auth.authenticate("garbage").await.unwrap_err();
        assert!(matches!(err, AppError::InvalidToken));
    }

    #[tokio::test]
    async fn test_verify_email_code_is_single_use() {
        let f = fixture();
        f.auth
            .register(register_request("ada@example.com"))
            .await
            .unwrap();
        let code = extract_code(&f.mailer.last_to("ada@example.com").unwrap()).unwrap();

        f.auth.verify_email("ada@example.com", &code).await.unwrap();
        let err = f
            .auth
            .verify_email("ada@example.com", &code)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidOrExpiredCode));
    }

    #[tokio::test]
    async fn test_login_otp_verifies_and_signs_in() {
        let f = fixture();
        f.auth
            .register(register_request("ada@example.com"))
            .await
            .unwrap();
        f.auth.resend_otp("ada@example.com").await.unwrap();
        let code = extract_code(&f.mailer.last_to("ada@example.com").unwrap()).unwrap();

        let signed_in = f
            .auth
            .verify_login_otp("ada@example.com", &code)
            .await
            .unwrap();
        assert!(signed_in.user.email_verified);
        assert!(f.auth.authenticate(&signed_in.token).await.is_ok());
    }

    #[tokio::test]
    async fn test_unknown_email_paths() {
        let f = fixture();
        assert!(matches!(
            f.auth.resend_otp("nobody@example.com").await.unwrap_err(),
            AppError::UserNotFound
        ));
        assert!(matches!(
            f.auth.forgot_password("nobody@example.com").await.unwrap_err(),
            AppError::UserNotFound
        ));
        assert!(matches!(
            f.auth
                .verify_login_otp("nobody@example.com", "123456")
                .await
                .unwrap_err(),
            AppError::UserNotFound
        ));
    }

    #[tokio::test]
    async fn test_password_reset_flow_revokes_sessions() {
        let f = fixture();
        registered_and_verified(&f, "ada@example.com").await;
        let old_session = f
            .auth
            .login("ada@example.com", "analytical-engine")
            .await
            .unwrap();

        f.auth.forgot_password("ada@example.com").await.unwrap();
        let token = extract_reset_token(&f.mailer.last_to("ada@example.com").unwrap()).unwrap();

        f.auth
            .reset_password(&token, "difference-engine")
            .await
            .unwrap();

        assert!(f.auth.authenticate(&old_session.token).await.is_err());
        assert!(f
            .auth
            .login("ada@example.com", "analytical-engine")
            .await
            .is_err());
        assert!(f
            .auth
            .login("ada@example.com", "difference-engine")
            .await
            .is_ok());

        let err = f
            .auth
            .reset_password(&token, "another-password")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidOrExpiredToken));
    }

    #[tokio::test]
    async fn test_google_sign_in_creates_verified_user_once() {
        let f = fixture();
        let profile = GoogleProfile {
            email: "Grace@Example.com".into(),
            verified_email: true,
            name: Some("Grace Hopper".into()),
            given_name: Some("Grace".into()),
            family_name: Some("Hopper".into()),
            picture: Some("https://example.com/grace.png".into()),
        };

        let first = f.auth.sign_in_with_google(&profile).await.unwrap();
        let second = f.auth.sign_in_with_google(&profile).await.unwrap();

        assert_eq!(first.user.id, second.user.id);
        assert_eq!(first.user.email, "grace@example.com");
        assert!(first.user.email_verified);
        assert_ne!(first.token, second.token);

        // the random password hash never matches an empty or guessed password
        assert!(f.auth.login("grace@example.com", "").await.is_err());
    }

    #[tokio::test]
    async fn test_profile_update_and_delete() {
        let f = fixture();
        registered_and_verified(&f, "ada@example.com").await;
        let signed_in = f
            .auth
            .login("ada@example.com", "analytical-engine")
            .await
            .unwrap();

        let updated = f
            .auth
            .update_profile(
                signed_in.user.id,
                ProfileUpdate {
                    first_name: Some("Augusta".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.first_name, "Augusta");
        assert_eq!(updated.last_name, "Lovelace");

        f.auth.delete_account(signed_in.user.id).await.unwrap();
        assert!(f.auth.authenticate(&signed_in.token).await.is_err());
        assert!(matches!(
            f.auth.current_user(signed_in.user.id).await.unwrap_err(),
            AppError::UserNotFound
        ));
    }
}
