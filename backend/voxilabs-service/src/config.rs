//! Configuration management for the VOXILABS service
//!
//! Loads settings from environment variables, after reading a `.env` file
//! in debug builds. Only `JWT_SECRET` is required; everything else has a
//! development default.

use anyhow::{bail, Context, Result};
use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use tracing::info;

/// Application settings
#[derive(Debug, Clone)]
pub struct Config {
    pub server: ServerSettings,
    pub database: DatabaseSettings,
    pub jwt: JwtSettings,
    pub auth: AuthSettings,
    pub email: EmailSettings,
    pub inference: InferenceSettings,
    pub oauth: OAuthSettings,
    pub storage: StorageSettings,
    pub reconcile: ReconcileSettings,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        // Load .env file in development
        if cfg!(debug_assertions) {
            dotenvy::dotenv().ok();
            info!("Loaded .env file for development");
        }

        let server = ServerSettings::from_env()?;
        let auth = AuthSettings::from_env(&server.client_url)?;
        let inference = InferenceSettings::from_env()?;
        let reconcile = ReconcileSettings::from_env()?;
        check_stale_window(inference.timeout_secs, reconcile.stale_after_secs)?;

        Ok(Config {
            database: DatabaseSettings::from_env()?,
            jwt: JwtSettings::from_env()?,
            email: EmailSettings::from_env()?,
            oauth: OAuthSettings::from_env(),
            storage: StorageSettings::from_env(),
            inference,
            reconcile,
            auth,
            server,
        })
    }
}

/// Read `key`, falling back to `default`, and parse it.
fn env_or<T>(key: &str, default: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    env::var(key)
        .unwrap_or_else(|_| default.to_string())
        .parse()
        .with_context(|| format!("Invalid {key}"))
}

fn env_opt(key: &str) -> Option<String> {
    env::var(key).ok().map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

/// HTTP server settings
#[derive(Debug, Clone)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    /// Front-end origin, used for CORS and OAuth redirects
    pub client_url: String,
    pub allowed_origins: Vec<String>,
    pub json_limit_bytes: usize,
}

impl ServerSettings {
    fn from_env() -> Result<Self> {
        let client_url = env::var("CLIENT_URL")
            .unwrap_or_else(|_| "http://localhost:3000".to_string())
            .trim_end_matches('/')
            .to_string();
        let allowed_origins = parse_origins(
            &env::var("CORS_ALLOWED_ORIGINS").unwrap_or_default(),
            &client_url,
        );

        Ok(Self {
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: env_or("PORT", "5000")?,
            client_url,
            allowed_origins,
            json_limit_bytes: env_or("JSON_LIMIT_BYTES", "1048576")?,
        })
    }
}

/// Comma-separated origins; the client URL is always allowed.
pub fn parse_origins(raw: &str, client_url: &str) -> Vec<String> {
    let mut origins: Vec<String> = raw
        .split(',')
        .map(|o| o.trim().trim_end_matches('/').to_string())
        .filter(|o| !o.is_empty())
        .collect();
    if !origins.iter().any(|o| o == client_url) {
        origins.insert(0, client_url.to_string());
    }
    origins
}

/// Database connection settings
#[derive(Debug, Clone)]
pub struct DatabaseSettings {
    /// `postgres://…`, or `memory://` for the in-memory store
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub acquire_timeout_secs: u64,
}

impl DatabaseSettings {
    fn from_env() -> Result<Self> {
        Ok(Self {
            url: env::var("DATABASE_URL").unwrap_or_else(|_| "memory://".to_string()),
            max_connections: env_or("DATABASE_MAX_CONNECTIONS", "10")?,
            min_connections: env_or("DATABASE_MIN_CONNECTIONS", "2")?,
            acquire_timeout_secs: env_or("DATABASE_ACQUIRE_TIMEOUT", "10")?,
        })
    }

    pub fn is_in_memory(&self) -> bool {
        self.url.starts_with("memory://")
    }
}

/// Token signing settings
#[derive(Clone)]
pub struct JwtSettings {
    pub secret: String,
    pub expiry_seconds: i64,
}

impl std::fmt::Debug for JwtSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtSettings")
            .field("secret", &"[REDACTED]")
            .field("expiry_seconds", &self.expiry_seconds)
            .finish()
    }
}

impl JwtSettings {
    fn from_env() -> Result<Self> {
        let secret = env::var("JWT_SECRET").context("JWT_SECRET must be set")?;
        if secret.len() < crypto_core::jwt::MIN_SECRET_LEN {
            bail!(
                "JWT_SECRET must be at least {} bytes",
                crypto_core::jwt::MIN_SECRET_LEN
            );
        }

        Ok(Self {
            secret,
            expiry_seconds: env_or(
                "JWT_EXPIRY_SECONDS",
                &crypto_core::jwt::DEFAULT_TOKEN_TTL_SECS.to_string(),
            )?,
        })
    }
}

/// OTP and password-reset settings
#[derive(Debug, Clone)]
pub struct AuthSettings {
    pub otp_ttl_secs: i64,
    /// Page the emailed reset link points to; `?token=` is appended
    pub password_reset_url: String,
}

impl AuthSettings {
    fn from_env(client_url: &str) -> Result<Self> {
        Ok(Self {
            otp_ttl_secs: env_or("OTP_TTL_SECS", "600")?,
            password_reset_url: env::var("PASSWORD_RESET_URL")
                .unwrap_or_else(|_| format!("{client_url}/reset-password")),
        })
    }
}

/// Outbound email settings. An empty host selects no-op mode.
#[derive(Clone)]
pub struct EmailSettings {
    pub smtp_host: String,
    pub smtp_port: u16,
    pub smtp_username: Option<String>,
    pub smtp_password: Option<String>,
    pub smtp_from: String,
    pub use_starttls: bool,
}

impl std::fmt::Debug for EmailSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmailSettings")
            .field("smtp_host", &self.smtp_host)
            .field("smtp_port", &self.smtp_port)
            .field("smtp_username", &self.smtp_username)
            .field("smtp_password", &self.smtp_password.as_ref().map(|_| "[REDACTED]"))
            .field("smtp_from", &self.smtp_from)
            .field("use_starttls", &self.use_starttls)
            .finish()
    }
}

impl EmailSettings {
    fn from_env() -> Result<Self> {
        Ok(Self {
            smtp_host: env::var("SMTP_HOST").unwrap_or_default(),
            smtp_port: env_or("SMTP_PORT", "587")?,
            smtp_username: env_opt("SMTP_USERNAME"),
            smtp_password: env_opt("SMTP_PASSWORD"),
            smtp_from: env::var("SMTP_FROM")
                .unwrap_or_else(|_| "VOXILABS <no-reply@voxilabs.local>".to_string()),
            use_starttls: env_or("SMTP_USE_STARTTLS", "true")?,
        })
    }
}

/// Text-to-video provider settings
#[derive(Clone)]
pub struct InferenceSettings {
    pub api_token: Option<String>,
    pub base_url: String,
    pub model: String,
    pub timeout_secs: u64,
}

impl std::fmt::Debug for InferenceSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InferenceSettings")
            .field("api_token", &self.api_token.as_ref().map(|_| "[REDACTED]"))
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl InferenceSettings {
    fn from_env() -> Result<Self> {
        Ok(Self {
            api_token: env_opt("HF_TOKEN"),
            base_url: env::var("INFERENCE_BASE_URL")
                .unwrap_or_else(|_| "https://router.huggingface.co/hf-inference".to_string())
                .trim_end_matches('/')
                .to_string(),
            model: env::var("INFERENCE_MODEL")
                .unwrap_or_else(|_| "Wan-AI/Wan2.1-T2V-14B".to_string()),
            timeout_secs: env_or("INFERENCE_TIMEOUT_SECS", "600")?,
        })
    }
}

/// Google OAuth settings. OAuth is disabled unless id, secret and redirect are all set.
#[derive(Clone)]
pub struct OAuthSettings {
    pub google_client_id: Option<String>,
    pub google_client_secret: Option<String>,
    pub google_redirect_uri: Option<String>,
    pub google_auth_url: String,
    pub google_token_url: String,
    pub google_userinfo_url: String,
}

impl std::fmt::Debug for OAuthSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OAuthSettings")
            .field("google_client_id", &self.google_client_id)
            .field(
                "google_client_secret",
                &self.google_client_secret.as_ref().map(|_| "[REDACTED]"),
            )
            .field("google_redirect_uri", &self.google_redirect_uri)
            .finish_non_exhaustive()
    }
}

impl OAuthSettings {
    fn from_env() -> Self {
        Self {
            google_client_id: env_opt("GOOGLE_CLIENT_ID"),
            google_client_secret: env_opt("GOOGLE_CLIENT_SECRET"),
            google_redirect_uri: env_opt("GOOGLE_REDIRECT_URI"),
            google_auth_url: env::var("GOOGLE_AUTH_URL")
                .unwrap_or_else(|_| "https://accounts.google.com/o/oauth2/v2/auth".to_string()),
            google_token_url: env::var("GOOGLE_TOKEN_URL")
                .unwrap_or_else(|_| "https://oauth2.googleapis.com/token".to_string()),
            google_userinfo_url: env::var("GOOGLE_USERINFO_URL")
                .unwrap_or_else(|_| "https://www.googleapis.com/oauth2/v2/userinfo".to_string()),
        }
    }
}

/// Generated video storage
#[derive(Debug, Clone)]
pub struct StorageSettings {
    pub video_dir: PathBuf,
    /// URL path the directory is served under
    pub public_prefix: String,
}

impl StorageSettings {
    fn from_env() -> Self {
        Self {
            video_dir: PathBuf::from(
                env::var("VIDEO_STORAGE_DIR").unwrap_or_else(|_| "./public/videos".to_string()),
            ),
            public_prefix: "/videos".to_string(),
        }
    }
}

/// Background reconciler cadence
#[derive(Debug, Clone)]
pub struct ReconcileSettings {
    pub interval_secs: u64,
    pub stale_after_secs: i64,
}

impl ReconcileSettings {
    fn from_env() -> Result<Self> {
        Ok(Self {
            interval_secs: env_or("RECONCILE_INTERVAL_SECS", "300")?,
            stale_after_secs: env_or("STALE_GENERATION_SECS", "1800")?,
        })
    }
}

/// A generation still inside its provider timeout must never look stale.
fn check_stale_window(inference_timeout_secs: u64, stale_after_secs: i64) -> Result<()> {
    let timeout = i64::try_from(inference_timeout_secs).unwrap_or(i64::MAX);
    if stale_after_secs <= timeout {
        bail!(
            "STALE_GENERATION_SECS ({stale_after_secs}) must be greater than \
             INFERENCE_TIMEOUT_SECS ({inference_timeout_secs})"
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_url_always_allowed() {
        let origins = parse_origins("https://app.voxilabs.io, ", "http://localhost:3000");
        assert_eq!(
            origins,
            vec![
                "http://localhost:3000".to_string(),
                "https://app.voxilabs.io".to_string()
            ]
        );
    }

    #[test]
    fn test_duplicate_client_origin_not_repeated() {
        let origins = parse_origins("http://localhost:3000/", "http://localhost:3000");
        assert_eq!(origins, vec!["http://localhost:3000".to_string()]);
    }

    #[test]
    fn test_memory_url_detection() {
        let settings = DatabaseSettings {
            url: "memory://".into(),
            max_connections: 1,
            min_connections: 0,
            acquire_timeout_secs: 1,
        };
        assert!(settings.is_in_memory());
    }

    #[test]
    fn test_stale_threshold_must_outlast_inference_timeout() {
        assert!(check_stale_window(600, 1800).is_ok());
        assert!(check_stale_window(600, 600).is_err());
        assert!(check_stale_window(900, 300).is_err());
    }

    #[test]
    fn test_secrets_are_redacted_in_debug() {
        let jwt = JwtSettings {
            secret: "super-secret-value-that-is-long-enough".into(),
            expiry_seconds: 60,
        };
        assert!(!format!("{jwt:?}").contains("super-secret"));
    }
}
