/// Session token signing for VOXILABS services
///
/// Tokens are HS256 JWTs signed with a shared secret. The keys are an owned
/// value (`JwtKeys`) built once at startup and handed to whoever needs them,
/// so tests can run several independent key sets side by side.
///
/// A signature check alone never authenticates a request: the service also
/// requires a live session row for the exact token string. Every token
/// carries a random `jti` so two tokens issued in the same second differ.
///
/// ## Usage
///
/// ```rust
/// use crypto_core::jwt::JwtKeys;
/// use uuid::Uuid;
///
/// let keys = JwtKeys::from_secret("0123456789abcdef0123456789abcdef", 3600).unwrap();
/// let issued = keys.issue(Uuid::new_v4(), "ada@example.com").unwrap();
/// let claims = keys.verify(&issued.token).unwrap();
/// assert_eq!(claims.email, "ada@example.com");
/// ```
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ============================================================================
// Constants
// ============================================================================

/// Default token lifetime, matching the 30-day session lifetime.
pub const DEFAULT_TOKEN_TTL_SECS: i64 = 30 * 24 * 60 * 60;

/// Shortest accepted signing secret, in bytes.
pub const MIN_SECRET_LEN: usize = 32;

const JWT_ALGORITHM: Algorithm = Algorithm::HS256;

// ============================================================================
// Data Structures
// ============================================================================

/// JWT Claims structure
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Claims {
    /// Subject (user ID as UUID string)
    pub sub: String,
    /// Email address
    pub email: String,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
    /// Unique token id
    pub jti: String,
}

impl Claims {
    pub fn user_id(&self) -> Result<Uuid, TokenError> {
        Uuid::parse_str(&self.sub).map_err(|_| TokenError::Invalid)
    }
}

/// A freshly signed token and the instant it stops verifying.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum TokenError {
    #[error("token is malformed or its signature does not match")]
    Invalid,
    #[error("token has expired")]
    Expired,
    #[error("signing secret must be at least {MIN_SECRET_LEN} bytes")]
    WeakSecret,
    #[error("failed to sign token: {0}")]
    Signing(String),
}

// ============================================================================
// Keys
// ============================================================================

#[derive(Clone)]
pub struct JwtKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
}

impl std::fmt::Debug for JwtKeys {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtKeys")
            .field("algorithm", &JWT_ALGORITHM)
            .field("ttl_secs", &self.ttl.num_seconds())
            .finish_non_exhaustive()
    }
}

impl JwtKeys {
    /// Build signing keys from a shared secret.
    ///
    /// `ttl_secs` must be positive; non-positive values fall back to
    /// [`DEFAULT_TOKEN_TTL_SECS`].
    pub fn from_secret(secret: &str, ttl_secs: i64) -> Result<Self, TokenError> {
        if secret.len() < MIN_SECRET_LEN {
            return Err(TokenError::WeakSecret);
        }
        let ttl_secs = if ttl_secs > 0 {
            ttl_secs
        } else {
            DEFAULT_TOKEN_TTL_SECS
        };

        Ok(Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            ttl: Duration::seconds(ttl_secs),
        })
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Sign a token for `user_id`.
    pub fn issue(&self, user_id: Uuid, email: &str) -> Result<IssuedToken, TokenError> {
        let now = Utc::now();
        let expires_at = now + self.ttl;

        let claims = Claims {
            sub: user_id.to_string(),
            email: email.to_string(),
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
            jti: Uuid::new_v4().to_string(),
        };

        let token = self.sign(&claims)?;
        Ok(IssuedToken { token, expires_at })
    }

    fn sign(&self, claims: &Claims) -> Result<String, TokenError> {
        encode(&Header::new(JWT_ALGORITHM), claims, &self.encoding)
            .map_err(|e| TokenError::Signing(e.to_string()))
    }

    /// Check signature and expiry and return the claims.
    pub fn verify(&self, token: &str) -> Result<Claims, TokenError> {
        let mut validation = Validation::new(JWT_ALGORITHM);
        validation.validate_exp = true;
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "sub"]);

        decode::<Claims>(token, &self.decoding, &validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => TokenError::Expired,
                _ => TokenError::Invalid,
            })
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    const TEST_SECRET: &str = "test-secret-that-is-long-enough-for-hs256";

    fn keys() -> JwtKeys {
        JwtKeys::from_secret(TEST_SECRET, 3600).unwrap()
    }

    #[test]
    fn test_issue_and_verify() {
        let user_id = Uuid::new_v4();
        let issued = keys().issue(user_id, "ada@example.com").unwrap();

        let claims = keys().verify(&issued.token).unwrap();
        assert_eq!(claims.user_id().unwrap(), user_id);
        assert_eq!(claims.email, "ada@example.com");
        assert_eq!(claims.exp - claims.iat, 3600);
        assert_eq!(claims.exp, issued.expires_at.timestamp());
    }

    #[test]
    fn test_tokens_are_unique_within_the_same_second() {
        let user_id = Uuid::new_v4();
        let keys = keys();
        let first = keys.issue(user_id, "ada@example.com").unwrap();
        let second = keys.issue(user_id, "ada@example.com").unwrap();
        assert_ne!(first.token, second.token);
    }

    #[test]
    fn test_wrong_secret_is_invalid() {
        let issued = keys().issue(Uuid::new_v4(), "ada@example.com").unwrap();
        let other = JwtKeys::from_secret("another-secret-that-is-long-enough!!", 3600).unwrap();
        assert_eq!(other.verify(&issued.token), Err(TokenError::Invalid));
    }

    #[test]
    fn test_expired_token() {
        let keys = keys();
        let now = Utc::now().timestamp();
        let claims = Claims {
            sub: Uuid::new_v4().to_string(),
            email: "ada@example.com".into(),
            iat: now - 7200,
            exp: now - 3600,
            jti: Uuid::new_v4().to_string(),
        };
        let token = keys.sign(&claims).unwrap();
        assert_eq!(keys.verify(&token), Err(TokenError::Expired));
    }

    #[test]
    fn test_garbage_and_tampered_tokens() {
        let keys = keys();
        assert_eq!(keys.verify("not-a-jwt"), Err(TokenError::Invalid));

        let issued = keys.issue(Uuid::new_v4(), "ada@example.com").unwrap();
        let mut tampered = issued.token.clone();
        tampered.push('x');
        assert_eq!(keys.verify(&tampered), Err(TokenError::Invalid));
    }

    #[test]
    fn test_short_secret_rejected() {
        assert_eq!(
            JwtKeys::from_secret("short", 3600).unwrap_err(),
            TokenError::WeakSecret
        );
    }

    #[test]
    fn test_non_positive_ttl_uses_default() {
        let keys = JwtKeys::from_secret(TEST_SECRET, 0).unwrap();
        assert_eq!(keys.ttl().num_seconds(), DEFAULT_TOKEN_TTL_SECS);
    }
}
