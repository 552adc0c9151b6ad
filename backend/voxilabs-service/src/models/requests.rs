//! Request and response bodies of the HTTP API
//!
//! Request bodies are validated with `validator` at the handler boundary.
//! Emails are trimmed and lower-cased before validation.

use super::PublicUser;
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

pub const OTP_LEN: usize = 6;

/// Canonical form used for every email lookup and insert
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn validate_otp(otp: &str) -> Result<(), ValidationError> {
    if otp.len() == OTP_LEN && otp.bytes().all(|b| b.is_ascii_digit()) {
        Ok(())
    } else {
        Err(ValidationError::new("otp_format"))
    }
}

fn validate_not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        Err(ValidationError::new("blank"))
    } else {
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    #[validate(
        length(min = 1, max = 100, message = "First name is required"),
        custom(function = "validate_not_blank")
    )]
    pub first_name: String,
    #[validate(
        length(min = 1, max = 100, message = "Last name is required"),
        custom(function = "validate_not_blank")
    )]
    pub last_name: String,
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 8, max = 128, message = "Password must be between 8 and 128 characters"))]
    pub password: String,
    #[validate(length(max = 32))]
    pub phone: Option<String>,
}

impl RegisterRequest {
    pub fn normalized(mut self) -> Self {
        self.email = normalize_email(&self.email);
        self.first_name = self.first_name.trim().to_string();
        self.last_name = self.last_name.trim().to_string();
        self.phone = self
            .phone
            .map(|p| p.trim().to_string())
            .filter(|p| !p.is_empty());
        self
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 1, max = 128))]
    pub password: String,
}

impl LoginRequest {
    pub fn normalized(mut self) -> Self {
        self.email = normalize_email(&self.email);
        self
    }
}

/// Body of `verify-email` and `verify-login-otp`
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct VerifyOtpRequest {
    #[validate(email)]
    pub email: String,
    #[validate(custom(function = "validate_otp", message = "OTP must be exactly 6 digits"))]
    pub otp: String,
}

impl VerifyOtpRequest {
    pub fn normalized(mut self) -> Self {
        self.email = normalize_email(&self.email);
        self.otp = self.otp.trim().to_string();
        self
    }
}

/// Body of `resend-otp` and `forgot-password`
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct EmailRequest {
    #[validate(email)]
    pub email: String,
}

impl EmailRequest {
    pub fn normalized(mut self) -> Self {
        self.email = normalize_email(&self.email);
        self
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ResetPasswordRequest {
    #[validate(length(min = 1, max = 256))]
    pub token: String,
    #[validate(length(min = 8, max = 128, message = "Password must be between 8 and 128 characters"))]
    pub new_password: String,
}

/// Blank strings are dropped by [`UpdateProfileRequest::normalized`], so a
/// client cannot blank out a name.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProfileRequest {
    #[validate(length(min = 1, max = 100))]
    pub first_name: Option<String>,
    #[validate(length(min = 1, max = 100))]
    pub last_name: Option<String>,
    #[validate(length(max = 32))]
    pub phone: Option<String>,
    #[validate(url)]
    pub image: Option<String>,
}

impl UpdateProfileRequest {
    pub fn normalized(self) -> Self {
        let clean = |v: Option<String>| v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty());
        Self {
            first_name: clean(self.first_name),
            last_name: clean(self.last_name),
            phone: clean(self.phone),
            image: clean(self.image),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct GoogleCallbackRequest {
    pub code: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GoogleCallbackQuery {
    pub code: Option<String>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GenerateVideoRequest {
    #[serde(default)]
    pub prompt: String,
    pub title: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProjectsParams {
    pub search: Option<String>,
    pub sort: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    pub message: String,
    pub email: String,
}

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub message: String,
    pub token: String,
    pub user: PublicUser,
}

#[derive(Debug, Serialize)]
pub struct OAuthResponse {
    pub success: bool,
    pub message: String,
    pub token: String,
    pub user: PublicUser,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthUrlResponse {
    pub auth_url: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn register(password: &str, email: &str) -> RegisterRequest {
        RegisterRequest {
            first_name: " Ada ".into(),
            last_name: "Lovelace".into(),
            email: email.into(),
            password: password.into(),
            phone: Some("  ".into()),
        }
    }

    #[test]
    fn test_register_normalization() {
        let req = register("correct horse", "  Ada@Example.COM ").normalized();
        assert_eq!(req.email, "ada@example.com");
        assert_eq!(req.first_name, "Ada");
        assert_eq!(req.phone, None);
        assert!(req.validate().is_ok());
    }

    #[test]
    fn test_register_rejects_short_password_and_bad_email() {
        assert!(register("short", "ada@example.com").validate().is_err());
        assert!(register("long enough", "not-an-email").validate().is_err());
    }

    #[test]
    fn test_blank_names_rejected() {
        let mut req = register("long enough", "ada@example.com");
        req.first_name = "   ".into();
        assert!(req.validate().is_err());
    }

    #[test]
    fn test_otp_must_be_six_digits() {
        let ok = VerifyOtpRequest {
            email: "ada@example.com".into(),
            otp: "012345".into(),
        };
        assert!(ok.validate().is_ok());

        for bad in ["12345", "1234567", "12a456", ""] {
            let req = VerifyOtpRequest {
                email: "ada@example.com".into(),
                otp: bad.into(),
            };
            assert!(req.validate().is_err(), "{bad} should be rejected");
        }
    }

    #[test]
    fn test_profile_update_allows_absent_fields() {
        assert!(UpdateProfileRequest::default().validate().is_ok());

        let blank = UpdateProfileRequest {
            first_name: Some("  ".into()),
            ..Default::default()
        }
        .normalized();
        assert_eq!(blank.first_name, None);

        let bad = UpdateProfileRequest {
            image: Some("not a url".into()),
            ..Default::default()
        };
        assert!(bad.validate().is_err());
    }
}
