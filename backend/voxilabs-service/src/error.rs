/// Error types for the VOXILABS service
///
/// Every failure a handler can surface is an [`AppError`]. Each variant maps
/// to one HTTP status and one stable code from `error_types::error_codes`.
/// Internal details (database, upstream, disk) are logged here and never
/// reach the client.
use actix_web::{error::ResponseError, http::StatusCode, HttpResponse};
use error_types::{error_codes, ErrorResponse};
use std::fmt;
use thiserror::Error;

/// Result type for service operations
pub type Result<T> = std::result::Result<T, AppError>;

/// Why a generation attempt ended without a stored video
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GenerationFailure {
    /// Provider answered with an empty body
    NoData,
    /// Provider answered with something that is not a video container
    UnexpectedFormat(String),
    /// Transport error, timeout or non-2xx status
    Upstream(String),
    /// Video arrived but could not be written to disk
    Storage(String),
    /// Row was failed by the reconciler while the provider was still working
    Abandoned,
}

impl fmt::Display for GenerationFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GenerationFailure::NoData => write!(f, "no video data received from provider"),
            GenerationFailure::UnexpectedFormat(detail) => {
                write!(f, "unexpected response format from provider: {detail}")
            }
            GenerationFailure::Upstream(detail) => write!(f, "provider request failed: {detail}"),
            GenerationFailure::Storage(detail) => write!(f, "failed to store video: {detail}"),
            GenerationFailure::Abandoned => write!(f, "generation abandoned before completion"),
        }
    }
}

/// Application error types
#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    Validation(String),

    #[error("User already exists with this email")]
    DuplicateEmail,

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Email not verified. A verification code has been sent to your email.")]
    EmailNotVerified { email: String },

    #[error("User not found")]
    UserNotFound,

    #[error("Invalid or expired verification code")]
    InvalidOrExpiredCode,

    #[error("Invalid or expired token")]
    InvalidOrExpiredToken,

    #[error("Prompt is required")]
    MissingPrompt,

    #[error("Authentication required")]
    Unauthenticated,

    #[error("Invalid or expired token")]
    InvalidToken,

    #[error("Session expired or invalid")]
    SessionExpiredOrInvalid,

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("A video generation is already in progress")]
    GenerationInProgress,

    #[error("Failed to generate video")]
    GenerationFailed(GenerationFailure),

    #[error("OAuth error: {0}")]
    OAuth(String),

    #[error("Google OAuth is not configured")]
    OAuthNotConfigured,

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Stable machine-readable code for the `error` field
    pub fn code(&self) -> &'static str {
        match self {
            AppError::Validation(_) => error_codes::VALIDATION_ERROR,
            AppError::DuplicateEmail => error_codes::DUPLICATE_EMAIL,
            AppError::InvalidCredentials => error_codes::INVALID_CREDENTIALS,
            AppError::EmailNotVerified { .. } => error_codes::EMAIL_NOT_VERIFIED,
            AppError::UserNotFound => error_codes::USER_NOT_FOUND,
            AppError::InvalidOrExpiredCode => error_codes::INVALID_OR_EXPIRED_CODE,
            AppError::InvalidOrExpiredToken => error_codes::INVALID_OR_EXPIRED_TOKEN,
            AppError::MissingPrompt => error_codes::MISSING_PROMPT,
            AppError::Unauthenticated => error_codes::UNAUTHENTICATED,
            AppError::InvalidToken => error_codes::INVALID_TOKEN,
            AppError::SessionExpiredOrInvalid => error_codes::SESSION_EXPIRED,
            AppError::NotFound(_) => error_codes::NOT_FOUND,
            AppError::GenerationInProgress => error_codes::GENERATION_IN_PROGRESS,
            AppError::GenerationFailed(_) => error_codes::GENERATION_FAILED,
            AppError::OAuth(_) => error_codes::OAUTH_FAILED,
            AppError::OAuthNotConfigured => error_codes::OAUTH_NOT_CONFIGURED,
            AppError::Storage(_) => error_codes::STORAGE_UNAVAILABLE,
            AppError::Internal(_) => error_codes::INTERNAL_ERROR,
        }
    }

    /// Message safe to show to the client
    pub fn public_message(&self) -> String {
        match self {
            AppError::Storage(_) => "Storage unavailable".to_string(),
            AppError::Internal(_) => "Internal server error".to_string(),
            AppError::OAuth(_) => "Google authentication failed".to_string(),
            other => other.to_string(),
        }
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_)
            | AppError::DuplicateEmail
            | AppError::InvalidCredentials
            | AppError::EmailNotVerified { .. }
            | AppError::UserNotFound
            | AppError::InvalidOrExpiredCode
            | AppError::InvalidOrExpiredToken
            | AppError::MissingPrompt => StatusCode::BAD_REQUEST,
            AppError::Unauthenticated
            | AppError::InvalidToken
            | AppError::SessionExpiredOrInvalid => StatusCode::UNAUTHORIZED,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::GenerationInProgress => StatusCode::CONFLICT,
            AppError::GenerationFailed(_)
            | AppError::OAuth(_)
            | AppError::OAuthNotConfigured
            | AppError::Storage(_)
            | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();

        match self {
            AppError::Storage(detail) => tracing::error!(error = %detail, "storage failure"),
            AppError::Internal(detail) => tracing::error!(error = %detail, "internal failure"),
            AppError::OAuth(detail) => tracing::error!(error = %detail, "oauth failure"),
            AppError::GenerationFailed(cause) => {
                tracing::error!(cause = %cause, "video generation failed")
            }
            _ => {}
        }

        let mut body = ErrorResponse::new(status.as_u16(), self.public_message())
            .with_code(self.code());
        if let AppError::EmailNotVerified { email } = self {
            body = body.with_context("email", email.clone());
        }

        HttpResponse::build(status).json(body)
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        AppError::Storage(err.to_string())
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(err: validator::ValidationErrors) -> Self {
        AppError::Validation(err.to_string())
    }
}

impl From<crypto_core::jwt::TokenError> for AppError {
    fn from(err: crypto_core::jwt::TokenError) -> Self {
        AppError::Internal(format!("token signing failed: {err}"))
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Internal(format!("I/O error: {err}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::body::to_bytes;
    use serde_json::Value;

    async fn body_json(err: AppError) -> (StatusCode, Value) {
        let resp = err.error_response();
        let status = resp.status();
        let bytes = to_bytes(resp.into_body()).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[actix_web::test]
    async fn test_email_not_verified_carries_email() {
        let (status, body) = body_json(AppError::EmailNotVerified {
            email: "ada@example.com".into(),
        })
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "EMAIL_NOT_VERIFIED");
        assert_eq!(body["email"], "ada@example.com");
        assert_eq!(body["status"], 400);
    }

    #[actix_web::test]
    async fn test_internal_details_are_hidden() {
        let (status, body) =
            body_json(AppError::Storage("connection refused on 10.0.0.5".into())).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["message"], "Storage unavailable");
        assert!(!body.to_string().contains("10.0.0.5"));

        let (_, body) = body_json(AppError::GenerationFailed(GenerationFailure::Upstream(
            "503 from router".into(),
        )))
        .await;
        assert_eq!(body["message"], "Failed to generate video");
        assert!(!body.to_string().contains("503"));
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(AppError::DuplicateEmail.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(AppError::MissingPrompt.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(AppError::InvalidToken.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            AppError::SessionExpiredOrInvalid.status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(AppError::NotFound("Video").status_code(), StatusCode::NOT_FOUND);
        assert_eq!(AppError::GenerationInProgress.status_code(), StatusCode::CONFLICT);
        assert_eq!(
            AppError::OAuthNotConfigured.status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
