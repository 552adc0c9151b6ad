//! HTTP error response body shared by VOXILABS services
//!
//! Every non-2xx JSON response has the same shape:
//!
//! ```json
//! { "message": "Invalid credentials", "error": "INVALID_CREDENTIALS", "status": 400 }
//! ```
//!
//! Extra context keys (for example `email`) are flattened into the top level.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Standard HTTP error response format
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ErrorResponse {
    /// Human-readable error message
    pub message: String,

    /// Stable machine-readable code, see [`error_codes`]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    /// HTTP status code
    pub status: u16,

    #[serde(flatten)]
    pub context: Map<String, Value>,
}

impl ErrorResponse {
    pub fn new(status: u16, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            error: None,
            status,
            context: Map::new(),
        }
    }

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.error = Some(code.into());
        self
    }

    /// Add a top-level context field.
    pub fn with_context(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.context.insert(key.into(), value.into());
        self
    }
}

/// Error codes carried in the `error` field
pub mod error_codes {
    pub const VALIDATION_ERROR: &str = "VALIDATION_ERROR";
    pub const DUPLICATE_EMAIL: &str = "DUPLICATE_EMAIL";
    pub const INVALID_CREDENTIALS: &str = "INVALID_CREDENTIALS";
    pub const EMAIL_NOT_VERIFIED: &str = "EMAIL_NOT_VERIFIED";
    pub const USER_NOT_FOUND: &str = "USER_NOT_FOUND";
    pub const INVALID_OR_EXPIRED_CODE: &str = "INVALID_OR_EXPIRED_CODE";
    pub const INVALID_OR_EXPIRED_TOKEN: &str = "INVALID_OR_EXPIRED_TOKEN";
    pub const MISSING_PROMPT: &str = "MISSING_PROMPT";
    pub const UNAUTHENTICATED: &str = "UNAUTHENTICATED";
    pub const INVALID_TOKEN: &str = "INVALID_TOKEN";
    pub const SESSION_EXPIRED: &str = "SESSION_EXPIRED";
    pub const NOT_FOUND: &str = "NOT_FOUND";
    pub const GENERATION_IN_PROGRESS: &str = "GENERATION_IN_PROGRESS";
    pub const GENERATION_FAILED: &str = "GENERATION_FAILED";
    pub const OAUTH_FAILED: &str = "OAUTH_FAILED";
    pub const OAUTH_NOT_CONFIGURED: &str = "OAUTH_NOT_CONFIGURED";
    pub const STORAGE_UNAVAILABLE: &str = "STORAGE_UNAVAILABLE";
    pub const INTERNAL_ERROR: &str = "INTERNAL_ERROR";
}
