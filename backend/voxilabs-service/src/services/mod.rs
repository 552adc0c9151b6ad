pub mod auth;
pub mod dashboard;
pub mod email;
pub mod inference;
pub mod media_probe;
pub mod oauth;
pub mod otp;
pub mod reconciler;
pub mod storage;
pub mod video;

/// Fakes shared by unit and HTTP tests; enabled by the `test-util` feature
#[cfg(any(test, feature = "test-util"))]
pub mod test_support;

pub use auth::{AuthService, SignedIn, SESSION_TTL_DAYS};
pub use dashboard::DashboardService;
pub use email::{Mailer, OutgoingEmail, SmtpMailer};
pub use inference::{HuggingFaceClient, InferenceError, InferenceOutput, InferenceProvider};
pub use oauth::{GoogleOAuthClient, GoogleProfile};
pub use otp::OtpService;
pub use storage::VideoStorage;
pub use video::{GeneratedVideo, VideoService};
