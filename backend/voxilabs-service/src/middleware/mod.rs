mod session_auth;

pub use session_auth::{bearer_token, SessionAuth, SessionAuthService};
