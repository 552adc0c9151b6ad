#![allow(dead_code)]

use chrono::Duration;
use crypto_core::jwt::JwtKeys;
use std::sync::Arc;
use tempfile::TempDir;
use voxilabs_service::config::AuthSettings;
use voxilabs_service::db::Repositories;
use voxilabs_service::services::{InferenceError, VideoStorage};
use voxilabs_service::{AppDeps, AppState};

pub use voxilabs_service::services::test_support::{tiny_mp4, RecordingMailer, StubProvider};

pub const JWT_SECRET: &str = "integration-test-secret-0123456789";
pub const PASSWORD: &str = "correct horse battery";

pub fn mp4_provider() -> StubProvider {
    StubProvider::video(tiny_mp4(1000, 3000))
}

pub fn failing_provider() -> StubProvider {
    StubProvider::failing(InferenceError::Upstream("status 503: model loading".into()))
}

pub struct TestContext {
    pub state: actix_web::web::Data<AppState>,
    pub repos: Repositories,
    pub mailer: Arc<RecordingMailer>,
    pub video_dir: TempDir,
}

pub fn context(provider: StubProvider) -> TestContext {
    let repos = Repositories::in_memory();
    let mailer = Arc::new(RecordingMailer::default());
    let video_dir = tempfile::tempdir().unwrap();

    let auth = AuthSettings {
        otp_ttl_secs: Duration::minutes(10).num_seconds(),
        password_reset_url: "http://localhost:3000/reset-password".to_string(),
    };

    let state = AppState::new(
        AppDeps {
            repos: repos.clone(),
            jwt: JwtKeys::from_secret(JWT_SECRET, 3600).unwrap(),
            mailer: mailer.clone(),
            provider: Arc::new(provider),
            storage: VideoStorage::new(video_dir.path(), "/videos"),
            oauth: None,
        },
        &auth,
        "http://localhost:3000",
    );

    TestContext {
        state: actix_web::web::Data::new(state),
        repos,
        mailer,
        video_dir,
    }
}

/// Initialise the full route table over a [`TestContext`]
macro_rules! test_app {
    ($ctx:expr) => {
        actix_web::test::init_service(
            actix_web::App::new()
                .app_data($ctx.state.clone())
                .wrap(actix_middleware::CorrelationIdMiddleware)
                .configure(voxilabs_service::routes(
                    $ctx.video_dir.path().to_path_buf(),
                    1 << 20,
                )),
        )
        .await
    };
}
