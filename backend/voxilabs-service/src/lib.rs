/// VOXILABS service library
///
/// Accounts with email verification and Google sign-in, server-side
/// sessions behind bearer tokens, text-to-video generation through a hosted
/// inference provider, and per-user dashboards.
pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod security;
pub mod services;

pub use config::Config;
pub use error::{AppError, Result};

use actix_web::web;
use chrono::Duration;
use crypto_core::jwt::JwtKeys;
use std::path::PathBuf;
use std::sync::Arc;

use crate::config::AuthSettings;
use crate::db::Repositories;
use crate::middleware::SessionAuth;
use crate::services::{
    AuthService, DashboardService, GoogleOAuthClient, InferenceProvider, Mailer, OtpService,
    VideoService, VideoStorage,
};

/// Everything `AppState` is assembled from
pub struct AppDeps {
    pub repos: Repositories,
    pub jwt: JwtKeys,
    pub mailer: Arc<dyn Mailer>,
    pub provider: Arc<dyn InferenceProvider>,
    pub storage: VideoStorage,
    pub oauth: Option<GoogleOAuthClient>,
}

/// Shared handler state, registered once as `web::Data<AppState>`
#[derive(Clone)]
pub struct AppState {
    pub auth: AuthService,
    pub videos: VideoService,
    pub dashboard: DashboardService,
    pub oauth: Option<GoogleOAuthClient>,
    /// Front-end origin for OAuth redirects
    pub client_url: String,
}

impl AppState {
    pub fn new(deps: AppDeps, auth: &AuthSettings, client_url: &str) -> Self {
        let otp = OtpService::new(
            deps.repos.otp_codes.clone(),
            Duration::seconds(auth.otp_ttl_secs),
        );

        Self {
            auth: AuthService::new(
                deps.repos.clone(),
                deps.jwt,
                otp,
                deps.mailer,
                auth.password_reset_url.clone(),
            ),
            videos: VideoService::new(deps.repos.videos.clone(), deps.provider, deps.storage),
            dashboard: DashboardService::new(deps.repos.videos.clone()),
            oauth: deps.oauth,
            client_url: client_url.trim_end_matches('/').to_string(),
        }
    }
}

/// Route table. `/api/auth` is registered ahead of the session-protected
/// `/api` scope so its public endpoints stay reachable.
pub fn routes(video_dir: PathBuf, json_limit: usize) -> impl FnOnce(&mut web::ServiceConfig) {
    move |cfg: &mut web::ServiceConfig| {
        cfg.app_data(
            web::JsonConfig::default()
                .limit(json_limit)
                .error_handler(|err, _req| AppError::Validation(err.to_string()).into()),
        )
        .route("/health", web::get().to(handlers::health::health))
        .service(actix_files::Files::new("/videos", video_dir))
        .service(
            web::scope("/api/auth")
                .route("/register", web::post().to(handlers::auth::register))
                .route("/verify-email", web::post().to(handlers::auth::verify_email))
                .route("/login", web::post().to(handlers::auth::login))
                .route(
                    "/verify-login-otp",
                    web::post().to(handlers::auth::verify_login_otp),
                )
                .route("/resend-otp", web::post().to(handlers::auth::resend_otp))
                .route("/logout", web::post().to(handlers::auth::logout))
                .route(
                    "/forgot-password",
                    web::post().to(handlers::auth::forgot_password),
                )
                .route(
                    "/reset-password",
                    web::post().to(handlers::auth::reset_password),
                )
                .route(
                    "/google",
                    web::get().to(handlers::oauth::authorization_url),
                )
                .route(
                    "/google/callback",
                    web::get().to(handlers::oauth::callback_redirect),
                )
                .route(
                    "/google/callback",
                    web::post().to(handlers::oauth::callback_json),
                )
                .service(
                    web::resource("/me")
                        .wrap(SessionAuth)
                        .route(web::get().to(handlers::auth::me))
                        .route(web::put().to(handlers::auth::update_me))
                        .route(web::delete().to(handlers::auth::delete_me)),
                ),
        )
        .service(
            web::scope("/api")
                .wrap(SessionAuth)
                .route("/generate-video", web::post().to(handlers::videos::generate))
                .route("/videos", web::get().to(handlers::videos::list))
                .route("/videos/{id}", web::get().to(handlers::videos::get))
                .route("/videos/{id}", web::delete().to(handlers::videos::delete))
                .route("/dashboard/stats", web::get().to(handlers::dashboard::stats))
                .route(
                    "/dashboard/projects",
                    web::get().to(handlers::dashboard::projects),
                ),
        );
    }
}
