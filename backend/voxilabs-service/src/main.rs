/// VOXILABS Service - HTTP Server
///
/// Accounts, sessions, text-to-video generation and dashboards.
use actix_cors::Cors;
use actix_middleware::{CorrelationIdMiddleware, Logging};
use actix_web::{http::header, web, App, HttpServer};
use anyhow::Context;
use crypto_core::jwt::JwtKeys;
use db_pool::{create_pool, DbConfig};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::prelude::*;
use voxilabs_service::config::{Config, DatabaseSettings};
use voxilabs_service::db::Repositories;
use voxilabs_service::handlers::videos::VIDEO_ID_HEADER;
use voxilabs_service::services::reconciler::spawn_reconciler;
use voxilabs_service::services::{GoogleOAuthClient, HuggingFaceClient, SmtpMailer, VideoStorage};
use voxilabs_service::{routes, AppDeps, AppState};

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "voxilabs_service=info,actix_web=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().json().with_current_span(true))
        .init();

    let config = Config::from_env().context("Failed to load configuration")?;
    info!(
        host = %config.server.host,
        port = config.server.port,
        client_url = %config.server.client_url,
        "Starting VOXILABS service"
    );

    let repos = build_repositories(&config.database).await?;

    let jwt = JwtKeys::from_secret(&config.jwt.secret, config.jwt.expiry_seconds)
        .context("Failed to initialize JWT keys")?;
    let mailer = SmtpMailer::new(&config.email).context("Failed to initialize mailer")?;
    let provider =
        HuggingFaceClient::new(&config.inference).context("Failed to initialize inference client")?;
    let oauth = GoogleOAuthClient::from_settings(&config.oauth);

    let storage = VideoStorage::new(config.storage.video_dir.clone(), &config.storage.public_prefix);
    storage
        .ensure_root()
        .await
        .context("Failed to prepare video storage")?;

    let reconciler = spawn_reconciler(repos.clone(), config.reconcile.clone());

    let state = web::Data::new(AppState::new(
        AppDeps {
            repos,
            jwt,
            mailer: Arc::new(mailer),
            provider: Arc::new(provider),
            storage,
            oauth,
        },
        &config.auth,
        &config.server.client_url,
    ));

    let bind_address = (config.server.host.clone(), config.server.port);
    let allowed_origins = config.server.allowed_origins.clone();
    let video_dir = config.storage.video_dir.clone();
    let json_limit = config.server.json_limit_bytes;

    HttpServer::new(move || {
        let cors = allowed_origins
            .iter()
            .fold(Cors::default(), |cors, origin| cors.allowed_origin(origin))
            .allow_any_method()
            .allow_any_header()
            .supports_credentials()
            .expose_headers(vec![
                header::CONTENT_LENGTH,
                header::CONTENT_TYPE,
                header::CONTENT_DISPOSITION,
                header::HeaderName::from_static(VIDEO_ID_HEADER),
            ])
            .max_age(3600);

        App::new()
            .app_data(state.clone())
            .wrap(Logging)
            .wrap(CorrelationIdMiddleware)
            .wrap(cors)
            .configure(routes(video_dir.clone(), json_limit))
    })
    .bind(bind_address)
    .context("Failed to bind HTTP server")?
    .run()
    .await
    .context("HTTP server error")?;

    reconciler.abort();
    info!("VOXILABS service stopped");
    Ok(())
}

async fn build_repositories(settings: &DatabaseSettings) -> anyhow::Result<Repositories> {
    if settings.is_in_memory() {
        warn!("DATABASE_URL is memory://; data will not survive a restart");
        return Ok(Repositories::in_memory());
    }

    let db_config = DbConfig::new("voxilabs-service", settings.url.clone())
        .with_pool_size(settings.max_connections, settings.min_connections)
        .with_acquire_timeout(settings.acquire_timeout_secs);
    db_config.log_config();

    let pool = create_pool(db_config)
        .await
        .context("Failed to connect to database")?;

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .context("Failed to run database migrations")?;
    info!("Database migrations applied");

    Ok(Repositories::postgres(pool))
}
