//! Postgres pool construction
//!
//! A pool is only handed out after a `SELECT 1` round trip succeeds, so a
//! service that starts has a reachable database.

use sqlx::postgres::{PgPool, PgPoolOptions};
use std::fmt;
use std::time::Duration;
use tracing::{error, info};

#[derive(Clone)]
pub struct DbConfig {
    /// Label used in log lines
    pub service_name: String,
    pub database_url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    /// Wait for a free connection before giving up
    pub acquire_timeout: Duration,
    pub idle_timeout: Duration,
    /// Connections are recycled after this long
    pub max_lifetime: Duration,
    /// Budget for the startup `SELECT 1`
    pub verify_timeout: Duration,
}

impl fmt::Debug for DbConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DbConfig")
            .field("service_name", &self.service_name)
            .field("database_url", &"[REDACTED]")
            .field("max_connections", &self.max_connections)
            .field("min_connections", &self.min_connections)
            .field("acquire_timeout", &self.acquire_timeout)
            .field("idle_timeout", &self.idle_timeout)
            .field("max_lifetime", &self.max_lifetime)
            .field("verify_timeout", &self.verify_timeout)
            .finish()
    }
}

impl DbConfig {
    pub fn new(service_name: impl Into<String>, database_url: impl Into<String>) -> Self {
        Self {
            service_name: service_name.into(),
            database_url: database_url.into(),
            max_connections: 10,
            min_connections: 2,
            acquire_timeout: Duration::from_secs(10),
            idle_timeout: Duration::from_secs(600),
            max_lifetime: Duration::from_secs(1800),
            verify_timeout: Duration::from_secs(5),
        }
    }

    /// `max` is at least 1 and `min` never exceeds it
    pub fn with_pool_size(mut self, max: u32, min: u32) -> Self {
        self.max_connections = max.max(1);
        self.min_connections = min.min(self.max_connections);
        self
    }

    pub fn with_acquire_timeout(mut self, secs: u64) -> Self {
        self.acquire_timeout = Duration::from_secs(secs);
        self
    }

    pub fn log_config(&self) {
        info!(
            service = %self.service_name,
            max_connections = self.max_connections,
            min_connections = self.min_connections,
            acquire_timeout_secs = self.acquire_timeout.as_secs(),
            idle_timeout_secs = self.idle_timeout.as_secs(),
            max_lifetime_secs = self.max_lifetime.as_secs(),
            "Database pool configuration"
        );
    }
}

pub async fn create_pool(config: DbConfig) -> Result<PgPool, sqlx::Error> {
    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .acquire_timeout(config.acquire_timeout)
        .idle_timeout(config.idle_timeout)
        .max_lifetime(config.max_lifetime)
        .test_before_acquire(true)
        .connect(&config.database_url)
        .await?;

    verify(&pool, &config).await?;
    info!(service = %config.service_name, "Database pool ready");
    Ok(pool)
}

async fn verify(pool: &PgPool, config: &DbConfig) -> Result<(), sqlx::Error> {
    let probe = sqlx::query("SELECT 1").execute(pool);

    match tokio::time::timeout(config.verify_timeout, probe).await {
        Ok(Ok(_)) => Ok(()),
        Ok(Err(e)) => {
            error!(service = %config.service_name, error = %e, "Database probe failed");
            Err(e)
        }
        Err(_) => {
            error!(
                service = %config.service_name,
                timeout_secs = config.verify_timeout.as_secs(),
                "Database probe timed out"
            );
            Err(sqlx::Error::PoolTimedOut)
        }
    }
}
