/// Background sweep for abandoned generations and expired auth rows
use crate::config::ReconcileSettings;
use crate::db::Repositories;
use crate::error::Result;
use chrono::{DateTime, Duration, Utc};
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

pub const ABANDONED_REASON: &str = "generation abandoned";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    pub abandoned_videos: u64,
    pub expired_sessions: u64,
    pub expired_otp_codes: u64,
    pub expired_tokens: u64,
}

/// One pass: fail videos stuck in `processing` since before
/// `now - stale_after`, then drop expired sessions, codes and tokens.
pub async fn run_once(
    repos: &Repositories,
    now: DateTime<Utc>,
    stale_after: Duration,
) -> Result<ReconcileReport> {
    Ok(ReconcileReport {
        abandoned_videos: repos
            .videos
            .fail_stale(now - stale_after, ABANDONED_REASON)
            .await?,
        expired_sessions: repos.sessions.delete_expired(now).await?,
        expired_otp_codes: repos.otp_codes.delete_expired(now).await?,
        expired_tokens: repos.verification_tokens.delete_expired(now).await?,
    })
}

pub fn spawn_reconciler(repos: Repositories, settings: ReconcileSettings) -> JoinHandle<()> {
    let stale_after = Duration::seconds(settings.stale_after_secs);
    let period = std::time::Duration::from_secs(settings.interval_secs.max(1));

    info!(
        interval_secs = period.as_secs(),
        stale_after_secs = settings.stale_after_secs,
        "Starting reconciler"
    );

    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            match run_once(&repos, Utc::now(), stale_after).await {
                Ok(report) if report != ReconcileReport::default() => {
                    info!(
                        abandoned_videos = report.abandoned_videos,
                        expired_sessions = report.expired_sessions,
                        expired_otp_codes = report.expired_otp_codes,
                        expired_tokens = report.expired_tokens,
                        "Reconcile pass completed"
                    );
                }
                Ok(_) => debug!("Reconcile pass found nothing to do"),
                Err(e) => error!(error = %e, "Reconcile pass failed"),
            }
        }
    })
}
