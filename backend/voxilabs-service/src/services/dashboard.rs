/// Per-user dashboard aggregates and project listing
use crate::db::VideoRepository;
use crate::error::{AppError, Result};
use crate::models::{DashboardStats, ProjectQuery, ProjectSort, ProjectSummary};
use chrono::{DateTime, Datelike, Duration, TimeZone, Utc};
use std::sync::Arc;
use uuid::Uuid;

#[derive(Clone)]
pub struct DashboardService {
    videos: Arc<dyn VideoRepository>,
}

impl DashboardService {
    pub fn new(videos: Arc<dyn VideoRepository>) -> Self {
        Self { videos }
    }

    pub async fn stats(&self, user_id: Uuid, now: DateTime<Utc>) -> Result<DashboardStats> {
        let (start, end) = month_bounds(now)?;
        let totals = self.videos.totals_for_user(user_id, start, end).await?;
        Ok(DashboardStats::from(totals))
    }

    pub async fn projects(
        &self,
        user_id: Uuid,
        search: Option<&str>,
        sort: Option<&str>,
    ) -> Result<Vec<ProjectSummary>> {
        let query = ProjectQuery {
            search: search
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string),
            sort: ProjectSort::parse_lenient(sort),
        };

        let videos = self.videos.list_for_user(user_id, &query).await?;
        Ok(videos.into_iter().map(ProjectSummary::from).collect())
    }
}

/// First and last instant of the UTC calendar month containing `now`.
/// The end is one microsecond before the next month starts, the finest
/// resolution Postgres stores.
pub fn month_bounds(now: DateTime<Utc>) -> Result<(DateTime<Utc>, DateTime<Utc>)> {
    let (next_year, next_month) = if now.month() == 12 {
        (now.year() + 1, 1)
    } else {
        (now.year(), now.month() + 1)
    };

    let start = Utc
        .with_ymd_and_hms(now.year(), now.month(), 1, 0, 0, 0)
        .single();
    let next = Utc
        .with_ymd_and_hms(next_year, next_month, 1, 0, 0, 0)
        .single();

    match (start, next) {
        (Some(start), Some(next)) => Ok((start, next - Duration::microseconds(1))),
        _ => Err(AppError::Internal(format!("no month bounds for {now}"))),
    }
}
