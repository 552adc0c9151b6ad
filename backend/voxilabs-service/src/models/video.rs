use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;
use std::str::FromStr;
use uuid::Uuid;

/// Video lifecycle: `processing` until the provider answers, then `completed`
/// or `failed`. Terminal states never change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum VideoStatus {
    Processing,
    Completed,
    Failed,
}

impl VideoStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            VideoStatus::Processing => "processing",
            VideoStatus::Completed => "completed",
            VideoStatus::Failed => "failed",
        }
    }
}

impl FromStr for VideoStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "processing" => Ok(VideoStatus::Processing),
            "completed" => Ok(VideoStatus::Completed),
            "failed" => Ok(VideoStatus::Failed),
            other => Err(format!("unknown video status: {other}")),
        }
    }
}

/// `videos` row
#[derive(Debug, Clone, FromRow)]
pub struct Video {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub prompt: String,
    pub status: String,
    pub url: Option<String>,
    pub duration: f64,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Video {
    /// Unknown strings read as `Failed` so they never look in flight.
    pub fn status(&self) -> VideoStatus {
        self.status.parse().unwrap_or(VideoStatus::Failed)
    }
}

#[derive(Debug, Clone)]
pub struct NewVideo {
    pub user_id: Uuid,
    pub title: String,
    pub prompt: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoResponse {
    pub id: Uuid,
    pub title: String,
    pub prompt: String,
    pub status: VideoStatus,
    pub url: Option<String>,
    pub duration: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<Video> for VideoResponse {
    fn from(video: Video) -> Self {
        let status = video.status();
        Self {
            id: video.id,
            title: video.title,
            prompt: video.prompt,
            status,
            url: video.url,
            duration: video.duration,
            error_message: video.error_message,
            created_at: video.created_at,
        }
    }
}

/// Row shape of the dashboard project list
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectSummary {
    pub id: Uuid,
    pub title: String,
    pub duration: f64,
    pub created_at: DateTime<Utc>,
    pub status: VideoStatus,
    pub url: Option<String>,
}

impl From<Video> for ProjectSummary {
    fn from(video: Video) -> Self {
        let status = video.status();
        Self {
            id: video.id,
            title: video.title,
            duration: video.duration,
            created_at: video.created_at,
            status,
            url: video.url,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProjectSort {
    /// Title ascending
    Title,
    /// Duration descending
    Duration,
    /// Creation time descending
    #[default]
    Date,
}

impl ProjectSort {
    /// Unknown or missing keys sort by date.
    pub fn parse_lenient(key: Option<&str>) -> Self {
        match key.map(|k| k.trim().to_ascii_lowercase()).as_deref() {
            Some("title") => ProjectSort::Title,
            Some("duration") => ProjectSort::Duration,
            _ => ProjectSort::Date,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ProjectQuery {
    /// Case-insensitive title substring
    pub search: Option<String>,
    pub sort: ProjectSort,
}

/// Raw aggregates read from the store
#[derive(Debug, Clone, Copy, PartialEq, FromRow)]
pub struct VideoTotals {
    pub total_videos: i64,
    pub monthly_videos: i64,
    pub total_duration: f64,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub total_videos: i64,
    pub monthly_videos: i64,
    pub total_duration: i64,
}

impl From<VideoTotals> for DashboardStats {
    fn from(totals: VideoTotals) -> Self {
        Self {
            total_videos: totals.total_videos,
            monthly_videos: totals.monthly_videos,
            total_duration: totals.total_duration.round() as i64,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sort_key_parsing() {
        assert_eq!(ProjectSort::parse_lenient(Some("title")), ProjectSort::Title);
        assert_eq!(ProjectSort::parse_lenient(Some("Duration")), ProjectSort::Duration);
        assert_eq!(ProjectSort::parse_lenient(Some("date")), ProjectSort::Date);
        assert_eq!(ProjectSort::parse_lenient(Some("views")), ProjectSort::Date);
        assert_eq!(ProjectSort::parse_lenient(None), ProjectSort::Date);
    }

    #[test]
    fn test_status_round_trip_and_unknown() {
        for status in [
            VideoStatus::Processing,
            VideoStatus::Completed,
            VideoStatus::Failed,
        ] {
            assert_eq!(status.as_str().parse::<VideoStatus>().unwrap(), status);
        }
        assert!("queued".parse::<VideoStatus>().is_err());
    }

    #[test]
    fn test_stats_round_total_duration() {
        let stats = DashboardStats::from(VideoTotals {
            total_videos: 3,
            monthly_videos: 1,
            total_duration: 12.6,
        });
        assert_eq!(stats.total_duration, 13);
    }
}
