/// Video repository - database operations for videos
use super::{escape_like, VideoRepository};
use crate::error::Result;
use crate::models::{NewVideo, ProjectQuery, ProjectSort, Video, VideoStatus, VideoTotals};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

const VIDEO_COLUMNS: &str =
    "id, user_id, title, prompt, status, url, duration, error_message, created_at, updated_at";

pub struct PgVideoRepository {
    pool: PgPool,
}

impl PgVideoRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn order_clause(sort: ProjectSort) -> &'static str {
    match sort {
        ProjectSort::Title => "title ASC, created_at DESC",
        ProjectSort::Duration => "duration DESC, created_at DESC",
        ProjectSort::Date => "created_at DESC",
    }
}

#[async_trait]
impl VideoRepository for PgVideoRepository {
    async fn create(&self, new_video: NewVideo) -> Result<Video> {
        let video = sqlx::query_as::<_, Video>(&format!(
            r#"
            INSERT INTO videos (id, user_id, title, prompt, status, duration, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, 0, $6, $6)
            RETURNING {VIDEO_COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(new_video.user_id)
        .bind(&new_video.title)
        .bind(&new_video.prompt)
        .bind(VideoStatus::Processing.as_str())
        .bind(new_video.created_at)
        .fetch_one(&self.pool)
        .await?;

        Ok(video)
    }

    async fn mark_completed(&self, id: Uuid, url: &str, duration: f64) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE videos
            SET status = $2, url = $3, duration = $4, error_message = NULL, updated_at = NOW()
            WHERE id = $1 AND status = 'processing'
            "#,
        )
        .bind(id)
        .bind(VideoStatus::Completed.as_str())
        .bind(url)
        .bind(duration)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn mark_failed(&self, id: Uuid, reason: &str) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE videos
            SET status = $2, error_message = $3, updated_at = NOW()
            WHERE id = $1 AND status = 'processing'
            "#,
        )
        .bind(id)
        .bind(VideoStatus::Failed.as_str())
        .bind(reason)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn find_for_user(&self, id: Uuid, user_id: Uuid) -> Result<Option<Video>> {
        let video = sqlx::query_as::<_, Video>(&format!(
            "SELECT {VIDEO_COLUMNS} FROM videos WHERE id = $1 AND user_id = $2"
        ))
        .bind(id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(video)
    }

    async fn list_for_user(&self, user_id: Uuid, query: &ProjectQuery) -> Result<Vec<Video>> {
        let pattern = query
            .search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| format!("%{}%", escape_like(s)));

        let sql = format!(
            r#"
            SELECT {VIDEO_COLUMNS}
            FROM videos
            WHERE user_id = $1
              AND ($2::TEXT IS NULL OR title ILIKE $2 ESCAPE '\')
            ORDER BY {}
            "#,
            order_clause(query.sort)
        );

        let videos = sqlx::query_as::<_, Video>(&sql)
            .bind(user_id)
            .bind(pattern)
            .fetch_all(&self.pool)
            .await?;

        Ok(videos)
    }

    async fn delete_for_user(&self, id: Uuid, user_id: Uuid) -> Result<Option<Video>> {
        let video = sqlx::query_as::<_, Video>(&format!(
            "DELETE FROM videos WHERE id = $1 AND user_id = $2 RETURNING {VIDEO_COLUMNS}"
        ))
        .bind(id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(video)
    }

    async fn totals_for_user(
        &self,
        user_id: Uuid,
        month_start: DateTime<Utc>,
        month_end: DateTime<Utc>,
    ) -> Result<VideoTotals> {
        let totals = sqlx::query_as::<_, VideoTotals>(
            r#"
            SELECT COUNT(*)::BIGINT AS total_videos,
                   COUNT(*) FILTER (WHERE created_at >= $2 AND created_at <= $3)::BIGINT AS monthly_videos,
                   COALESCE(SUM(duration), 0)::DOUBLE PRECISION AS total_duration
            FROM videos
            WHERE user_id = $1
            "#,
        )
        .bind(user_id)
        .bind(month_start)
        .bind(month_end)
        .fetch_one(&self.pool)
        .await?;

        Ok(totals)
    }

    async fn fail_stale(&self, created_before: DateTime<Utc>, reason: &str) -> Result<u64> {
        let result = sqlx::query(
            r#"
            UPDATE videos
            SET status = $1, error_message = $2, updated_at = NOW()
            WHERE status = 'processing' AND created_at < $3
            "#,
        )
        .bind(VideoStatus::Failed.as_str())
        .bind(reason)
        .bind(created_before)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_order_clause_is_static_per_sort() {
        assert!(order_clause(ProjectSort::Title).starts_with("title ASC"));
        assert!(order_clause(ProjectSort::Duration).starts_with("duration DESC"));
        assert_eq!(order_clause(ProjectSort::Date), "created_at DESC");
    }
}
