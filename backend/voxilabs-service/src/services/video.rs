/// Video generation gateway and the caller-scoped video resource
use crate::db::VideoRepository;
use crate::error::{AppError, GenerationFailure, Result};
use crate::models::{NewVideo, ProjectQuery, Video, VideoStatus};
use crate::services::inference::{InferenceError, InferenceProvider};
use crate::services::media_probe::{mp4_duration_secs, sniff_container, VideoContainer};
use crate::services::storage::VideoStorage;
use bytes::Bytes;
use chrono::Utc;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, warn};
use uuid::Uuid;

/// Characters of the prompt used as a title when none is given
const DEFAULT_TITLE_CHARS: usize = 50;

/// A completed generation: the stored row plus the bytes to stream back
#[derive(Debug, Clone)]
pub struct GeneratedVideo {
    pub video: Video,
    pub bytes: Bytes,
    pub content_type: &'static str,
}

#[derive(Clone)]
pub struct VideoService {
    videos: Arc<dyn VideoRepository>,
    provider: Arc<dyn InferenceProvider>,
    storage: VideoStorage,
    in_flight: Arc<DashMap<Uuid, ()>>,
}

/// Holds a user's generation slot; released on drop.
struct InFlightGuard {
    in_flight: Arc<DashMap<Uuid, ()>>,
    user_id: Uuid,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.in_flight.remove(&self.user_id);
    }
}

impl VideoService {
    pub fn new(
        videos: Arc<dyn VideoRepository>,
        provider: Arc<dyn InferenceProvider>,
        storage: VideoStorage,
    ) -> Self {
        Self {
            videos,
            provider,
            storage,
            in_flight: Arc::new(DashMap::new()),
        }
    }

    /// Run one text-to-video generation for `user_id`.
    ///
    /// The row is created in `processing` and always leaves this call in a
    /// terminal state, except when the process dies mid-call (the reconciler
    /// covers that).
    pub async fn generate(
        &self,
        user_id: Uuid,
        prompt: &str,
        title: Option<&str>,
    ) -> Result<GeneratedVideo> {
        let prompt = prompt.trim();
        if prompt.is_empty() {
            return Err(AppError::MissingPrompt);
        }
        if !self.provider.is_available() {
            return Err(AppError::Internal(
                "inference provider is not configured".to_string(),
            ));
        }

        let _guard = self.acquire_slot(user_id)?;

        let title = title
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| default_title(prompt));

        let mut video = self
            .videos
            .create(NewVideo {
                user_id,
                title,
                prompt: prompt.to_string(),
                created_at: Utc::now(),
            })
            .await?;
        info!(video_id = %video.id, %user_id, "Video generation started");

        let started = Instant::now();
        let (bytes, container) = match self.request_video(prompt).await {
            Ok(output) => output,
            Err(failure) => return Err(self.fail(&video, failure).await),
        };

        let stored = match self.storage.save(&bytes, container.extension()).await {
            Ok(stored) => stored,
            Err(e) => {
                return Err(self
                    .fail(&video, GenerationFailure::Storage(e.to_string()))
                    .await)
            }
        };

        let duration = match container {
            VideoContainer::Mp4 => mp4_duration_secs(&bytes).unwrap_or(0.0),
            VideoContainer::WebM => 0.0,
        };

        match self
            .videos
            .mark_completed(video.id, &stored.public_url, duration)
            .await
        {
            Ok(true) => {}
            Ok(false) => {
                // the row is already terminal, so nothing would point at the file
                self.storage.remove_by_url(&stored.public_url).await;
                warn!(video_id = %video.id, "Generation finished after its row was failed");
                return Err(AppError::GenerationFailed(GenerationFailure::Abandoned));
            }
            Err(e) => {
                self.storage.remove_by_url(&stored.public_url).await;
                return Err(e);
            }
        }

        info!(
            video_id = %video.id,
            url = %stored.public_url,
            duration,
            size = bytes.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Video generation completed"
        );

        video.status = VideoStatus::Completed.as_str().to_string();
        video.url = Some(stored.public_url);
        video.duration = duration;

        Ok(GeneratedVideo {
            video,
            bytes,
            content_type: container.mime_type(),
        })
    }

    pub async fn list(&self, user_id: Uuid) -> Result<Vec<Video>> {
        self.videos
            .list_for_user(user_id, &ProjectQuery::default())
            .await
    }

    pub async fn get(&self, user_id: Uuid, video_id: Uuid) -> Result<Video> {
        self.videos
            .find_for_user(video_id, user_id)
            .await?
            .ok_or(AppError::NotFound("Video"))
    }

    /// Delete the row, then the file behind it if there is one.
    pub async fn delete(&self, user_id: Uuid, video_id: Uuid) -> Result<()> {
        let video = self
            .videos
            .delete_for_user(video_id, user_id)
            .await?
            .ok_or(AppError::NotFound("Video"))?;

        if let Some(url) = &video.url {
            self.storage.remove_by_url(url).await;
        }
        info!(%video_id, %user_id, "Video deleted");
        Ok(())
    }

    /// Remove the stored files of every video owned by `user_id`. Rows are
    /// left to the account deletion cascade.
    pub async fn purge_files(&self, user_id: Uuid) -> Result<()> {
        for video in self.list(user_id).await? {
            if let Some(url) = &video.url {
                self.storage.remove_by_url(url).await;
            }
        }
        Ok(())
    }

    fn acquire_slot(&self, user_id: Uuid) -> Result<InFlightGuard> {
        match self.in_flight.entry(user_id) {
            Entry::Occupied(_) => {
                warn!(%user_id, "Rejected concurrent generation request");
                Err(AppError::GenerationInProgress)
            }
            Entry::Vacant(slot) => {
                slot.insert(());
                Ok(InFlightGuard {
                    in_flight: self.in_flight.clone(),
                    user_id,
                })
            }
        }
    }

    async fn request_video(
        &self,
        prompt: &str,
    ) -> std::result::Result<(Bytes, VideoContainer), GenerationFailure> {
        let output = self
            .provider
            .text_to_video(prompt)
            .await
            .map_err(GenerationFailure::from)?;

        if output.bytes.is_empty() {
            return Err(GenerationFailure::NoData);
        }

        match sniff_container(&output.bytes, output.content_type.as_deref()) {
            Some(container) => Ok((output.bytes, container)),
            None => Err(GenerationFailure::UnexpectedFormat(
                output
                    .content_type
                    .unwrap_or_else(|| "unknown content type".to_string()),
            )),
        }
    }

    /// Record `failure` on the row and turn it into the error to return.
    async fn fail(&self, video: &Video, failure: GenerationFailure) -> AppError {
        let reason = failure.to_string();
        if let Err(e) = self.videos.mark_failed(video.id, &reason).await {
            error!(video_id = %video.id, error = %e, "Failed to record generation failure");
        }
        warn!(video_id = %video.id, reason = %reason, "Video generation failed");
        AppError::GenerationFailed(failure)
    }
}

impl From<InferenceError> for GenerationFailure {
    fn from(err: InferenceError) -> Self {
        match err {
            InferenceError::NoData => GenerationFailure::NoData,
            InferenceError::UnexpectedFormat(detail) => GenerationFailure::UnexpectedFormat(detail),
            other => GenerationFailure::Upstream(other.to_string()),
        }
    }
}

fn default_title(prompt: &str) -> String {
    prompt.chars().take(DEFAULT_TITLE_CHARS).collect()
}
