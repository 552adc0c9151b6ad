/// Local filesystem storage for generated videos
use crate::error::{AppError, Result};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredVideo {
    pub file_name: String,
    pub public_url: String,
}

#[derive(Debug, Clone)]
pub struct VideoStorage {
    root: PathBuf,
    public_prefix: String,
}

impl VideoStorage {
    pub fn new(root: impl Into<PathBuf>, public_prefix: &str) -> Self {
        Self {
            root: root.into(),
            public_prefix: public_prefix.trim_end_matches('/').to_string(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub async fn ensure_root(&self) -> Result<()> {
        tokio::fs::create_dir_all(&self.root).await?;
        info!(path = %self.root.display(), "Video storage ready");
        Ok(())
    }

    /// Write `bytes` under a fresh random name and return where it is served.
    pub async fn save(&self, bytes: &[u8], extension: &str) -> Result<StoredVideo> {
        let file_name = format!("{}.{}", Uuid::new_v4(), extension);
        let path = self.root.join(&file_name);

        tokio::fs::write(&path, bytes).await.map_err(|e| {
            AppError::Storage(format!("failed to write {}: {}", path.display(), e))
        })?;

        debug!(file = %file_name, size = bytes.len(), "Stored video file");
        Ok(StoredVideo {
            public_url: format!("{}/{}", self.public_prefix, file_name),
            file_name,
        })
    }

    /// Best-effort removal of the file behind a public URL. URLs outside
    /// the prefix or containing path separators are ignored.
    pub async fn remove_by_url(&self, public_url: &str) {
        let Some(file_name) = public_url
            .strip_prefix(&self.public_prefix)
            .and_then(|rest| rest.strip_prefix('/'))
        else {
            return;
        };
        if file_name.is_empty() || file_name.contains(['/', '\\']) || file_name.contains("..") {
            warn!(url = %public_url, "Refusing to remove suspicious video path");
            return;
        }

        match tokio::fs::remove_file(self.root.join(file_name)).await {
            Ok(()) => debug!(file = %file_name, "Removed video file"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!(file = %file_name, error = %e, "Failed to remove video file"),
        }
    }
}
