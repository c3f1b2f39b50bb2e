//! Frame source reading the latest still from disk.
//!
//! An external camera tool is expected to keep overwriting one image file.
//! A missing file means "no frame right now"; a file older than the
//! configured age is rejected as stale.

use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use tracing::debug;

use crate::domain::models::{CaptureConfig, CapturedFrame};
use crate::domain::ports::{CaptureError, FrameSource};

/// Frame source backed by a single image file.
#[derive(Debug, Clone)]
pub struct FileFrameSource {
    path: PathBuf,
    max_age: Duration,
}

impl FileFrameSource {
    pub fn new(path: impl Into<PathBuf>, max_age: Duration) -> Self {
        Self {
            path: path.into(),
            max_age,
        }
    }

    /// Build from configuration; `None` when no frame path is configured.
    pub fn from_config(config: &CaptureConfig) -> Option<Self> {
        config
            .frame_path
            .as_ref()
            .map(|path| Self::new(path, Duration::from_secs(config.max_frame_age_secs)))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// MIME type for the image extensions the narrator accepts.
fn media_type_for(path: &Path) -> Result<&'static str, CaptureError> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();
    match ext.as_str() {
        "jpg" | "jpeg" => Ok("image/jpeg"),
        "png" => Ok("image/png"),
        "webp" => Ok("image/webp"),
        "gif" => Ok("image/gif"),
        other => Err(CaptureError::Unsupported(if other.is_empty() {
            "missing file extension".to_string()
        } else {
            format!(".{other}")
        })),
    }
}

#[async_trait]
impl FrameSource for FileFrameSource {
    async fn capture(&self) -> Result<Option<CapturedFrame>, CaptureError> {
        let media_type = media_type_for(&self.path)?;

        let metadata = match tokio::fs::metadata(&self.path).await {
            Ok(metadata) => metadata,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        // Clock skew into the future counts as fresh.
        let age = metadata
            .modified()
            .ok()
            .and_then(|modified| SystemTime::now().duration_since(modified).ok())
            .unwrap_or_default();
        if age > self.max_age {
            return Err(CaptureError::Stale {
                age_secs: age.as_secs(),
            });
        }

        let bytes = tokio::fs::read(&self.path).await?;
        if bytes.is_empty() {
            return Ok(None);
        }
        debug!(path = %self.path.display(), bytes = bytes.len(), "frame captured");

        Ok(Some(CapturedFrame {
            media_type: media_type.to_string(),
            data: STANDARD.encode(bytes),
        }))
    }
}
