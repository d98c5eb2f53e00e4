//! Transient on-disk home of an uploaded image while its submission is checked.

use std::path::{Path, PathBuf};

use anyhow::Context as _;
use schoolhub_domain::image::{ImageFormat, check_image_size};
use tokio::{fs::File, io::AsyncWriteExt};
use uuid::Uuid;

use crate::domain::types::ImageUpload;
use crate::error::WebServiceError;

/// A staged image file. The file is removed when this guard is dropped.
#[derive(Debug)]
pub struct StagedImage {
    path: PathBuf,
    format: ImageFormat,
    len: u64,
}

impl StagedImage {
    pub fn upload(&self) -> ImageUpload<'_> {
        ImageUpload {
            path: &self.path,
            format: self.format,
            len: self.len,
        }
    }
}

impl Drop for StagedImage {
    fn drop(&mut self) {
        match std::fs::remove_file(&self.path) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                tracing::warn!(
                    path = %self.path.display(),
                    error = %e,
                    "failed to remove staged upload"
                )
            }
        }
    }
}

/// Streams an upload into a fresh staging file.
pub struct StagingWriter {
    file: File,
    staged: StagedImage,
}

impl StagingWriter {
    pub async fn create(dir: &Path, format: ImageFormat) -> Result<Self, WebServiceError> {
        tokio::fs::create_dir_all(dir)
            .await
            .with_context(|| format!("create staging directory {}", dir.display()))
            .map_err(WebServiceError::StorageFailed)?;
        let path = dir.join(format!("upload-{}.{}", Uuid::new_v4(), format.extension()));
        // Guard first, so a failed create still cleans up.
        let staged = StagedImage {
            path,
            format,
            len: 0,
        };
        let file = File::create(&staged.path)
            .await
            .with_context(|| format!("create staging file {}", staged.path.display()))
            .map_err(WebServiceError::StorageFailed)?;
        Ok(Self { file, staged })
    }

    /// Append a chunk, rejecting the upload as soon as it grows past the limit.
    pub async fn write_chunk(&mut self, chunk: &[u8]) -> Result<(), WebServiceError> {
        let len = self.staged.len + chunk.len() as u64;
        check_image_size(len)?;
        self.file
            .write_all(chunk)
            .await
            .context("write staging file")
            .map_err(WebServiceError::StorageFailed)?;
        self.staged.len = len;
        Ok(())
    }

    /// Returns `None` for a zero-byte upload; its staging file is removed.
    pub async fn finish(mut self) -> Result<Option<StagedImage>, WebServiceError> {
        self.file
            .flush()
            .await
            .context("flush staging file")
            .map_err(WebServiceError::StorageFailed)?;
        if self.staged.len == 0 {
            return Ok(None);
        }
        Ok(Some(self.staged))
    }
}
