use std::path::PathBuf;

use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::ServiceError;

/// Where a question image ended up, or would end up in a dry run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoredImage {
    pub asset_name: String,
    pub path: Option<PathBuf>,
    pub len: usize,
    pub sha256: String,
}

pub fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

/// Destination for extracted question image bytes.
pub trait ImageSink {
    fn store(&mut self, asset_name: &str, bytes: &[u8]) -> Result<StoredImage, ServiceError>;

    /// Undo a `store` of the same plan after a later image failed.
    fn discard(&mut self, _image: &StoredImage) {}
}

/// Writes images as files under one directory, creating it on first use.
#[derive(Debug, Clone)]
pub struct DirectoryImageSink {
    dir: PathBuf,
}

impl DirectoryImageSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

impl ImageSink for DirectoryImageSink {
    fn store(&mut self, asset_name: &str, bytes: &[u8]) -> Result<StoredImage, ServiceError> {
        std::fs::create_dir_all(&self.dir).map_err(|e| ServiceError::Io(e.to_string()))?;
        let path = self.dir.join(asset_name);
        std::fs::write(&path, bytes).map_err(|e| ServiceError::Io(format!("{}: {e}", path.display())))?;
        tracing::debug!(path = %path.display(), len = bytes.len(), "stored question image");
        Ok(StoredImage { asset_name: asset_name.to_string(), path: Some(path), len: bytes.len(), sha256: sha256_hex(bytes) })
    }

    fn discard(&mut self, image: &StoredImage) {
        let Some(path) = &image.path else { return };
        if let Err(e) = std::fs::remove_file(path) {
            tracing::warn!(path = %path.display(), error = %e, "could not remove stored image");
        }
    }
}

/// Records names and digests without touching the filesystem.
#[derive(Debug, Clone, Default)]
pub struct DryRunImageSink;

impl ImageSink for DryRunImageSink {
    fn store(&mut self, asset_name: &str, bytes: &[u8]) -> Result<StoredImage, ServiceError> {
        Ok(StoredImage { asset_name: asset_name.to_string(), path: None, len: bytes.len(), sha256: sha256_hex(bytes) })
    }
}
