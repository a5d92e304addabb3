//! Durable media storage for audio assets.

use crate::audio::AudioFormat;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;

/// Filesystem store for permanent asset bytes.
///
/// Assets live under a sharded directory structure:
/// `audio/{first2}/{next2}/{asset_id}.{ext}`.
pub struct MediaStore {
    media_dir: PathBuf,
}

impl MediaStore {
    pub fn new(media_dir: impl Into<PathBuf>) -> Self {
        Self {
            media_dir: media_dir.into(),
        }
    }

    pub fn media_dir(&self) -> &Path {
        &self.media_dir
    }

    /// Create the media directory if missing.
    pub async fn init(&self) -> std::io::Result<()> {
        fs::create_dir_all(&self.media_dir).await
    }

    /// Relative storage path for an asset, as recorded in the database.
    pub fn asset_relative_path(asset_id: &str, format: AudioFormat) -> PathBuf {
        let (dir1, dir2) = Self::shard_dirs(asset_id);
        PathBuf::from("audio")
            .join(dir1)
            .join(dir2)
            .join(format!("{}.{}", asset_id, format.as_str()))
    }

    /// Absolute path of a stored asset from its recorded relative path.
    pub fn absolute_path(&self, storage_path: &str) -> PathBuf {
        self.media_dir.join(storage_path)
    }

    /// Persist asset bytes and return the relative storage path.
    pub async fn save_asset(
        &self,
        asset_id: &str,
        format: AudioFormat,
        data: &[u8],
    ) -> std::io::Result<PathBuf> {
        let relative = Self::asset_relative_path(asset_id, format);
        let absolute = self.media_dir.join(&relative);

        if let Some(parent) = absolute.parent() {
            fs::create_dir_all(parent).await?;
        }

        let mut file = fs::File::create(&absolute).await?;
        file.write_all(data).await?;
        file.flush().await?;

        Ok(relative)
    }

    /// Remove a stored asset. Used to compensate when the surrounding
    /// database transaction fails after the bytes were written.
    pub async fn delete_asset(&self, storage_path: &str) -> std::io::Result<()> {
        let absolute = self.media_dir.join(storage_path);
        if absolute.exists() {
            fs::remove_file(&absolute).await?;
        }
        Ok(())
    }

    /// Compute shard directory components from an asset ID.
    fn shard_dirs(asset_id: &str) -> (&str, &str) {
        let bytes = asset_id.as_bytes();
        let dir1 = if bytes.len() >= 2 { &asset_id[0..2] } else { "00" };
        let dir2 = if bytes.len() >= 4 { &asset_id[2..4] } else { "00" };
        (dir1, dir2)
    }
}
