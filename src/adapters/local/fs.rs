//! On-disk layout: one directory per fingerprint under `<storage>/<video_path>`.

use bytes::Bytes;
use std::io;
use std::path::{Path, PathBuf};

/// Master playlist file name inside each fingerprint directory.
pub const MASTER_PLAYLIST: &str = "playlist.m3u8";

const STAGING_DIR: &str = ".staging";

#[derive(Debug, Clone)]
pub struct AssetStore {
    root: PathBuf,
    staging: PathBuf,
}

impl AssetStore {
    /// Assets live in `storage_path/video_path`; staged uploads in `storage_path/.staging`
    /// so the orphan sweep never sees them.
    pub fn new(storage_path: impl AsRef<Path>, video_path: impl AsRef<Path>) -> Self {
        let storage_path = storage_path.as_ref();
        Self {
            root: storage_path.join(video_path),
            staging: storage_path.join(STAGING_DIR),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn staging_dir(&self) -> &Path {
        &self.staging
    }

    pub fn asset_dir(&self, fingerprint: &str) -> PathBuf {
        self.root.join(fingerprint)
    }

    pub fn master_playlist_path(&self, fingerprint: &str) -> PathBuf {
        self.asset_dir(fingerprint).join(MASTER_PLAYLIST)
    }

    pub async fn has_master_playlist(&self, fingerprint: &str) -> bool {
        tokio::fs::try_exists(self.master_playlist_path(fingerprint))
            .await
            .unwrap_or(false)
    }

    /// Move a staged upload into the fingerprint directory, creating it if absent.
    pub async fn persist_upload(
        &self,
        fingerprint: &str,
        file_name: &str,
        staged: &Path,
    ) -> io::Result<PathBuf> {
        let dir = self.asset_dir(fingerprint);
        tokio::fs::create_dir_all(&dir).await?;

        let destination = dir.join(file_name);
        if tokio::fs::rename(staged, &destination).await.is_err() {
            // rename does not cross filesystems
            tokio::fs::copy(staged, &destination).await?;
            tokio::fs::remove_file(staged).await?;
        }
        Ok(destination)
    }

    /// Names of all fingerprint directories currently on disk.
    pub async fn list_asset_dirs(&self) -> io::Result<Vec<String>> {
        let mut entries = match tokio::fs::read_dir(&self.root).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e),
        };

        let mut names = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            if entry.file_type().await?.is_dir() {
                if let Some(name) = entry.file_name().to_str() {
                    names.push(name.to_string());
                }
            }
        }
        names.sort();
        Ok(names)
    }

    pub async fn read_asset_file(&self, fingerprint: &str, file_name: &str) -> io::Result<Bytes> {
        let data = tokio::fs::read(self.asset_dir(fingerprint).join(file_name)).await?;
        Ok(Bytes::from(data))
    }
}

/// Recursive removal that treats a missing directory as already removed.
pub async fn remove_dir_if_exists(path: &Path) -> io::Result<()> {
    match tokio::fs::remove_dir_all(path).await {
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        other => other,
    }
}
