//! Storage backends addressed by opaque hierarchical keys.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;

use super::hash::CacheKey;
use crate::Error;

/// Whole-entry read/write storage.
///
/// Implementations overwrite on write and never merge.
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Read an entry; `Ok(None)` when nothing is stored under `key`.
    async fn read(&self, key: &CacheKey) -> Result<Option<Vec<u8>>, Error>;

    /// Replace the entry stored under `key`.
    async fn write(&self, key: &CacheKey, bytes: Vec<u8>) -> Result<(), Error>;

    async fn exists(&self, key: &CacheKey) -> Result<bool, Error>;
}

static TMP_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Files under a root directory, one per key.
#[derive(Debug, Clone)]
pub struct FsBackend {
    root: PathBuf,
}

impl FsBackend {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn path_for(&self, key: &CacheKey) -> Result<PathBuf, Error> {
        let raw = key.as_str();
        if raw.starts_with('/') || raw.split('/').any(|seg| seg.is_empty() || seg == "..") {
            return Err(Error::InvalidKey(raw.to_string()));
        }
        Ok(self.root.join(raw))
    }
}

fn tmp_path(path: &Path) -> PathBuf {
    let n = TMP_COUNTER.fetch_add(1, Ordering::Relaxed);
    let mut name = path.as_os_str().to_owned();
    name.push(format!(".{}.{n}.tmp", std::process::id()));
    PathBuf::from(name)
}

#[async_trait]
impl StorageBackend for FsBackend {
    async fn read(&self, key: &CacheKey) -> Result<Option<Vec<u8>>, Error> {
        let path = self.path_for(key)?;
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn write(&self, key: &CacheKey, bytes: Vec<u8>) -> Result<(), Error> {
        let path = self.path_for(key)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        // Readers must never observe a partially written entry.
        let tmp = tmp_path(&path);
        tokio::fs::write(&tmp, bytes).await?;
        if let Err(e) = tokio::fs::rename(&tmp, &path).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(e.into());
        }
        Ok(())
    }

    async fn exists(&self, key: &CacheKey) -> Result<bool, Error> {
        let path = self.path_for(key)?;
        Ok(tokio::fs::try_exists(&path).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_read_missing() {
        let dir = tempfile::tempdir().unwrap();
        let backend = FsBackend::new(dir.path());
        let key = CacheKey::new("robots", "https://example.com/robots.txt");
        assert!(backend.read(&key).await.unwrap().is_none());
        assert!(!backend.exists(&key).await.unwrap());
    }

    #[tokio::test]
    async fn test_write_creates_directories_and_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let backend = FsBackend::new(dir.path().join("nested"));
        let key = CacheKey::with_variant("responses", "https://example.com/", "en");

        backend.write(&key, b"first".to_vec()).await.unwrap();
        backend.write(&key, b"second".to_vec()).await.unwrap();

        assert!(backend.exists(&key).await.unwrap());
        assert_eq!(backend.read(&key).await.unwrap().unwrap(), b"second");
    }

    #[tokio::test]
    async fn test_no_tmp_files_left_behind() {
        let dir = tempfile::tempdir().unwrap();
        let backend = FsBackend::new(dir.path());
        let key = CacheKey::new("deny", "GET /?url=x");
        backend.write(&key, b"{}".to_vec()).await.unwrap();

        let parent = dir.path().join("deny");
        let mut entries = tokio::fs::read_dir(&parent).await.unwrap();
        while let Some(entry) = entries.next_entry().await.unwrap() {
            assert!(!entry.file_name().to_string_lossy().ends_with(".tmp"));
        }
    }

    #[test]
    fn test_path_for_rejects_traversal() {
        let backend = FsBackend::new("/tmp/cache");
        let key = CacheKey("../outside.json".to_string());
        assert!(matches!(backend.path_for(&key), Err(Error::InvalidKey(_))));
        let key = CacheKey("/abs.json".to_string());
        assert!(matches!(backend.path_for(&key), Err(Error::InvalidKey(_))));
    }
}
