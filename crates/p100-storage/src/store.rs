use std::path::{Component, Path, PathBuf};

use chrono::{DateTime, Utc};
use thiserror::Error;
use tokio::fs;
use tracing::{info, warn};

use crate::is_valid_bucket;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("unknown bucket: {0}")]
    UnknownBucket(String),
    #[error("invalid object path: {0}")]
    InvalidPath(String),
    #[error("object not found: {0}")]
    NotFound(String),
    #[error("destination already exists: {0}")]
    AlreadyExists(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// One object in a bucket listing.
#[derive(Debug, Clone)]
pub struct ObjectInfo {
    /// Path relative to the bucket, forward slashes.
    pub path: String,
    pub size: u64,
    pub modified: Option<DateTime<Utc>>,
}

/// On-disk bucket store.
///
/// Each bucket is a subdirectory of `{root}`; objects are plain files under
/// their bucket, nested paths allowed.
pub struct Store {
    root: PathBuf,
}

impl Store {
    pub async fn new(root: PathBuf) -> anyhow::Result<Self> {
        for bucket in crate::BUCKETS {
            fs::create_dir_all(root.join(bucket)).await?;
        }
        info!("Object store rooted at {}", root.display());
        Ok(Self { root })
    }

    /// Resolves `{bucket}/{path}` to a filesystem path, refusing unknown
    /// buckets and any path that could escape its bucket directory.
    pub fn object_path(&self, bucket: &str, path: &str) -> Result<PathBuf, StoreError> {
        if !is_valid_bucket(bucket) {
            return Err(StoreError::UnknownBucket(bucket.to_string()));
        }
        validate_object_path(path)?;
        Ok(self.root.join(bucket).join(path))
    }

    pub async fn save(&self, bucket: &str, path: &str, data: &[u8]) -> Result<(), StoreError> {
        let full = self.object_path(bucket, path)?;
        if let Some(parent) = full.parent() {
            fs::create_dir_all(parent).await?;
        }
        fs::write(&full, data).await?;
        info!("Stored {}/{} ({} bytes)", bucket, path, data.len());
        Ok(())
    }

    pub async fn read(&self, bucket: &str, path: &str) -> Result<Vec<u8>, StoreError> {
        let full = self.object_path(bucket, path)?;
        match fs::read(&full).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(StoreError::NotFound(format!("{}/{}", bucket, path)))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Delete an object. Tolerant of files that are already gone — the URL
    /// may still dangle in the database from an earlier partial failure, and
    /// the caller runs the reference sweep either way.
    pub async fn delete(&self, bucket: &str, path: &str) -> Result<(), StoreError> {
        let full = self.object_path(bucket, path)?;
        match fs::remove_file(&full).await {
            Ok(()) => {
                info!("Deleted {}/{}", bucket, path);
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!("Object {}/{} already gone", bucket, path);
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Move an object within its bucket. Refuses to clobber an existing
    /// destination.
    pub async fn rename(&self, bucket: &str, from: &str, to: &str) -> Result<(), StoreError> {
        let src = self.object_path(bucket, from)?;
        let dst = self.object_path(bucket, to)?;

        match fs::metadata(&src).await {
            Ok(_) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(StoreError::NotFound(format!("{}/{}", bucket, from)));
            }
            Err(e) => return Err(e.into()),
        }
        if fs::metadata(&dst).await.is_ok() {
            return Err(StoreError::AlreadyExists(format!("{}/{}", bucket, to)));
        }

        if let Some(parent) = dst.parent() {
            fs::create_dir_all(parent).await?;
        }
        fs::rename(&src, &dst).await?;
        info!("Renamed {}/{} -> {}/{}", bucket, from, bucket, to);
        Ok(())
    }

    /// Recursive listing of a bucket, optionally under a prefix, sorted by
    /// path.
    pub async fn list(&self, bucket: &str, prefix: Option<&str>) -> Result<Vec<ObjectInfo>, StoreError> {
        if !is_valid_bucket(bucket) {
            return Err(StoreError::UnknownBucket(bucket.to_string()));
        }
        let bucket_root = self.root.join(bucket);
        let start = match prefix {
            Some(p) if !p.is_empty() => {
                validate_object_path(p)?;
                bucket_root.join(p)
            }
            _ => bucket_root.clone(),
        };

        let mut objects = Vec::new();
        let mut pending = vec![start];
        while let Some(dir) = pending.pop() {
            let mut entries = match fs::read_dir(&dir).await {
                Ok(entries) => entries,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
                Err(e) => return Err(e.into()),
            };
            while let Some(entry) = entries.next_entry().await? {
                let path = entry.path();
                let meta = entry.metadata().await?;
                if meta.is_dir() {
                    pending.push(path);
                } else {
                    let rel = relative_object_path(&bucket_root, &path)?;
                    objects.push(ObjectInfo {
                        path: rel,
                        size: meta.len(),
                        modified: meta.modified().ok().map(DateTime::<Utc>::from),
                    });
                }
            }
        }
        objects.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(objects)
    }
}

fn validate_object_path(path: &str) -> Result<(), StoreError> {
    if path.is_empty() {
        return Err(StoreError::InvalidPath("empty path".to_string()));
    }
    let p = Path::new(path);
    for component in p.components() {
        match component {
            Component::Normal(seg) if !seg.is_empty() => {}
            _ => return Err(StoreError::InvalidPath(path.to_string())),
        }
    }
    if path.starts_with('/') || path.ends_with('/') || path.contains("//") {
        return Err(StoreError::InvalidPath(path.to_string()));
    }
    Ok(())
}

fn relative_object_path(bucket_root: &Path, full: &Path) -> Result<String, StoreError> {
    let rel = full
        .strip_prefix(bucket_root)
        .map_err(|_| StoreError::InvalidPath(full.display().to_string()))?;
    let parts: Vec<String> = rel
        .components()
        .filter_map(|c| match c {
            Component::Normal(seg) => Some(seg.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect();
    Ok(parts.join("/"))
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn temp_store() -> Store {
        let root = std::env::temp_dir().join(format!("p100-store-{}", uuid::Uuid::new_v4()));
        Store::new(root).await.unwrap()
    }

    #[tokio::test]
    async fn save_read_delete_roundtrip() {
        let store = temp_store().await;
        store.save("screenshots", "a/b.png", b"png-bytes").await.unwrap();
        assert_eq!(store.read("screenshots", "a/b.png").await.unwrap(), b"png-bytes");

        store.delete("screenshots", "a/b.png").await.unwrap();
        assert!(matches!(
            store.read("screenshots", "a/b.png").await,
            Err(StoreError::NotFound(_))
        ));
        // Second delete is tolerated
        store.delete("screenshots", "a/b.png").await.unwrap();
    }

    #[tokio::test]
    async fn rejects_unknown_bucket_and_traversal() {
        let store = temp_store().await;
        assert!(matches!(
            store.save("secrets", "x", b"x").await,
            Err(StoreError::UnknownBucket(_))
        ));
        for bad in ["../escape.png", "a/../../b", "/abs.png", "a//b", ""] {
            assert!(
                matches!(store.save("backgrounds", bad, b"x").await, Err(StoreError::InvalidPath(_))),
                "path {:?} should be rejected",
                bad
            );
        }
    }

    #[tokio::test]
    async fn rename_refuses_collision_and_missing_source() {
        let store = temp_store().await;
        store.save("artworks", "one.png", b"1").await.unwrap();
        store.save("artworks", "two.png", b"2").await.unwrap();

        assert!(matches!(
            store.rename("artworks", "one.png", "two.png").await,
            Err(StoreError::AlreadyExists(_))
        ));
        assert!(matches!(
            store.rename("artworks", "missing.png", "three.png").await,
            Err(StoreError::NotFound(_))
        ));

        store.rename("artworks", "one.png", "nested/renamed.png").await.unwrap();
        assert_eq!(store.read("artworks", "nested/renamed.png").await.unwrap(), b"1");
    }

    #[tokio::test]
    async fn list_is_recursive_and_sorted() {
        let store = temp_store().await;
        store.save("backgrounds", "z.png", b"z").await.unwrap();
        store.save("backgrounds", "chapter1/a.png", b"a").await.unwrap();
        store.save("backgrounds", "chapter1/deep/b.png", b"bb").await.unwrap();

        let all = store.list("backgrounds", None).await.unwrap();
        let paths: Vec<&str> = all.iter().map(|o| o.path.as_str()).collect();
        assert_eq!(paths, vec!["chapter1/a.png", "chapter1/deep/b.png", "z.png"]);
        assert_eq!(all[1].size, 2);

        let under = store.list("backgrounds", Some("chapter1")).await.unwrap();
        assert_eq!(under.len(), 2);

        let empty = store.list("backgrounds", Some("nope")).await.unwrap();
        assert!(empty.is_empty());
    }
}
