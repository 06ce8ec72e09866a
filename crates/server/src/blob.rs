//! Flat-file blob store for uploaded spreadsheets. Keys are relative paths
//! under the configured root, e.g. `imports/<uuid>.xlsx`.

use std::io;
use std::path::{Path, PathBuf};

#[derive(Clone)]
pub struct FsBlobStore {
    root: PathBuf,
}

impl FsBlobStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn resolve(&self, key: &str) -> io::Result<PathBuf> {
        // Keys are server-generated, but reject traversal anyway.
        let rel = Path::new(key);
        if rel.components().any(|c| !matches!(c, std::path::Component::Normal(_))) {
            return Err(io::Error::new(io::ErrorKind::InvalidInput, "bad blob key"));
        }
        Ok(self.root.join(rel))
    }

    pub async fn put(&self, key: &str, data: &[u8]) -> io::Result<()> {
        let path = self.resolve(key)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&path, data).await
    }

    pub async fn get(&self, key: &str) -> io::Result<Vec<u8>> {
        tokio::fs::read(self.resolve(key)?).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn put_then_get() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsBlobStore::new(dir.path());
        store.put("imports/a.xlsx", b"hello").await.unwrap();
        assert_eq!(store.get("imports/a.xlsx").await.unwrap(), b"hello");
    }

    #[tokio::test]
    async fn traversal_key_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsBlobStore::new(dir.path());
        assert!(store.put("../escape.xlsx", b"x").await.is_err());
        assert!(store.get("/etc/passwd").await.is_err());
    }
}
