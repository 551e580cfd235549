//! JSON file store.
//!
//! The whole store lives in one JSON file mapping keys to hex-encoded values.
//! It is loaded when opened and rewritten on every mutation.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::debug;

use super::KvStore;
use crate::error::{KeybaseError, Result};

/// Default store filename.
pub const STORE_FILENAME: &str = "keybase.json";

#[derive(Debug, Default, Serialize, Deserialize)]
struct FileContents {
    entries: BTreeMap<String, String>,
}

/// A [`KvStore`] persisted to a single JSON file.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    contents: Mutex<FileContents>,
}

impl FileStore {
    /// Open the store at `path`, creating an empty file if none exists.
    ///
    /// # Example
    ///
    /// ```rust,no_run
    /// use keybase::storage::FileStore;
    /// use std::path::Path;
    ///
    /// let store = FileStore::open(Path::new("keybase.json")).unwrap();
    /// ```
    pub fn open(path: &Path) -> Result<Self> {
        let contents = if path.exists() {
            let raw = fs::read_to_string(path)?;
            serde_json::from_str(&raw)?
        } else {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                fs::create_dir_all(parent)?;
            }
            let empty = FileContents::default();
            save(path, &empty)?;
            empty
        };

        debug!(path = %path.display(), "Opened file store");

        Ok(Self {
            path: path.to_path_buf(),
            contents: Mutex::new(contents),
        })
    }

    /// Open `keybase.json` inside a directory.
    pub fn open_in(directory: &Path) -> Result<Self> {
        Self::open(&directory.join(STORE_FILENAME))
    }

    /// Rewrite the file on the blocking pool. Callers hold the contents lock.
    async fn persist(&self, contents: &FileContents) -> Result<()> {
        let json = serde_json::to_string_pretty(contents)?;
        let path = self.path.clone();

        tokio::task::spawn_blocking(move || write_file(&path, &json))
            .await
            .map_err(|e| KeybaseError::StorageError(io::Error::new(io::ErrorKind::Other, e)))?
    }
}

fn save(path: &Path, contents: &FileContents) -> Result<()> {
    write_file(path, &serde_json::to_string_pretty(contents)?)
}

/// Writes go through a temporary file and a rename.
fn write_file(path: &Path, json: &str) -> Result<()> {
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, json)?;
    fs::rename(&tmp, path)?;
    Ok(())
}

#[async_trait]
impl KvStore for FileStore {
    async fn add(&self, key: &str, value: Vec<u8>) -> Result<()> {
        let mut contents = self.contents.lock().await;
        contents.entries.insert(key.to_string(), hex::encode(value));
        self.persist(&contents).await
    }

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let contents = self.contents.lock().await;
        contents
            .entries
            .get(key)
            .map(|value| {
                hex::decode(value).map_err(|e| {
                    KeybaseError::ParseError(format!("Corrupt value for '{}': {}", key, e))
                })
            })
            .transpose()
    }

    async fn remove(&self, key: &str) -> Result<()> {
        let mut contents = self.contents.lock().await;
        if contents.entries.remove(key).is_some() {
            self.persist(&contents).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_open_creates_file() {
        let temp_dir = TempDir::new().unwrap();
        let store = FileStore::open_in(temp_dir.path()).unwrap();

        assert!(temp_dir.path().join(STORE_FILENAME).exists());
        assert_eq!(store.get("missing").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_open_creates_parent_directories() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nested").join("store.json");

        FileStore::open(&path).unwrap();
        assert!(path.exists());
    }

    #[tokio::test]
    async fn test_persistence() {
        let temp_dir = TempDir::new().unwrap();

        {
            let store = FileStore::open_in(temp_dir.path()).unwrap();
            store.add("a", vec![1, 2, 3]).await.unwrap();
            store.add("b", vec![4]).await.unwrap();
            store.remove("b").await.unwrap();
        }

        let store = FileStore::open_in(temp_dir.path()).unwrap();
        assert_eq!(store.get("a").await.unwrap(), Some(vec![1, 2, 3]));
        assert_eq!(store.get("b").await.unwrap(), None);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_writes_all_persist() {
        let temp_dir = TempDir::new().unwrap();
        let store = std::sync::Arc::new(FileStore::open_in(temp_dir.path()).unwrap());

        let tasks: Vec<_> = (0u8..16)
            .map(|i| {
                let store = store.clone();
                tokio::spawn(async move { store.add(&format!("key_{}", i), vec![i]).await })
            })
            .collect();
        for task in tasks {
            task.await.unwrap().unwrap();
        }

        let reopened = FileStore::open_in(temp_dir.path()).unwrap();
        for i in 0u8..16 {
            assert_eq!(reopened.get(&format!("key_{}", i)).await.unwrap(), Some(vec![i]));
        }
        assert!(!temp_dir.path().join("keybase.json.tmp").exists());
    }

    #[tokio::test]
    async fn test_corrupt_file_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join(STORE_FILENAME);
        fs::write(&path, "not json").unwrap();

        assert!(matches!(
            FileStore::open(&path),
            Err(KeybaseError::JsonError(_))
        ));
    }

    #[tokio::test]
    async fn test_corrupt_value_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join(STORE_FILENAME);
        fs::write(&path, r#"{"entries":{"k":"zz"}}"#).unwrap();

        let store = FileStore::open(&path).unwrap();
        assert!(matches!(
            store.get("k").await,
            Err(KeybaseError::ParseError(_))
        ));
    }
}
