//! Recap storage
//!
//! A recap is a free-text summary of an earlier conversation, kept as one plain
//! file per recap. The directory listing sorted by modification time is the
//! catalog; there is no index file.

use std::path::{Path, PathBuf};
use std::time::SystemTime;

use chrono::{DateTime, Local};
use tokio::fs;
use tracing::{debug, info};

use crate::core::{BridgeError, Result};

/// One stored recap
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecapRecord {
    /// File name inside the recap directory
    pub name: String,
    /// Full path of the backing file
    pub path: PathBuf,
    /// Last modification time
    pub modified: SystemTime,
}

impl RecapRecord {
    /// Modification time rendered in local time
    pub fn modified_display(&self) -> String {
        DateTime::<Local>::from(self.modified)
            .format("%Y-%m-%d %H:%M:%S")
            .to_string()
    }
}

/// Directory-backed recap store
#[derive(Debug, Clone)]
pub struct RecapStore {
    dir: PathBuf,
}

impl RecapStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Write a new recap under a timestamp-derived name
    pub async fn save(&self, text: &str) -> Result<RecapRecord> {
        fs::create_dir_all(&self.dir).await?;

        let stamp = Local::now().format("%Y%m%d-%H%M%S%.3f").to_string();
        let mut name = format!("{}.txt", stamp);
        let mut suffix = 1;
        while fs::try_exists(self.dir.join(&name)).await? {
            name = format!("{}-{}.txt", stamp, suffix);
            suffix += 1;
        }

        let path = self.dir.join(&name);
        fs::write(&path, text).await?;
        let modified = fs::metadata(&path).await?.modified()?;

        info!(recap = %name, "saved recap");
        Ok(RecapRecord {
            name,
            path,
            modified,
        })
    }

    /// All recaps, newest first
    pub async fn list(&self) -> Result<Vec<RecapRecord>> {
        let mut records = Vec::new();

        let mut entries = match fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(records),
            Err(e) => return Err(e.into()),
        };

        while let Some(entry) = entries.next_entry().await? {
            let metadata = entry.metadata().await?;
            if !metadata.is_file() {
                continue;
            }
            records.push(RecapRecord {
                name: entry.file_name().to_string_lossy().into_owned(),
                path: entry.path(),
                modified: metadata.modified()?,
            });
        }

        records.sort_by(|a, b| {
            b.modified
                .cmp(&a.modified)
                .then_with(|| b.name.cmp(&a.name))
        });
        Ok(records)
    }

    /// The newest recap, if any
    pub async fn latest(&self) -> Result<Option<RecapRecord>> {
        Ok(self.list().await?.into_iter().next())
    }

    /// Read the text of a named recap
    pub async fn load(&self, name: &str) -> Result<String> {
        let path = self.resolve(name).await?;
        Ok(fs::read_to_string(path).await?)
    }

    /// Remove exactly the named recap
    pub async fn delete(&self, name: &str) -> Result<()> {
        let path = self.resolve(name).await?;
        fs::remove_file(&path).await?;
        debug!(recap = %name, "deleted recap");
        Ok(())
    }

    async fn resolve(&self, name: &str) -> Result<PathBuf> {
        let plain = !name.is_empty()
            && name != "."
            && name != ".."
            && !name.contains(['/', '\\']);
        if !plain {
            return Err(BridgeError::recap(format!("Invalid recap name '{}'", name)));
        }

        let path = self.dir.join(name);
        if !fs::metadata(&path).await.map(|m| m.is_file()).unwrap_or(false) {
            return Err(BridgeError::recap(format!(
                "No recap named '{}' in {}",
                name,
                self.dir.display()
            )));
        }
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio_test::assert_ok;

    fn write_with_mtime(dir: &Path, name: &str, secs_ago: u64) {
        let path = dir.join(name);
        std::fs::write(&path, name).unwrap();
        let file = std::fs::File::options().write(true).open(&path).unwrap();
        file.set_modified(SystemTime::now() - Duration::from_secs(secs_ago))
            .unwrap();
    }

    #[tokio::test]
    async fn test_list_newest_first() {
        let tmp = tempfile::tempdir().unwrap();
        write_with_mtime(tmp.path(), "a", 300);
        write_with_mtime(tmp.path(), "b", 10);
        write_with_mtime(tmp.path(), "c", 100);

        let store = RecapStore::new(tmp.path());
        let names: Vec<String> = store.list().await.unwrap().into_iter().map(|r| r.name).collect();
        assert_eq!(names, vec!["b", "c", "a"]);
        assert_eq!(store.latest().await.unwrap().unwrap().name, "b");
    }

    #[tokio::test]
    async fn test_missing_directory_lists_nothing() {
        let tmp = tempfile::tempdir().unwrap();
        let store = RecapStore::new(tmp.path().join("short-memory"));
        assert!(store.list().await.unwrap().is_empty());
        assert!(store.latest().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_save_and_load() {
        let tmp = tempfile::tempdir().unwrap();
        let store = RecapStore::new(tmp.path().join("short-memory"));

        let record = assert_ok!(store.save("met Ada on 2024-03-01").await);
        assert!(record.path.starts_with(store.dir()));
        assert_eq!(store.load(&record.name).await.unwrap(), "met Ada on 2024-03-01");

        let second = store.save("another").await.unwrap();
        assert_ne!(record.name, second.name);
    }

    #[tokio::test]
    async fn test_delete_removes_only_named_file() {
        let tmp = tempfile::tempdir().unwrap();
        write_with_mtime(tmp.path(), "keep", 20);
        write_with_mtime(tmp.path(), "drop", 10);

        let store = RecapStore::new(tmp.path());
        assert_ok!(store.delete("drop").await);

        let names: Vec<String> = store.list().await.unwrap().into_iter().map(|r| r.name).collect();
        assert_eq!(names, vec!["keep"]);
    }

    #[tokio::test]
    async fn test_delete_rejects_escapes_and_unknown_names() {
        let tmp = tempfile::tempdir().unwrap();
        let store = RecapStore::new(tmp.path().join("short-memory"));
        std::fs::create_dir_all(store.dir()).unwrap();
        std::fs::write(tmp.path().join("outside"), "x").unwrap();

        assert!(matches!(
            store.delete("../outside").await,
            Err(BridgeError::Recap(_))
        ));
        assert!(store.delete("").await.is_err());
        assert!(store.delete("missing").await.is_err());
        assert!(tmp.path().join("outside").exists());
    }
}
