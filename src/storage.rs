//! Durable key-value storage port.
//!
//! The cache persists two kinds of entries: one raw payload per derived cache
//! key and a generated-once stable installation id. Hosts may supply their own
//! backend (keychain, platform prefs, database) through [`StorageBackend`].
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// String key-value storage used for the result cache and the stable id.
///
/// Implementations must be safe to call from multiple threads. Write failures
/// are surfaced so the caller can log them, but the SDK treats all storage as
/// best-effort.
pub trait StorageBackend: Send + Sync {
    /// Read the value stored under `key`, if any.
    fn get(&self, key: &str) -> Option<String>;
    /// Store `value` under `key`, replacing any previous value.
    fn set(&self, key: &str, value: &str) -> std::io::Result<()>;
    /// Delete the entry under `key`. Deleting a missing key is a no-op.
    fn remove(&self, key: &str) -> std::io::Result<()>;
}

/// Storage backed by a single JSON document on disk. The document is loaded
/// once at open and rewritten on every update, mirroring how the hosting
/// platform's preference stores behave.
pub struct FileStorage {
    path: PathBuf,
    entries: Mutex<HashMap<String, String>>,
}

impl FileStorage {
    /// Open (or create) the store at `path`. A corrupt document is discarded
    /// and replaced on the next write.
    pub fn open(path: impl AsRef<Path>) -> std::io::Result<FileStorage> {
        let path = path.as_ref().to_owned();
        let entries = match std::fs::read_to_string(&path) {
            Ok(raw) => serde_json::from_str(&raw).unwrap_or_else(|err| {
                log::warn!(target: "statsig", "discarding corrupt storage file {}: {}", path.display(), err);
                HashMap::new()
            }),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => HashMap::new(),
            Err(err) => return Err(err),
        };
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        Ok(FileStorage {
            path,
            entries: Mutex::new(entries),
        })
    }

    fn write_document(&self, entries: &HashMap<String, String>) -> std::io::Result<()> {
        let json = serde_json::to_string(entries)?;
        // Write-then-rename so a crash mid-write cannot truncate the document.
        let tmp = self.path.with_extension("tmp");
        std::fs::write(&tmp, json)?;
        std::fs::rename(&tmp, &self.path)
    }
}

impl StorageBackend for FileStorage {
    fn get(&self, key: &str) -> Option<String> {
        self.entries
            .lock()
            .expect("thread holding storage lock should not panic").get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> std::io::Result<()> {
        let mut entries = self.entries
            .lock()
            .expect("thread holding storage lock should not panic");
        entries.insert(key.to_owned(), value.to_owned());
        self.write_document(&entries)
    }

    fn remove(&self, key: &str) -> std::io::Result<()> {
        let mut entries = self.entries
            .lock()
            .expect("thread holding storage lock should not panic");
        if entries.remove(key).is_some() {
            self.write_document(&entries)?;
        }
        Ok(())
    }
}

/// Process-lifetime storage. Used when the host has not configured a data
/// directory, and in tests.
#[derive(Default)]
pub struct InMemoryStorage {
    entries: Mutex<HashMap<String, String>>,
}

impl InMemoryStorage {
    /// Create an empty in-memory store.
    pub fn new() -> InMemoryStorage {
        InMemoryStorage::default()
    }

    /// Pre-populate an entry. Intended for tests.
    pub fn with_entry(self, key: impl Into<String>, value: impl Into<String>) -> InMemoryStorage {
        self.entries
            .lock()
            .expect("thread holding storage lock should not panic")
            .insert(key.into(), value.into());
        self
    }
}

impl StorageBackend for InMemoryStorage {
    fn get(&self, key: &str) -> Option<String> {
        self.entries
            .lock()
            .expect("thread holding storage lock should not panic").get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> std::io::Result<()> {
        self.entries
            .lock()
            .expect("thread holding storage lock should not panic")
            .insert(key.to_owned(), value.to_owned());
        Ok(())
    }

    fn remove(&self, key: &str) -> std::io::Result<()> {
        self.entries
            .lock()
            .expect("thread holding storage lock should not panic").remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_storage_round_trips_across_opens() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("statsig_store.json");

        {
            let storage = FileStorage::open(&path).unwrap();
            storage.set("k1", "v1").unwrap();
            storage.set("k2", "v2").unwrap();
            storage.remove("k2").unwrap();
        }

        let storage = FileStorage::open(&path).unwrap();
        assert_eq!(storage.get("k1").as_deref(), Some("v1"));
        assert_eq!(storage.get("k2"), None);
    }

    #[test]
    fn corrupt_document_is_discarded() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("statsig_store.json");
        std::fs::write(&path, "{not json").unwrap();

        let storage = FileStorage::open(&path).unwrap();
        assert_eq!(storage.get("anything"), None);
        storage.set("k", "v").unwrap();
        assert_eq!(storage.get("k").as_deref(), Some("v"));
    }
}
