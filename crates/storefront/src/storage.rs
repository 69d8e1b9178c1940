//! Durable key-value storage for client state.
//!
//! Plays the role of the browser's `localStorage`: string keys, string
//! values, synchronous access. The session store keeps the serialized cart
//! here and the cookie jar keeps the backend session cookie here.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use tracing::{debug, warn};

use crate::error::StorageError;

/// A string key-value store.
pub trait Storage: Send + Sync {
    /// Read the value stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be read.
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Store `value` under `key`, replacing any previous value.
    ///
    /// # Errors
    ///
    /// Returns an error if the value cannot be persisted.
    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Delete `key` if present.
    ///
    /// # Errors
    ///
    /// Returns an error if the change cannot be persisted.
    fn remove_item(&self, key: &str) -> Result<(), StorageError>;
}

fn lock(entries: &Mutex<BTreeMap<String, String>>) -> MutexGuard<'_, BTreeMap<String, String>> {
    // A panic mid-update leaves the map itself intact
    entries.lock().unwrap_or_else(PoisonError::into_inner)
}

// =============================================================================
// MemoryStorage
// =============================================================================

/// In-process storage that forgets everything on drop.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    entries: Mutex<BTreeMap<String, String>>,
}

impl MemoryStorage {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-populated with one entry.
    #[must_use]
    pub fn with_item(key: &str, value: &str) -> Self {
        let storage = Self::new();
        lock(&storage.entries).insert(key.to_owned(), value.to_owned());
        storage
    }
}

impl Storage for MemoryStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(lock(&self.entries).get(key).cloned())
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError> {
        lock(&self.entries).insert(key.to_owned(), value.to_owned());
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<(), StorageError> {
        lock(&self.entries).remove(key);
        Ok(())
    }
}

// =============================================================================
// FileStorage
// =============================================================================

/// Storage persisted as a single JSON object on disk.
///
/// The file is read once on [`FileStorage::open`]; afterwards the in-memory
/// map is authoritative and every mutation rewrites the whole file through a
/// temporary sibling and an atomic rename.
#[derive(Debug)]
pub struct FileStorage {
    path: PathBuf,
    entries: Mutex<BTreeMap<String, String>>,
}

impl FileStorage {
    /// Open (or lazily create) the storage file at `path`.
    ///
    /// A missing file is an empty store; nothing is written until the first
    /// mutation. A file that is not a JSON object of strings is moved aside
    /// to `<path>.corrupt` and the store starts empty.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let path = path.into();

        let entries = match fs::read(&path) {
            Ok(bytes) if bytes.iter().all(u8::is_ascii_whitespace) => BTreeMap::new(),
            Ok(bytes) => serde_json::from_slice(&bytes).unwrap_or_else(|e| {
                set_aside(&path, &e);
                BTreeMap::new()
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "Storage file not found, starting empty");
                BTreeMap::new()
            }
            Err(source) => return Err(StorageError::Io { path, source }),
        };

        Ok(Self {
            path,
            entries: Mutex::new(entries),
        })
    }

    /// Location of the backing file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Apply `change` and persist the result while holding the lock.
    fn update<F>(&self, change: F) -> Result<(), StorageError>
    where
        F: FnOnce(&mut BTreeMap<String, String>),
    {
        let mut entries = lock(&self.entries);
        change(&mut entries);
        self.flush(&entries)
    }

    fn flush(&self, entries: &BTreeMap<String, String>) -> Result<(), StorageError> {
        let io_error = |source| StorageError::Io {
            path: self.path.clone(),
            source,
        };

        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).map_err(io_error)?;
        }

        let bytes = serde_json::to_vec_pretty(entries)?;
        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, bytes).map_err(io_error)?;
        fs::rename(&tmp, &self.path).map_err(io_error)
    }
}

impl Storage for FileStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(lock(&self.entries).get(key).cloned())
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.update(|entries| {
            entries.insert(key.to_owned(), value.to_owned());
        })
    }

    fn remove_item(&self, key: &str) -> Result<(), StorageError> {
        self.update(|entries| {
            entries.remove(key);
        })
    }
}

/// Where an unparseable storage file is moved.
fn corrupt_path(path: &Path) -> PathBuf {
    let mut aside = path.as_os_str().to_owned();
    aside.push(".corrupt");
    PathBuf::from(aside)
}

fn set_aside(path: &Path, error: &serde_json::Error) {
    let aside = corrupt_path(path);
    warn!(
        path = %path.display(),
        moved_to = %aside.display(),
        error = %error,
        "Storage file is corrupt, starting empty"
    );
    // The next write replaces the file anyway
    if let Err(e) = fs::rename(path, &aside) {
        warn!(path = %path.display(), error = %e, "Failed to move corrupt storage file aside");
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_storage_roundtrip() {
        let storage = MemoryStorage::new();
        assert_eq!(storage.get_item("cart").unwrap(), None);

        storage.set_item("cart", "[]").unwrap();
        assert_eq!(storage.get_item("cart").unwrap().as_deref(), Some("[]"));

        storage.remove_item("cart").unwrap();
        assert_eq!(storage.get_item("cart").unwrap(), None);
    }

    #[test]
    fn test_file_storage_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::open(dir.path().join("state.json")).unwrap();
        assert_eq!(storage.get_item("cart").unwrap(), None);
        assert!(!storage.path().exists());
    }

    #[test]
    fn test_file_storage_persists_across_opens() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("state.json");

        let storage = FileStorage::open(&path).unwrap();
        storage.set_item("cart", r#"[{"id":"1"}]"#).unwrap();
        storage.set_item("other", "x").unwrap();
        storage.remove_item("other").unwrap();
        drop(storage);

        let reopened = FileStorage::open(&path).unwrap();
        assert_eq!(
            reopened.get_item("cart").unwrap().as_deref(),
            Some(r#"[{"id":"1"}]"#)
        );
        assert_eq!(reopened.get_item("other").unwrap(), None);
        assert!(!path.with_extension("tmp").exists());
    }

    #[test]
    fn test_file_storage_corrupt_file_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        fs::write(&path, r#"{"cart": "[{"#).unwrap();

        let storage = FileStorage::open(&path).unwrap();
        assert_eq!(storage.get_item("cart").unwrap(), None);
        assert!(!path.exists());
        assert_eq!(
            fs::read_to_string(dir.path().join("state.json.corrupt")).unwrap(),
            r#"{"cart": "[{"#
        );

        storage.set_item("cart", "[]").unwrap();
        let reopened = FileStorage::open(&path).unwrap();
        assert_eq!(reopened.get_item("cart").unwrap().as_deref(), Some("[]"));
    }

    #[test]
    fn test_file_storage_blank_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        fs::write(&path, "\n").unwrap();

        let storage = FileStorage::open(&path).unwrap();
        assert_eq!(storage.get_item("cart").unwrap(), None);
    }
}
