use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use tracing::debug;

use crate::error::StorageResult;
use crate::lock;

/// A string key-value medium that persisted state is mirrored into.
///
/// Implementations must be safe to call from store listeners, which may run
/// on any thread that writes to the store.
pub trait Storage: Send + Sync {
    /// Read the document stored under `key`.
    ///
    /// Returns `Ok(None)` if nothing is stored.
    fn get_item(&self, key: &str) -> StorageResult<Option<String>>;

    /// Store `value` under `key`, replacing any previous document.
    fn set_item(&self, key: &str, value: &str) -> StorageResult<()>;

    /// Remove the document under `key`. Removing a missing key is not an error.
    fn remove_item(&self, key: &str) -> StorageResult<()>;
}

/// In-memory storage, for tests and embedding.
#[derive(Default)]
pub struct MemoryStorage {
    items: RwLock<BTreeMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a document, as if written by an earlier session.
    pub fn with_item(self, key: impl Into<String>, value: impl Into<String>) -> Self {
        lock::write(&self.items).insert(key.into(), value.into());
        self
    }

    /// The document under `key`, if any.
    pub fn item(&self, key: &str) -> Option<String> {
        lock::read(&self.items).get(key).cloned()
    }

    /// All stored documents, sorted by key.
    pub fn items(&self) -> Vec<(String, String)> {
        lock::read(&self.items)
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    pub fn len(&self) -> usize {
        lock::read(&self.items).len()
    }

    pub fn is_empty(&self) -> bool {
        lock::read(&self.items).is_empty()
    }
}

impl Storage for MemoryStorage {
    fn get_item(&self, key: &str) -> StorageResult<Option<String>> {
        Ok(self.item(key))
    }

    fn set_item(&self, key: &str, value: &str) -> StorageResult<()> {
        lock::write(&self.items).insert(key.to_owned(), value.to_owned());
        Ok(())
    }

    fn remove_item(&self, key: &str) -> StorageResult<()> {
        lock::write(&self.items).remove(key);
        Ok(())
    }
}

impl std::fmt::Debug for MemoryStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryStorage")
            .field("item_count", &self.len())
            .finish()
    }
}

/// Directory-backed storage: one `<key>.json` file per key.
///
/// Keys are mapped to file names by percent-encoding every byte outside
/// `[A-Za-z0-9_-]` (including `%` itself), so distinct keys never share a
/// file. Writes go to a temporary file that is then renamed over the target,
/// so readers never see a partial document.
#[derive(Debug, Clone)]
pub struct FileStorage {
    dir: PathBuf,
}

impl FileStorage {
    /// Open (and create if needed) a storage directory.
    pub fn open(dir: impl Into<PathBuf>) -> StorageResult<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        debug!(dir = %dir.display(), "file storage opened");
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the file holding `key`.
    pub fn path_for(&self, key: &str) -> PathBuf {
        let mut name = String::with_capacity(key.len());
        for byte in key.bytes() {
            if byte.is_ascii_alphanumeric() || byte == b'-' || byte == b'_' {
                name.push(char::from(byte));
            } else {
                name.push_str(&format!("%{byte:02X}"));
            }
        }
        self.dir.join(format!("{name}.json"))
    }
}

impl Storage for FileStorage {
    fn get_item(&self, key: &str) -> StorageResult<Option<String>> {
        match fs::read_to_string(self.path_for(key)) {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn set_item(&self, key: &str, value: &str) -> StorageResult<()> {
        let path = self.path_for(key);
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, value)?;
        if let Err(e) = fs::rename(&tmp, &path) {
            if let Err(cleanup) = fs::remove_file(&tmp) {
                debug!(path = %tmp.display(), error = %cleanup, "failed to remove temporary file");
            }
            return Err(e.into());
        }
        Ok(())
    }

    fn remove_item(&self, key: &str) -> StorageResult<()> {
        match fs::remove_file(self.path_for(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
