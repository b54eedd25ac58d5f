//! Blob store implementations backing the card store.

use flashdeck_rs_protocol::{BlobError, BlobStore};
use log::{debug, info};
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

/// File-backed blob store writing one JSON file per key.
pub struct FileBlobStore {
    /// Root directory for blobs.
    root: PathBuf,
    /// Serialize write access to blob files.
    write_lock: Mutex<()>,
}

impl FileBlobStore {
    /// Create a new store under the given root.
    pub fn new(root: impl AsRef<Path>) -> Result<Self, BlobError> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root)?;
        info!("initialized file blob store (root={})", root.display());
        Ok(Self {
            root,
            write_lock: Mutex::new(()),
        })
    }

    fn blob_path(&self, key: &str) -> Result<PathBuf, BlobError> {
        let valid = !key.is_empty()
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if !valid {
            return Err(BlobError::Backend(format!("invalid blob key: {key:?}")));
        }
        Ok(self.root.join(format!("{key}.json")))
    }
}

impl BlobStore for FileBlobStore {
    fn read(&self, key: &str) -> Result<Option<Vec<u8>>, BlobError> {
        let path = self.blob_path(key)?;
        if !path.exists() {
            debug!("blob missing (key={})", key);
            return Ok(None);
        }
        Ok(Some(fs::read(path)?))
    }

    /// Writes go through a temp file and rename; readers never see a partial blob.
    fn write(&self, key: &str, bytes: &[u8]) -> Result<(), BlobError> {
        let _guard = self.write_lock.lock();
        let path = self.blob_path(key)?;
        let temp_path = self.root.join(format!(".{key}.json.tmp"));
        {
            let mut file = OpenOptions::new()
                .create(true)
                .write(true)
                .truncate(true)
                .open(&temp_path)?;
            file.write_all(bytes)?;
            file.sync_all()?;
        }
        fs::rename(&temp_path, &path)?;
        debug!("blob written (key={}, bytes={})", key, bytes.len());
        Ok(())
    }
}

/// Process-local blob store, used for ephemeral sessions.
#[derive(Default)]
pub struct MemoryBlobStore {
    blobs: RwLock<HashMap<String, Vec<u8>>>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl BlobStore for MemoryBlobStore {
    fn read(&self, key: &str) -> Result<Option<Vec<u8>>, BlobError> {
        Ok(self.blobs.read().get(key).cloned())
    }

    fn write(&self, key: &str, bytes: &[u8]) -> Result<(), BlobError> {
        self.blobs.write().insert(key.to_string(), bytes.to_vec());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{FileBlobStore, MemoryBlobStore};
    use flashdeck_rs_protocol::{BlobError, BlobStore};
    use pretty_assertions::assert_eq;
    use tempfile::tempdir;

    #[test]
    fn file_blob_store_round_trip() {
        let temp = tempdir().expect("tempdir");
        let store = FileBlobStore::new(temp.path().join("data")).expect("store");
        assert_eq!(store.read("decks").expect("read"), None);

        store.write("decks", b"{\"a\":1}").expect("write");
        store.write("decks", b"{\"a\":2}").expect("overwrite");
        assert_eq!(
            store.read("decks").expect("read"),
            Some(b"{\"a\":2}".to_vec())
        );
        assert!(!temp.path().join("data").join(".decks.json.tmp").exists());
    }

    #[test]
    fn file_blob_store_rejects_path_like_keys() {
        let temp = tempdir().expect("tempdir");
        let store = FileBlobStore::new(temp.path()).expect("store");
        let err = store.write("../escape", b"x").expect_err("invalid key");
        assert!(matches!(err, BlobError::Backend(_)));
    }

    #[test]
    fn memory_blob_store_round_trip() {
        let store = MemoryBlobStore::new();
        store.write("decks", b"[]").expect("write");
        assert_eq!(store.read("decks").expect("read"), Some(b"[]".to_vec()));
        assert_eq!(store.read("other").expect("read"), None);
    }
}
