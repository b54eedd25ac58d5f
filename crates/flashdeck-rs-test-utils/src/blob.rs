use flashdeck_rs_protocol::{BlobError, BlobStore};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

/// In-memory blob store whose reads and writes can be made to fail.
#[derive(Default)]
pub struct ControlledBlobStore {
    blobs: Mutex<HashMap<String, Vec<u8>>>,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
    writes: AtomicUsize,
}

impl ControlledBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Write attempts, including failed ones.
    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }
}

impl BlobStore for ControlledBlobStore {
    fn read(&self, key: &str) -> Result<Option<Vec<u8>>, BlobError> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(BlobError::Backend("read disabled".to_string()));
        }
        Ok(self.blobs.lock().get(key).cloned())
    }

    fn write(&self, key: &str, bytes: &[u8]) -> Result<(), BlobError> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(BlobError::Backend("write disabled".to_string()));
        }
        self.blobs.lock().insert(key.to_string(), bytes.to_vec());
        Ok(())
    }
}
