//! Key-value blob persistence seam.

/// Errors returned by blob stores.
#[derive(Debug, thiserror::Error)]
pub enum BlobError {
    /// IO error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    /// Backend-specific failure.
    #[error("blob backend error: {0}")]
    Backend(String),
}

/// Stores whole blobs under fixed logical names.
pub trait BlobStore: Send + Sync {
    /// Read a blob, `None` when nothing was stored under `key`.
    fn read(&self, key: &str) -> Result<Option<Vec<u8>>, BlobError>;
    /// Replace the blob stored under `key`.
    fn write(&self, key: &str, bytes: &[u8]) -> Result<(), BlobError>;
}
