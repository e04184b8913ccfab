//! Cold storage for evicted revisions.
//!
//! Archives are written once per eviction at a deterministic key, so a rerun
//! overwrites the previous copy rather than creating a new one.
//!
//! - **Filesystem**: archives under a local (or mounted) directory
//! - **S3**: archives in S3-compatible object storage
//!
//! The choice of backend is configured via `[cold_storage]` in the config.

mod cipher;
mod filesystem;
#[cfg(feature = "s3-storage")]
mod s3;

use std::sync::Arc;

use async_trait::async_trait;
pub use cipher::{ArchiveCipher, CipherError};
pub use filesystem::FilesystemColdStore;
#[cfg(feature = "s3-storage")]
pub use s3::S3ColdStore;
use thiserror::Error;
use tracing::info;

use crate::config::{ColdStorageBackend, ColdStorageConfig};

/// Errors that can occur while archiving.
#[derive(Debug, Error)]
pub enum ColdStoreError {
    #[error("Storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Encryption requested but no cold_storage.encryption_key is configured")]
    MissingKey,

    #[error(transparent)]
    Cipher(#[from] CipherError),

    #[error("Invalid archive key '{0}'")]
    InvalidKey(String),

    #[error("S3 error: {0}")]
    S3(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

/// Durable write-only archive.
///
/// Implementations must be `Send + Sync`; one store is shared by every
/// cluster task in a run.
#[async_trait]
pub trait ColdStore: Send + Sync {
    /// Write `payload` at `key`, replacing any existing object. When `encrypt`
    /// is set the payload is sealed before it leaves the process.
    async fn put(&self, key: &str, payload: Vec<u8>, encrypt: bool) -> Result<(), ColdStoreError>;

    /// Get the backend type name (for logging/debugging).
    fn backend_name(&self) -> &'static str;
}

/// Seal `payload` when asked to, failing if no key is available.
fn prepare_payload(
    cipher: Option<&ArchiveCipher>,
    payload: Vec<u8>,
    encrypt: bool,
) -> Result<Vec<u8>, ColdStoreError> {
    if !encrypt {
        return Ok(payload);
    }
    let cipher = cipher.ok_or(ColdStoreError::MissingKey)?;
    Ok(cipher.seal(&payload)?)
}

/// Create a cold store from configuration.
pub async fn create_cold_store(
    config: &ColdStorageConfig,
) -> Result<Arc<dyn ColdStore>, ColdStoreError> {
    let cipher = config
        .encryption_key_bytes()
        .map_err(ColdStoreError::Config)?
        .map(|key| ArchiveCipher::new(&key));

    match config.backend {
        ColdStorageBackend::Filesystem => {
            let fs_config = config.filesystem.clone().ok_or_else(|| {
                ColdStoreError::Config(
                    "Filesystem backend requires [cold_storage.filesystem] config".to_string(),
                )
            })?;
            info!(path = %fs_config.path, "Using filesystem cold storage backend");
            Ok(Arc::new(FilesystemColdStore::new(fs_config, cipher)?))
        }
        #[cfg(feature = "s3-storage")]
        ColdStorageBackend::S3 => {
            let s3_config = config.s3.clone().ok_or_else(|| {
                ColdStoreError::Config("S3 backend requires [cold_storage.s3] config".to_string())
            })?;
            info!(bucket = %s3_config.bucket, "Using S3 cold storage backend");
            Ok(Arc::new(S3ColdStore::new(s3_config, cipher).await))
        }
        #[cfg(not(feature = "s3-storage"))]
        ColdStorageBackend::S3 => Err(ColdStoreError::Config(
            "S3 cold storage backend requires the 's3-storage' feature. \
                Rebuild with: cargo build --features s3-storage"
                .to_string(),
        )),
    }
}
