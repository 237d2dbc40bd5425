//! Storage abstraction trait
//!
//! This module defines the ContentStore trait that all storage backends must implement.

use crate::StorageBackend;
use async_trait::async_trait;
use bytes::Bytes;
use docledger_core::{FetchedContent, StorageReference, UserFacing};
use thiserror::Error;

/// Storage operation errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Upload failed: {0}")]
    UploadFailed(String),

    #[error("Content not found: {0}")]
    NotFound(String),

    #[error("Retrieval failed: {0}")]
    RetrievalFailed(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl UserFacing for StorageError {
    fn error_code(&self) -> &'static str {
        match self {
            StorageError::UploadFailed(_) => "UPLOAD_FAILED",
            StorageError::NotFound(_) => "NOT_FOUND",
            StorageError::RetrievalFailed(_) => "RETRIEVAL_FAILED",
            StorageError::IoError(_) => "STORAGE_IO_ERROR",
            StorageError::ConfigError(_) => "STORAGE_CONFIG_ERROR",
        }
    }

    fn user_message(&self) -> String {
        match self {
            StorageError::UploadFailed(_) => {
                "The file could not be uploaded to the storage network.".to_string()
            }
            StorageError::NotFound(_) => {
                "No document with this identifier exists on the storage network.".to_string()
            }
            StorageError::RetrievalFailed(_) => {
                "The document could not be downloaded from the storage network.".to_string()
            }
            StorageError::IoError(_) => "A local storage error occurred.".to_string(),
            StorageError::ConfigError(_) => "Document storage is not configured.".to_string(),
        }
    }

    fn is_recoverable(&self) -> bool {
        matches!(
            self,
            StorageError::UploadFailed(_) | StorageError::RetrievalFailed(_)
        )
    }
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Content-addressed storage client
///
/// Implementations are stateless between calls: no identifier, payload or
/// session is remembered once a call returns.
#[async_trait]
pub trait ContentStore: Send + Sync {
    /// Publish bytes and return the identifier the network assigned to them.
    ///
    /// Fails with `UploadFailed` on transport, auth or non-2xx errors.
    async fn publish(
        &self,
        data: Bytes,
        media_type: &str,
        name: &str,
    ) -> StorageResult<StorageReference>;

    /// Fetch bytes previously published under `reference`.
    ///
    /// Fails with `NotFound` if the network has no such content and
    /// `RetrievalFailed` on transport errors.
    async fn fetch(&self, reference: &StorageReference) -> StorageResult<FetchedContent>;

    /// Get the storage backend type
    fn backend_type(&self) -> StorageBackend;
}
