//! Content Hasher
//!
//! SHA-256 fingerprints of selected files, computed locally and independently
//! of whatever addressing scheme the storage network uses.

use bytes::Bytes;
use sha2::{Digest, Sha256};
use thiserror::Error;

use crate::error::UserFacing;
use crate::models::{ContentFingerprint, SelectedFile};

#[derive(Debug, Error)]
pub enum HashError {
    #[error("Source unavailable: {name}: {cause}")]
    SourceUnavailable { name: String, cause: String },
}

impl UserFacing for HashError {
    fn error_code(&self) -> &'static str {
        match self {
            HashError::SourceUnavailable { .. } => "SOURCE_UNAVAILABLE",
        }
    }

    fn user_message(&self) -> String {
        match self {
            HashError::SourceUnavailable { name, .. } => {
                format!("The file \"{}\" could not be read. Select it again.", name)
            }
        }
    }

    fn is_recoverable(&self) -> bool {
        true
    }
}

/// Deterministic content fingerprinting.
#[derive(Debug, Clone, Copy, Default)]
pub struct ContentHasher;

impl ContentHasher {
    /// Fingerprint a byte payload. Pure; same bytes always give the same digest.
    pub fn hash(bytes: &[u8]) -> ContentFingerprint {
        let digest = Sha256::digest(bytes);
        ContentFingerprint::from_digest(&digest)
    }

    /// Capture the file's bytes and fingerprint them.
    ///
    /// The returned bytes are the exact payload that was fingerprinted. On read
    /// failure nothing partial is returned.
    pub async fn hash_file(file: &SelectedFile) -> Result<(Bytes, ContentFingerprint), HashError> {
        let bytes = file.read().await.map_err(|e| HashError::SourceUnavailable {
            name: file.name().to_string(),
            cause: e.to_string(),
        })?;

        let fingerprint = Self::hash(&bytes);

        tracing::debug!(
            file = %file.name(),
            size_bytes = bytes.len(),
            fingerprint = %fingerprint,
            "Computed content fingerprint"
        );

        Ok((bytes, fingerprint))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_is_deterministic() {
        let payload = vec![7u8; 10 * 1024];
        assert_eq!(ContentHasher::hash(&payload), ContentHasher::hash(&payload));
    }

    #[test]
    fn different_bytes_give_different_fingerprints() {
        assert_ne!(ContentHasher::hash(b"dose 1"), ContentHasher::hash(b"dose 2"));
    }

    #[test]
    fn known_sha256_vector() {
        assert_eq!(
            ContentHasher::hash(b"").as_str(),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
        assert_eq!(ContentHasher::hash(b"abc").as_str().len(), 64);
    }

    #[tokio::test]
    async fn hash_file_returns_captured_bytes() {
        let file = SelectedFile::from_bytes("note.txt", "text/plain", b"abc".to_vec());
        let (bytes, fingerprint) = ContentHasher::hash_file(&file).await.unwrap();
        assert_eq!(&bytes[..], b"abc");
        assert_eq!(
            fingerprint.as_str(),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[tokio::test]
    async fn unreadable_source_is_reported() {
        let file = SelectedFile::from_path("/nonexistent/docledger/scan.png");
        let err = ContentHasher::hash_file(&file).await.unwrap_err();
        assert!(matches!(err, HashError::SourceUnavailable { ref name, .. } if name == "scan.png"));
        assert_eq!(err.error_code(), "SOURCE_UNAVAILABLE");
    }
}
