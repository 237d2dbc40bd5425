//! Materializing retrieved documents on the local machine.

use async_trait::async_trait;
use docledger_core::models::extension_for_media_type;
use docledger_core::{FetchedContent, StorageReference};
use serde::Serialize;
use std::io;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;

/// A document written to disk by the retrieval workflow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Download {
    pub reference: StorageReference,
    pub path: PathBuf,
    pub media_type: String,
    pub size_bytes: usize,
}

/// Where fetched documents end up.
#[async_trait]
pub trait DownloadSink: Send + Sync {
    /// Persist `content` and return the path it was written to.
    async fn save(&self, reference: &StorageReference, content: &FetchedContent) -> io::Result<PathBuf>;
}

/// Writes each document as `<reference>.<ext>` inside one directory.
#[derive(Debug, Clone)]
pub struct DownloadDirectory {
    dir: PathBuf,
}

impl DownloadDirectory {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path(&self) -> &Path {
        &self.dir
    }

    fn file_name(reference: &StorageReference, media_type: &str) -> String {
        // Path separators cannot come from a well-formed identifier; strip them anyway.
        let stem: String = reference
            .as_str()
            .chars()
            .map(|c| if matches!(c, '/' | '\\' | ':') { '_' } else { c })
            .collect();
        let stem = stem.trim_start_matches('.');
        format!("{}.{}", stem, extension_for_media_type(media_type))
    }
}

#[async_trait]
impl DownloadSink for DownloadDirectory {
    async fn save(&self, reference: &StorageReference, content: &FetchedContent) -> io::Result<PathBuf> {
        fs::create_dir_all(&self.dir).await?;

        let path = self.dir.join(Self::file_name(reference, &content.media_type));
        let mut file = fs::File::create(&path).await?;
        file.write_all(&content.bytes).await?;
        file.flush().await?;

        tracing::debug!(path = %path.display(), size = content.bytes.len(), "Document saved");

        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use tempfile::TempDir;

    fn content(bytes: &'static [u8], media_type: &str) -> FetchedContent {
        FetchedContent {
            bytes: Bytes::from_static(bytes),
            media_type: media_type.to_string(),
        }
    }

    #[tokio::test]
    async fn saves_with_extension_from_media_type() {
        let temp_dir = TempDir::new().unwrap();
        let downloads = DownloadDirectory::new(temp_dir.path().join("downloads"));

        let path = downloads
            .save(&StorageReference::new("cid-123"), &content(b"%PDF-1.7", "application/pdf"))
            .await
            .unwrap();

        assert_eq!(path.file_name().unwrap(), "cid-123.pdf");
        assert_eq!(std::fs::read(&path).unwrap(), b"%PDF-1.7");
    }

    #[tokio::test]
    async fn unknown_media_type_falls_back_to_bin() {
        let temp_dir = TempDir::new().unwrap();
        let downloads = DownloadDirectory::new(temp_dir.path());

        let path = downloads
            .save(&StorageReference::new("cid-1"), &content(b"x", "application/x-custom"))
            .await
            .unwrap();

        assert_eq!(path.file_name().unwrap(), "cid-1.bin");
    }

    #[test]
    fn separators_never_escape_the_directory() {
        let name = DownloadDirectory::file_name(&StorageReference::new("../etc/passwd"), "text/plain");
        assert!(!name.contains('/'));
        assert!(!name.starts_with('.'));
    }
}
