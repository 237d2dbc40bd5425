use bytes::Bytes;
use std::path::{Path, PathBuf};

const DEFAULT_MEDIA_TYPE: &str = "application/octet-stream";

/// Where the bytes of a selected file live until they are captured.
#[derive(Debug, Clone, PartialEq, Eq)]
enum FileSource {
    Memory(Bytes),
    Path(PathBuf),
}

/// A user-chosen file, regardless of how it was picked.
///
/// Dropped payloads and file-dialog paths both become a `SelectedFile`, so the
/// orchestrator has a single selection entry point.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectedFile {
    name: String,
    media_type: String,
    source: FileSource,
}

impl SelectedFile {
    /// Selection whose bytes are already in memory (e.g. a dropped payload).
    pub fn from_bytes(
        name: impl Into<String>,
        media_type: impl Into<String>,
        bytes: impl Into<Bytes>,
    ) -> Self {
        let media_type = media_type.into();
        Self {
            name: name.into(),
            media_type: if media_type.trim().is_empty() {
                DEFAULT_MEDIA_TYPE.to_string()
            } else {
                media_type
            },
            source: FileSource::Memory(bytes.into()),
        }
    }

    /// Selection of a file on disk. Bytes are read lazily when captured.
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("document")
            .to_string();
        Self {
            name,
            media_type: guess_media_type(&path).to_string(),
            source: FileSource::Path(path),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn media_type(&self) -> &str {
        &self.media_type
    }

    pub fn is_image(&self) -> bool {
        self.media_type.starts_with("image/")
    }

    /// Read the full payload.
    pub async fn read(&self) -> std::io::Result<Bytes> {
        match &self.source {
            FileSource::Memory(bytes) => Ok(bytes.clone()),
            FileSource::Path(path) => tokio::fs::read(path).await.map(Bytes::from),
        }
    }
}

/// Guess a media type from the file extension.
pub fn guess_media_type(path: &Path) -> &'static str {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());

    match extension.as_deref() {
        Some("pdf") => "application/pdf",
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        Some("txt") => "text/plain",
        Some("json") => "application/json",
        Some("xml") => "application/xml",
        Some("doc") => "application/msword",
        Some("docx") => {
            "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
        }
        _ => DEFAULT_MEDIA_TYPE,
    }
}

/// File extension (without dot) for a media type, used when materializing downloads.
pub fn extension_for_media_type(media_type: &str) -> &'static str {
    let essence = media_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();

    match essence.as_str() {
        "application/pdf" => "pdf",
        "image/png" => "png",
        "image/jpeg" => "jpg",
        "image/gif" => "gif",
        "image/webp" => "webp",
        "text/plain" => "txt",
        "application/json" => "json",
        "application/xml" | "text/xml" => "xml",
        "application/msword" => "doc",
        "application/vnd.openxmlformats-officedocument.wordprocessingml.document" => "docx",
        _ => "bin",
    }
}
