use crate::traits::{ContentStore, StorageError, StorageResult};
use crate::StorageBackend;
use async_trait::async_trait;
use bytes::Bytes;
use docledger_core::{FetchedContent, StorageReference};
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use uuid::Uuid;

const IDENTIFIER_PREFIX: &str = "local-";
const MEDIA_TYPE_SUFFIX: &str = ".type";
const DEFAULT_MEDIA_TYPE: &str = "application/octet-stream";

/// Local directory storage implementation
///
/// Stands in for the storage network when working offline. Each published
/// payload gets a fresh random identifier, so identifiers cannot be derived from
/// content, and the declared media type is kept in a sidecar file.
#[derive(Clone)]
pub struct LocalStorage {
    base_path: PathBuf,
}

impl LocalStorage {
    /// Create a new LocalStorage instance rooted at `base_path`.
    pub async fn new(base_path: impl Into<PathBuf>) -> StorageResult<Self> {
        let base_path = base_path.into();

        fs::create_dir_all(&base_path).await.map_err(|e| {
            StorageError::ConfigError(format!(
                "Failed to create storage directory {}: {}",
                base_path.display(),
                e
            ))
        })?;

        Ok(LocalStorage { base_path })
    }

    /// Map an identifier to its payload path.
    ///
    /// Identifiers that could escape the base directory never resolve.
    fn id_to_path(&self, id: &str) -> Option<PathBuf> {
        let valid = id.starts_with(IDENTIFIER_PREFIX)
            && !id.contains("..")
            && !id.contains('/')
            && !id.contains('\\')
            && !id.ends_with(MEDIA_TYPE_SUFFIX);
        valid.then(|| self.base_path.join(id))
    }

    fn media_type_path(path: &Path) -> PathBuf {
        let mut sidecar = path.as_os_str().to_owned();
        sidecar.push(MEDIA_TYPE_SUFFIX);
        PathBuf::from(sidecar)
    }

    fn generate_id() -> String {
        format!("{}{}", IDENTIFIER_PREFIX, Uuid::new_v4().simple())
    }

    async fn write_file(path: &Path, data: &[u8]) -> StorageResult<()> {
        let mut file = fs::File::create(path).await.map_err(|e| {
            StorageError::UploadFailed(format!("Failed to create file {}: {}", path.display(), e))
        })?;

        file.write_all(data).await.map_err(|e| {
            StorageError::UploadFailed(format!("Failed to write file {}: {}", path.display(), e))
        })?;

        file.sync_all().await.map_err(|e| {
            StorageError::UploadFailed(format!("Failed to sync file {}: {}", path.display(), e))
        })?;

        Ok(())
    }
}

#[async_trait]
impl ContentStore for LocalStorage {
    async fn publish(
        &self,
        data: Bytes,
        media_type: &str,
        name: &str,
    ) -> StorageResult<StorageReference> {
        let id = Self::generate_id();
        let path = self.base_path.join(&id);
        let size = data.len();
        let start = std::time::Instant::now();

        Self::write_file(&path, &data).await?;
        Self::write_file(&Self::media_type_path(&path), media_type.as_bytes()).await?;

        tracing::info!(
            path = %path.display(),
            id = %id,
            name = %name,
            size_bytes = size,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Local storage publish successful"
        );

        Ok(StorageReference::new(id))
    }

    async fn fetch(&self, reference: &StorageReference) -> StorageResult<FetchedContent> {
        let path = self
            .id_to_path(reference.as_str())
            .ok_or_else(|| StorageError::NotFound(reference.to_string()))?;
        let start = std::time::Instant::now();

        if !fs::try_exists(&path).await.unwrap_or(false) {
            return Err(StorageError::NotFound(reference.to_string()));
        }

        let data = fs::read(&path).await.map_err(|e| {
            StorageError::RetrievalFailed(format!("Failed to read file {}: {}", path.display(), e))
        })?;

        let media_type = fs::read_to_string(Self::media_type_path(&path))
            .await
            .ok()
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| DEFAULT_MEDIA_TYPE.to_string());

        tracing::info!(
            path = %path.display(),
            id = %reference,
            size_bytes = data.len(),
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Local storage fetch successful"
        );

        Ok(FetchedContent {
            bytes: Bytes::from(data),
            media_type,
        })
    }

    fn backend_type(&self) -> StorageBackend {
        StorageBackend::Local
    }
}
