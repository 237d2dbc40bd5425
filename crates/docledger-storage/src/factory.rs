#[cfg(feature = "storage-local")]
use crate::LocalStorage;
#[cfg(feature = "storage-pinata")]
use crate::PinataStorage;
use crate::{ContentStore, StorageBackend, StorageError, StorageResult};
use docledger_core::Config;
use std::sync::Arc;

/// Create a storage backend based on configuration
pub async fn create_storage(config: &Config) -> StorageResult<Arc<dyn ContentStore>> {
    match config.storage_backend {
        #[cfg(feature = "storage-pinata")]
        StorageBackend::Pinata => {
            let jwt = config
                .pinata_jwt
                .clone()
                .ok_or_else(|| StorageError::ConfigError("PINATA_JWT not configured".to_string()))?;
            let gateway = config.pinata_gateway.as_deref().ok_or_else(|| {
                StorageError::ConfigError("PINATA_GATEWAY not configured".to_string())
            })?;

            let storage = PinataStorage::new(
                jwt,
                gateway,
                &config.pinata_upload_url,
                config.pinata_gateway_token.clone(),
                config.http_timeout(),
            )?;
            Ok(Arc::new(storage))
        }

        #[cfg(not(feature = "storage-pinata"))]
        StorageBackend::Pinata => Err(StorageError::ConfigError(
            "Pinata storage backend not available (storage-pinata feature not enabled)".to_string(),
        )),

        #[cfg(feature = "storage-local")]
        StorageBackend::Local => {
            let storage = LocalStorage::new(&config.local_storage_path).await?;
            Ok(Arc::new(storage))
        }

        #[cfg(not(feature = "storage-local"))]
        StorageBackend::Local => Err(StorageError::ConfigError(
            "Local storage backend not available (storage-local feature not enabled)".to_string(),
        )),
    }
}

#[cfg(all(test, feature = "storage-local", feature = "storage-pinata"))]
mod tests {
    use super::*;

    #[tokio::test]
    async fn creates_local_backend() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config {
            storage_backend: StorageBackend::Local,
            local_storage_path: dir.path().to_string_lossy().to_string(),
            ..Config::default()
        };

        let storage = create_storage(&config).await.unwrap();
        assert_eq!(storage.backend_type(), StorageBackend::Local);
    }

    #[tokio::test]
    async fn pinata_backend_without_jwt_is_a_config_error() {
        let config = Config {
            storage_backend: StorageBackend::Pinata,
            pinata_gateway: Some("example.mypinata.cloud".to_string()),
            ..Config::default()
        };

        let result = create_storage(&config).await;
        assert!(matches!(result, Err(StorageError::ConfigError(_))));
    }

    #[tokio::test]
    async fn creates_pinata_backend() {
        let config = Config {
            storage_backend: StorageBackend::Pinata,
            pinata_jwt: Some("jwt".to_string()),
            pinata_gateway: Some("example.mypinata.cloud".to_string()),
            ..Config::default()
        };

        let storage = create_storage(&config).await.unwrap();
        assert_eq!(storage.backend_type(), StorageBackend::Pinata);
    }
}
