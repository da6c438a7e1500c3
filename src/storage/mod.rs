//! Key store implementations.

use std::sync::Arc;

use tracing::info;

use crate::config::{StorageConfig, StorageType};
use crate::interfaces::KeyStore;

pub use crate::interfaces::keystore::{Result, StorageError};

pub mod mock;

#[cfg(feature = "dynamo")]
pub mod dynamo;

pub use mock::MockKeyStore;

#[cfg(feature = "dynamo")]
pub use dynamo::DynamoKeyStore;

/// Initialize the key store selected by configuration.
pub async fn init_storage(config: &StorageConfig) -> Result<Arc<dyn KeyStore>> {
    info!(storage = %config.storage_type, "Initializing key store");

    match config.storage_type {
        StorageType::Mock => Ok(Arc::new(MockKeyStore::new())),
        #[cfg(feature = "dynamo")]
        StorageType::Dynamo => Ok(Arc::new(DynamoKeyStore::new(&config.dynamo).await?)),
        #[cfg(not(feature = "dynamo"))]
        StorageType::Dynamo => {
            tracing::error!("DynamoDB storage requested but 'dynamo' feature is not enabled");
            Err(StorageError::NotImplemented(
                "DynamoDB feature not enabled".to_string(),
            ))
        }
    }
}

#[cfg(test)]
mod init_tests {
    use super::*;

    #[tokio::test]
    async fn test_init_mock_storage() {
        let store = init_storage(&StorageConfig::default()).await.unwrap();
        assert!(store.get("docs#1", "document").await.unwrap().is_none());
    }

    #[cfg(not(feature = "dynamo"))]
    #[tokio::test]
    async fn test_init_dynamo_without_feature() {
        let config = StorageConfig {
            storage_type: StorageType::Dynamo,
            ..Default::default()
        };
        assert!(matches!(
            init_storage(&config).await,
            Err(StorageError::NotImplemented(_))
        ));
    }
}
