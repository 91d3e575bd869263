#[cfg(feature = "azure")]
mod azure;
mod config;
mod local;
#[cfg(feature = "s3")]
mod s3;
pub mod signing;

#[cfg(feature = "azure")]
pub use azure::AzureBlobStore;
pub use config::{AzureConfig, LocalConfig, S3Config, StoreConfig};
pub use local::{LocalStore, StoredObject};
#[cfg(feature = "s3")]
pub use s3::S3Store;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("invalid object key: {0}")]
    InvalidKey(String),

    #[error("invalid storage configuration: {0}")]
    InvalidConfig(String),

    #[error("store error: {0}")]
    Internal(String),
}

/// A blob container that accepts uploads and hands out time-limited read links.
///
/// One instance is bound to one container; keys are flat object names inside it.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Name of the container this store writes into.
    fn container(&self) -> &str;

    /// Create the container if it does not exist yet. Succeeds if it already does.
    async fn ensure_container(&self) -> Result<(), StoreError>;

    /// Write (create or overwrite) an object, tagging it with `content_type`.
    async fn put(&self, key: &str, data: Bytes, content_type: &str) -> Result<(), StoreError>;

    /// Absolute URL granting read-only access to exactly this object until `ttl` elapses.
    async fn signed_read_url(&self, key: &str, ttl: Duration) -> Result<String, StoreError>;
}

// -- Factory --

/// Create an `ObjectStore` for `container` from configuration.
pub fn create_store(config: &StoreConfig, container: &str) -> Result<Arc<dyn ObjectStore>, StoreError> {
    match config {
        StoreConfig::Local(local) => Ok(Arc::new(LocalStore::new(local, container))),
        StoreConfig::Azure(azure) => {
            #[cfg(feature = "azure")]
            {
                Ok(Arc::new(AzureBlobStore::new(azure, container)?))
            }
            #[cfg(not(feature = "azure"))]
            {
                let _ = azure;
                Err(StoreError::InvalidConfig(
                    "Azure configuration detected but the 'azure' feature is not enabled".into(),
                ))
            }
        }
        StoreConfig::S3(s3) => {
            #[cfg(feature = "s3")]
            {
                Ok(Arc::new(S3Store::new(s3, container)?))
            }
            #[cfg(not(feature = "s3"))]
            {
                let _ = s3;
                Err(StoreError::InvalidConfig(
                    "S3 configuration detected but the 's3' feature is not enabled".into(),
                ))
            }
        }
    }
}

/// Expiry instant for a link issued now with the given lifetime.
pub(crate) fn expiry_from_now(ttl: Duration) -> Result<chrono::DateTime<chrono::Utc>, StoreError> {
    let ttl = chrono::Duration::from_std(ttl)
        .map_err(|e| StoreError::Internal(format!("ttl out of range: {e}")))?;
    Ok(chrono::Utc::now() + ttl)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_store_local() {
        let tmp = tempfile::tempdir().unwrap();
        let config = StoreConfig::from_connection_string(&format!(
            "Provider=local;Path={};SigningKey=k",
            tmp.path().display()
        ))
        .unwrap();
        let store = create_store(&config, "uploads").unwrap();
        assert_eq!(store.container(), "uploads");
    }

    #[cfg(feature = "azure")]
    #[test]
    fn create_store_azure() {
        let config = StoreConfig::from_connection_string("UseDevelopmentStorage=true").unwrap();
        let store = create_store(&config, "uploads").unwrap();
        assert_eq!(store.container(), "uploads");
    }

    #[cfg(feature = "s3")]
    #[test]
    fn create_store_s3() {
        let config = StoreConfig::from_connection_string(
            "Provider=s3;Endpoint=http://localhost:3900;Region=garage;AccessKeyId=key;SecretAccessKey=secret",
        )
        .unwrap();
        let store = create_store(&config, "uploads").unwrap();
        assert_eq!(store.container(), "uploads");
    }

    #[test]
    fn expiry_is_in_the_future() {
        let before = chrono::Utc::now();
        let expiry = expiry_from_now(Duration::from_secs(60)).unwrap();
        assert!(expiry > before + chrono::Duration::seconds(59));
    }
}
