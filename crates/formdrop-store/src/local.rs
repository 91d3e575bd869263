use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};

use crate::config::LocalConfig;
use crate::{expiry_from_now, signing, ObjectStore, StoreError};

const READ_PERMISSION: &str = "r";
const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// Filesystem-backed store. Download links point at the server's `/blobs`
/// route and carry an HMAC over container, key, permission and expiry.
pub struct LocalStore {
    root: PathBuf,
    container: String,
    public_url: String,
    signing_key: Vec<u8>,
}

impl std::fmt::Debug for LocalStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalStore")
            .field("root", &self.root)
            .field("container", &self.container)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone)]
pub struct StoredObject {
    pub data: Bytes,
    pub content_type: String,
}

impl LocalStore {
    pub fn new(config: &LocalConfig, container: &str) -> Self {
        Self {
            root: config.root.clone(),
            container: container.to_string(),
            public_url: config.public_url.trim_end_matches('/').to_string(),
            signing_key: config.signing_key.as_bytes().to_vec(),
        }
    }

    fn object_path(&self, key: &str) -> Result<PathBuf, StoreError> {
        validate_key(key)?;
        Ok(self.root.join(&self.container).join(key))
    }

    fn content_type_path(&self, key: &str) -> PathBuf {
        self.root.join(".meta").join(&self.container).join(key)
    }

    /// Read an object together with the content type it was stored with.
    pub async fn read(&self, key: &str) -> Result<StoredObject, StoreError> {
        let path = self.object_path(key)?;
        let data = match tokio::fs::read(&path).await {
            Ok(data) => Bytes::from(data),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(StoreError::NotFound(key.to_string()))
            }
            Err(e) => {
                return Err(StoreError::Internal(format!(
                    "read {}: {e}",
                    path.display()
                )))
            }
        };
        let content_type = tokio::fs::read_to_string(self.content_type_path(key))
            .await
            .unwrap_or_else(|_| DEFAULT_CONTENT_TYPE.to_string());
        Ok(StoredObject { data, content_type })
    }

    /// Absolute download URL for `key`, valid until `expires_at`.
    pub fn read_url(&self, key: &str, expires_at: DateTime<Utc>) -> String {
        let se = expires_at.timestamp();
        let sig = signing::sign(
            &self.signing_key,
            &string_to_sign(&self.container, key, READ_PERMISSION, se),
        );
        format!(
            "{}/{}/{}?se={se}&sp={READ_PERMISSION}&sig={}",
            self.public_url,
            self.container,
            key,
            urlencoding::encode(&sig)
        )
    }

    /// Check the query of a download link produced by [`LocalStore::read_url`].
    pub fn verify_read(
        &self,
        key: &str,
        expires: i64,
        permissions: &str,
        signature: &str,
        now: DateTime<Utc>,
    ) -> bool {
        if permissions != READ_PERMISSION || now.timestamp() > expires {
            return false;
        }
        signing::verify(
            &self.signing_key,
            &string_to_sign(&self.container, key, permissions, expires),
            signature,
        )
    }
}

fn string_to_sign(container: &str, key: &str, permissions: &str, expires: i64) -> String {
    format!("{permissions}\n{expires}\n/{container}/{key}")
}

/// Keys are flat names; anything that could escape the container directory is refused.
fn validate_key(key: &str) -> Result<(), StoreError> {
    let bad = key.is_empty()
        || key.starts_with('.')
        || key.contains(['/', '\\', '\0']);
    if bad {
        return Err(StoreError::InvalidKey(key.to_string()));
    }
    Ok(())
}

async fn write_file(path: &Path, data: &[u8]) -> Result<(), StoreError> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| StoreError::Internal(format!("mkdir: {e}")))?;
    }
    tokio::fs::write(path, data)
        .await
        .map_err(|e| StoreError::Internal(format!("write {}: {e}", path.display())))
}

#[async_trait]
impl ObjectStore for LocalStore {
    fn container(&self) -> &str {
        &self.container
    }

    async fn ensure_container(&self) -> Result<(), StoreError> {
        let dir = self.root.join(&self.container);
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|e| StoreError::Internal(format!("mkdir {}: {e}", dir.display())))
    }

    async fn put(&self, key: &str, data: Bytes, content_type: &str) -> Result<(), StoreError> {
        let path = self.object_path(key)?;
        write_file(&path, &data).await?;
        write_file(&self.content_type_path(key), content_type.as_bytes()).await
    }

    async fn signed_read_url(&self, key: &str, ttl: Duration) -> Result<String, StoreError> {
        validate_key(key)?;
        Ok(self.read_url(key, expiry_from_now(ttl)?))
    }
}
