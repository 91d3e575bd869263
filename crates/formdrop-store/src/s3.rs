use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use s3::creds::Credentials;
use s3::error::S3Error;
use s3::region::Region;
use s3::{Bucket, BucketConfiguration};

use crate::config::S3Config;
use crate::{ObjectStore, StoreError};

/// Longest lifetime S3 accepts for a SigV4 presigned URL.
const MAX_PRESIGN_SECS: u64 = 7 * 24 * 60 * 60;

/// S3-compatible store. The container maps to a bucket of the same name.
pub struct S3Store {
    bucket: Box<Bucket>,
    region: Region,
    credentials: Credentials,
    container: String,
}

impl std::fmt::Debug for S3Store {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("S3Store")
            .field("container", &self.container)
            .finish_non_exhaustive()
    }
}

impl S3Store {
    pub fn new(config: &S3Config, container: &str) -> Result<Self, StoreError> {
        let region = Region::Custom {
            region: config.region.clone(),
            endpoint: config.endpoint_url.clone(),
        };

        let credentials = Credentials::new(
            Some(&config.access_key_id),
            Some(&config.secret_access_key),
            None,
            None,
            None,
        )
        .map_err(|e| StoreError::Internal(format!("credentials: {e}")))?;

        let mut bucket = Bucket::new(container, region.clone(), credentials.clone())
            .map_err(|e| StoreError::Internal(format!("bucket: {e}")))?;
        bucket.set_path_style();

        Ok(Self {
            bucket,
            region,
            credentials,
            container: container.to_string(),
        })
    }
}

fn map_s3_error(e: S3Error) -> StoreError {
    StoreError::Internal(format!("s3: {e}"))
}

#[async_trait]
impl ObjectStore for S3Store {
    fn container(&self) -> &str {
        &self.container
    }

    async fn ensure_container(&self) -> Result<(), StoreError> {
        if self.bucket.exists().await.map_err(map_s3_error)? {
            return Ok(());
        }
        let response = Bucket::create_with_path_style(
            &self.container,
            self.region.clone(),
            self.credentials.clone(),
            BucketConfiguration::default(),
        )
        .await
        .map_err(map_s3_error)?;
        // 409: created concurrently by another request.
        if !response.success() && response.response_code != 409 {
            return Err(StoreError::Internal(format!(
                "s3 create bucket {}: status {}",
                self.container, response.response_code
            )));
        }
        tracing::info!(bucket = %self.container, "created bucket");
        Ok(())
    }

    async fn put(&self, key: &str, data: Bytes, content_type: &str) -> Result<(), StoreError> {
        let response = self
            .bucket
            .put_object_with_content_type(key, &data, content_type)
            .await
            .map_err(map_s3_error)?;
        if response.status_code() >= 300 {
            return Err(StoreError::Internal(format!(
                "s3 put {}: status {}",
                key,
                response.status_code()
            )));
        }
        Ok(())
    }

    async fn signed_read_url(&self, key: &str, ttl: Duration) -> Result<String, StoreError> {
        let secs = ttl.as_secs().clamp(1, MAX_PRESIGN_SECS) as u32;
        self.bucket
            .presign_get(key, secs, None)
            .await
            .map_err(map_s3_error)
    }
}
