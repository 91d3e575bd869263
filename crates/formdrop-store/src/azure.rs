//! Azure Blob Storage over its REST API, authorized with shared access signatures.
//!
//! Every request carries a SAS minted locally from the account key, so no
//! per-request SharedKey header signing is needed.

use std::time::Duration;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use reqwest::{Client, StatusCode};

use crate::config::AzureConfig;
use crate::{expiry_from_now, signing, ObjectStore, StoreError};

const SAS_VERSION: &str = "2020-12-06";

/// Lifetime of the write SAS used for a single upload.
const UPLOAD_SAS_TTL: Duration = Duration::from_secs(15 * 60);

pub struct AzureBlobStore {
    client: Client,
    account_name: String,
    account_key: Vec<u8>,
    blob_endpoint: String,
    container: String,
}

impl std::fmt::Debug for AzureBlobStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AzureBlobStore")
            .field("account_name", &self.account_name)
            .field("container", &self.container)
            .finish_non_exhaustive()
    }
}

fn format_sas_time(t: DateTime<Utc>) -> String {
    t.format("%Y-%m-%dT%H:%M:%SZ").to_string()
}

impl AzureBlobStore {
    pub fn new(config: &AzureConfig, container: &str) -> Result<Self, StoreError> {
        let account_key = STANDARD
            .decode(&config.account_key)
            .map_err(|e| StoreError::InvalidConfig(format!("AccountKey: {e}")))?;
        Ok(Self {
            client: Client::new(),
            account_name: config.account_name.clone(),
            account_key,
            blob_endpoint: config.blob_endpoint.trim_end_matches('/').to_string(),
            container: container.to_string(),
        })
    }

    fn container_url(&self) -> String {
        format!("{}/{}", self.blob_endpoint, self.container)
    }

    fn blob_url(&self, key: &str) -> String {
        format!("{}/{}", self.container_url(), key)
    }

    /// Plain-http endpoints (the emulator) must be allowed explicitly.
    fn protocol(&self) -> &'static str {
        if self.blob_endpoint.starts_with("https://") {
            "https"
        } else {
            "https,http"
        }
    }

    /// Service SAS scoped to a single blob.
    pub fn blob_sas(&self, key: &str, permissions: &str, expiry: DateTime<Utc>) -> String {
        let se = format_sas_time(expiry);
        let spr = self.protocol();
        let resource = format!("/blob/{}/{}/{}", self.account_name, self.container, key);

        // sp, st, se, resource, si, sip, spr, sv, sr, snapshot, ses, rscc, rscd, rsce, rscl, rsct
        let string_to_sign = format!(
            "{}\n\n{}\n{}\n\n\n{}\n{}\nb\n\n\n\n\n\n\n",
            permissions, se, resource, spr, SAS_VERSION,
        );
        let signature = signing::sign(&self.account_key, &string_to_sign);

        format!(
            "sp={}&se={}&spr={}&sv={}&sr=b&sig={}",
            permissions,
            urlencoding::encode(&se),
            urlencoding::encode(spr),
            SAS_VERSION,
            urlencoding::encode(&signature),
        )
    }

    /// Account SAS for blob-service container operations.
    fn account_sas(&self, permissions: &str, expiry: DateTime<Utc>) -> String {
        let se = format_sas_time(expiry);
        let spr = self.protocol();

        // account, sp, ss, srt, st, se, sip, spr, sv, ses
        let string_to_sign = format!(
            "{}\n{}\nb\nc\n\n{}\n\n{}\n{}\n\n",
            self.account_name, permissions, se, spr, SAS_VERSION,
        );
        let signature = signing::sign(&self.account_key, &string_to_sign);

        format!(
            "sv={}&ss=b&srt=c&sp={}&se={}&spr={}&sig={}",
            SAS_VERSION,
            permissions,
            urlencoding::encode(&se),
            urlencoding::encode(spr),
            urlencoding::encode(&signature),
        )
    }
}

async fn error_body(response: reqwest::Response) -> String {
    let status = response.status();
    let text = response.text().await.unwrap_or_default();
    format!("status {status}: {text}")
}

#[async_trait]
impl ObjectStore for AzureBlobStore {
    fn container(&self) -> &str {
        &self.container
    }

    async fn ensure_container(&self) -> Result<(), StoreError> {
        let sas = self.account_sas("c", expiry_from_now(UPLOAD_SAS_TTL)?);
        let response = self
            .client
            .put(format!("{}?restype=container&{sas}", self.container_url()))
            .header("x-ms-version", SAS_VERSION)
            .header(reqwest::header::CONTENT_LENGTH, 0)
            .send()
            .await
            .map_err(|e| StoreError::Internal(format!("azure create container: {e}")))?;

        match response.status() {
            StatusCode::CREATED => {
                tracing::info!(container = %self.container, "created blob container");
                Ok(())
            }
            StatusCode::CONFLICT => Ok(()),
            _ => Err(StoreError::Internal(format!(
                "azure create container {}: {}",
                self.container,
                error_body(response).await
            ))),
        }
    }

    async fn put(&self, key: &str, data: Bytes, content_type: &str) -> Result<(), StoreError> {
        let sas = self.blob_sas(key, "cw", expiry_from_now(UPLOAD_SAS_TTL)?);
        let response = self
            .client
            .put(format!("{}?{sas}", self.blob_url(key)))
            .header("x-ms-version", SAS_VERSION)
            .header("x-ms-blob-type", "BlockBlob")
            .header("x-ms-blob-content-type", content_type)
            .header(reqwest::header::CONTENT_TYPE, content_type)
            .body(data)
            .send()
            .await
            .map_err(|e| StoreError::Internal(format!("azure put {key}: {e}")))?;

        if !response.status().is_success() {
            return Err(StoreError::Internal(format!(
                "azure put {key}: {}",
                error_body(response).await
            )));
        }
        Ok(())
    }

    async fn signed_read_url(&self, key: &str, ttl: Duration) -> Result<String, StoreError> {
        let sas = self.blob_sas(key, "r", expiry_from_now(ttl)?);
        Ok(format!("{}?{sas}", self.blob_url(key)))
    }
}
