use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;

use crate::StoreError;

/// Well-known account of the Azurite storage emulator.
const AZURITE_ACCOUNT: &str = "devstoreaccount1";
const AZURITE_KEY: &str =
    "Eby8vdM02xNOcqFlqUwJPLlmEtlCDXJ1OUzFT50uSRZ6IFsuFq2UVErCz4I6tq/K1SZFPTOtr/KBHBeksoGMGw==";
const AZURITE_BLOB_ENDPOINT: &str = "http://127.0.0.1:10000/devstoreaccount1";

const DEFAULT_LOCAL_PUBLIC_URL: &str = "http://127.0.0.1:7071/blobs";

/// Object storage backend selected by a connection string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreConfig {
    Azure(AzureConfig),
    S3(S3Config),
    Local(LocalConfig),
}

#[derive(Clone, PartialEq, Eq)]
pub struct AzureConfig {
    pub account_name: String,
    /// Base64-encoded shared key.
    pub account_key: String,
    /// Blob service base URL, without trailing slash.
    pub blob_endpoint: String,
}

#[derive(Clone, PartialEq, Eq)]
pub struct S3Config {
    /// S3-compatible endpoint URL (e.g., "http://127.0.0.1:3900").
    pub endpoint_url: String,
    /// S3 region (e.g., "garage", "us-east-1").
    pub region: String,
    pub access_key_id: String,
    pub secret_access_key: String,
}

#[derive(Clone, PartialEq, Eq)]
pub struct LocalConfig {
    /// Directory that holds one subdirectory per container.
    pub root: PathBuf,
    /// Base URL under which the server exposes `/{container}/{key}` downloads.
    pub public_url: String,
    /// Secret used to sign download URLs.
    pub signing_key: String,
}

impl fmt::Debug for AzureConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AzureConfig")
            .field("account_name", &self.account_name)
            .field("blob_endpoint", &self.blob_endpoint)
            .finish_non_exhaustive()
    }
}

impl fmt::Debug for S3Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("S3Config")
            .field("endpoint_url", &self.endpoint_url)
            .field("region", &self.region)
            .finish_non_exhaustive()
    }
}

impl fmt::Debug for LocalConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocalConfig")
            .field("root", &self.root)
            .field("public_url", &self.public_url)
            .finish_non_exhaustive()
    }
}

impl StoreConfig {
    /// Parse a `Key=Value;Key=Value` connection string.
    ///
    /// Keys are case-insensitive. `Provider=s3` and `Provider=local` pick the
    /// S3 and filesystem backends; anything else is read as an Azure Storage
    /// connection string (including `UseDevelopmentStorage=true`).
    pub fn from_connection_string(raw: &str) -> Result<Self, StoreError> {
        let pairs = parse_pairs(raw)?;
        let provider = pairs.get("provider").map(|p| p.to_ascii_lowercase());
        match provider.as_deref() {
            Some("s3") => Ok(StoreConfig::S3(S3Config {
                endpoint_url: required(&pairs, "endpoint")?.trim_end_matches('/').to_string(),
                region: pairs
                    .get("region")
                    .cloned()
                    .unwrap_or_else(|| "us-east-1".into()),
                access_key_id: required(&pairs, "accesskeyid")?,
                secret_access_key: required(&pairs, "secretaccesskey")?,
            })),
            Some("local") => Ok(StoreConfig::Local(LocalConfig {
                root: PathBuf::from(required(&pairs, "path")?),
                public_url: pairs
                    .get("publicurl")
                    .map(|u| u.trim_end_matches('/').to_string())
                    .unwrap_or_else(|| DEFAULT_LOCAL_PUBLIC_URL.into()),
                signing_key: required(&pairs, "signingkey")?,
            })),
            Some("azure") | None => azure_from_pairs(&pairs).map(StoreConfig::Azure),
            Some(other) => Err(StoreError::InvalidConfig(format!(
                "unknown provider '{other}'"
            ))),
        }
    }
}

fn azure_from_pairs(pairs: &HashMap<String, String>) -> Result<AzureConfig, StoreError> {
    let dev = pairs
        .get("usedevelopmentstorage")
        .is_some_and(|v| v.eq_ignore_ascii_case("true"));
    if dev {
        return Ok(AzureConfig {
            account_name: AZURITE_ACCOUNT.into(),
            account_key: AZURITE_KEY.into(),
            blob_endpoint: AZURITE_BLOB_ENDPOINT.into(),
        });
    }

    let account_name = required(pairs, "accountname")?;
    let account_key = required(pairs, "accountkey")?;
    if STANDARD.decode(&account_key).is_err() {
        return Err(StoreError::InvalidConfig("AccountKey is not valid base64".into()));
    }

    let blob_endpoint = match pairs.get("blobendpoint") {
        Some(endpoint) => endpoint.trim_end_matches('/').to_string(),
        None => {
            let protocol = pairs
                .get("defaultendpointsprotocol")
                .map(String::as_str)
                .unwrap_or("https");
            let suffix = pairs
                .get("endpointsuffix")
                .map(String::as_str)
                .unwrap_or("core.windows.net");
            format!("{protocol}://{account_name}.blob.{suffix}")
        }
    };

    Ok(AzureConfig {
        account_name,
        account_key,
        blob_endpoint,
    })
}

fn parse_pairs(raw: &str) -> Result<HashMap<String, String>, StoreError> {
    let mut pairs = HashMap::new();
    for segment in raw.split(';') {
        let segment = segment.trim();
        if segment.is_empty() {
            continue;
        }
        // Split on the first '=' only: base64 keys end in '='.
        let (key, value) = segment.split_once('=').ok_or_else(|| {
            StoreError::InvalidConfig(format!("expected Key=Value, got '{segment}'"))
        })?;
        pairs.insert(key.trim().to_ascii_lowercase(), value.trim().to_string());
    }
    if pairs.is_empty() {
        return Err(StoreError::InvalidConfig("connection string is empty".into()));
    }
    Ok(pairs)
}

fn required(pairs: &HashMap<String, String>, key: &str) -> Result<String, StoreError> {
    pairs
        .get(key)
        .filter(|v| !v.is_empty())
        .cloned()
        .ok_or_else(|| StoreError::InvalidConfig(format!("missing '{key}'")))
}
