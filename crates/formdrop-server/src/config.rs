use std::net::{IpAddr, SocketAddr};

use clap::Parser;
use formdrop_core::submission::MAX_TOTAL_BYTES;
use formdrop_mail::{MailConfig, DEFAULT_RESEND_API_URL};
use formdrop_store::{StoreConfig, StoreError};

const DEFAULT_BODY_LIMIT: usize = 64 * 1024 * 1024;

/// Contact form handler: uploads attached images and emails a notification.
#[derive(Debug, Clone, Parser)]
#[command(name = "formdrop-server", version)]
pub struct ServerConfig {
    /// Address to listen on.
    #[arg(long, env = "FORMDROP_BIND", default_value = "0.0.0.0")]
    pub bind: IpAddr,

    /// Port to listen on. Defaults to the Functions custom handler port.
    #[arg(long, env = "FUNCTIONS_CUSTOMHANDLER_PORT", default_value_t = 7071)]
    pub port: u16,

    /// Object storage connection string (Azure, `Provider=s3;...` or `Provider=local;...`).
    #[arg(long, env = "FORMDROP_STORAGE_CONNECTION_STRING", hide_env_values = true)]
    pub storage_connection_string: Option<String>,

    #[arg(long, env = "AZURE_STORAGE_CONNECTION_STRING", hide = true, hide_env_values = true)]
    pub azure_storage_connection_string: Option<String>,

    /// Container (bucket) that receives the uploads.
    #[arg(long, env = "FORMDROP_CONTAINER", default_value = "uploads")]
    pub container: String,

    #[arg(long, env = "RESEND_API_KEY", hide_env_values = true)]
    pub resend_api_key: Option<String>,

    /// Address that receives every notification.
    #[arg(long, env = "CONTACT_TO_EMAIL")]
    pub contact_to_email: Option<String>,

    #[arg(long, env = "RESEND_API_URL", default_value = DEFAULT_RESEND_API_URL)]
    pub resend_api_url: String,

    /// Combined size cap for the images of one submission, in bytes.
    #[arg(long, env = "FORMDROP_MAX_UPLOAD_BYTES", default_value_t = MAX_TOTAL_BYTES)]
    pub max_upload_bytes: u64,

    /// Cap on the raw request body, in bytes.
    #[arg(long, env = "FORMDROP_BODY_LIMIT", default_value_t = DEFAULT_BODY_LIMIT)]
    pub body_limit: usize,

    /// Origins allowed to post the form from a browser.
    #[arg(long, env = "FORMDROP_CORS_ORIGINS", value_delimiter = ',')]
    pub cors_origins: Vec<String>,
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

impl ServerConfig {
    pub fn addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind, self.port)
    }

    /// Raw storage connection string, preferring the formdrop-specific variable.
    pub fn storage_connection_string(&self) -> Option<&str> {
        non_empty(&self.storage_connection_string)
            .or_else(|| non_empty(&self.azure_storage_connection_string))
    }

    /// `Ok(None)` when storage is not configured; an unparsable string is an error.
    pub fn store_config(&self) -> Result<Option<StoreConfig>, StoreError> {
        self.storage_connection_string()
            .map(StoreConfig::from_connection_string)
            .transpose()
    }

    /// `None` unless both the API key and the recipient are set.
    pub fn mail_config(&self) -> Option<MailConfig> {
        let api_key = non_empty(&self.resend_api_key)?;
        let recipient = non_empty(&self.contact_to_email)?;
        Some(MailConfig::new(api_key, recipient).with_api_url(self.resend_api_url.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> ServerConfig {
        let mut argv = vec!["formdrop-server"];
        argv.extend_from_slice(args);
        ServerConfig::try_parse_from(argv).unwrap()
    }

    #[test]
    fn defaults() {
        let config = parse(&["--storage-connection-string", "", "--resend-api-key", ""]);
        assert_eq!(config.port, 7071);
        assert_eq!(config.container, "uploads");
        assert_eq!(config.max_upload_bytes, 50 * 1024 * 1024);
        assert!(config.storage_connection_string().is_none());
        assert!(config.mail_config().is_none());
    }

    #[test]
    fn formdrop_connection_string_wins_over_azure() {
        let config = parse(&[
            "--storage-connection-string",
            "Provider=local;Path=/tmp/x;SigningKey=k",
            "--azure-storage-connection-string",
            "UseDevelopmentStorage=true",
        ]);
        assert!(matches!(
            config.store_config().unwrap(),
            Some(StoreConfig::Local(_))
        ));

        let config = parse(&[
            "--storage-connection-string",
            " ",
            "--azure-storage-connection-string",
            "UseDevelopmentStorage=true",
        ]);
        assert!(matches!(
            config.store_config().unwrap(),
            Some(StoreConfig::Azure(_))
        ));
    }

    #[test]
    fn invalid_connection_string_is_an_error() {
        let config = parse(&["--storage-connection-string", "garbage"]);
        assert!(config.store_config().is_err());
    }

    #[test]
    fn mail_needs_key_and_recipient() {
        let config = parse(&["--resend-api-key", "re_123", "--contact-to-email", ""]);
        assert!(config.mail_config().is_none());

        let config = parse(&[
            "--resend-api-key",
            "re_123",
            "--contact-to-email",
            "owner@example.hu",
            "--resend-api-url",
            "http://127.0.0.1:9/",
        ]);
        let mail = config.mail_config().unwrap();
        assert_eq!(mail.recipient, "owner@example.hu");
        assert_eq!(mail.api_url, "http://127.0.0.1:9");
    }

    #[test]
    fn cors_origins_are_comma_separated() {
        let config = parse(&["--cors-origins", "https://a.hu,https://b.hu"]);
        assert_eq!(config.cors_origins, vec!["https://a.hu", "https://b.hu"]);
    }
}
