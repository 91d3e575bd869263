use async_trait::async_trait;
use reqwest::{Client, StatusCode};

use crate::{MailConfig, MailError, Mailer, OutgoingEmail};

/// Sends mail through the Resend HTTP API.
pub struct ResendMailer {
    client: Client,
    api_url: String,
    api_key: String,
}

impl std::fmt::Debug for ResendMailer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResendMailer")
            .field("api_url", &self.api_url)
            .finish_non_exhaustive()
    }
}

impl ResendMailer {
    pub fn new(config: &MailConfig) -> Self {
        Self {
            client: Client::new(),
            api_url: config.api_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
        }
    }
}

/// Resend reports failures as `{"statusCode": .., "message": .., "name": ..}`.
async fn parse_error(status: StatusCode, resp: reqwest::Response) -> MailError {
    let body = resp.text().await.unwrap_or_default();
    let msg = serde_json::from_str::<serde_json::Value>(&body)
        .ok()
        .and_then(|v| v["message"].as_str().map(String::from))
        .unwrap_or(body);
    if msg.is_empty() {
        MailError::Rejected(format!("email API returned {status}"))
    } else {
        MailError::Rejected(msg)
    }
}

#[async_trait]
impl Mailer for ResendMailer {
    async fn send(&self, email: &OutgoingEmail) -> Result<(), MailError> {
        let resp = self
            .client
            .post(format!("{}/emails", self.api_url))
            .bearer_auth(&self.api_key)
            .json(email)
            .send()
            .await
            .map_err(|e| MailError::Transport(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(parse_error(status, resp).await);
        }
        let id = resp
            .json::<serde_json::Value>()
            .await
            .ok()
            .and_then(|v| v["id"].as_str().map(String::from));
        tracing::info!(id = id.as_deref().unwrap_or("-"), to = ?email.to, "notification email accepted");
        Ok(())
    }
}
