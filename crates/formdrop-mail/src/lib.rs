mod resend;

pub use resend::ResendMailer;

use async_trait::async_trait;
use serde::Serialize;

/// Sender identity used for form notifications unless configured otherwise.
pub const DEFAULT_SENDER: &str = "Weboldal <onboarding@resend.dev>";
pub const DEFAULT_RESEND_API_URL: &str = "https://api.resend.com";

#[derive(Debug, thiserror::Error)]
pub enum MailError {
    /// The API answered but refused the message.
    #[error("{0}")]
    Rejected(String),

    #[error("mail transport error: {0}")]
    Transport(String),
}

/// One HTML email, shaped like the Resend `POST /emails` payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutgoingEmail {
    pub from: String,
    pub to: Vec<String>,
    pub subject: String,
    pub html: String,
}

/// Something that can deliver an [`OutgoingEmail`].
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, email: &OutgoingEmail) -> Result<(), MailError>;
}

/// Email API credentials plus the fixed addressing of form notifications.
#[derive(Clone)]
pub struct MailConfig {
    pub api_key: String,
    /// The single address every notification goes to.
    pub recipient: String,
    pub sender: String,
    pub api_url: String,
}

impl std::fmt::Debug for MailConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MailConfig")
            .field("recipient", &self.recipient)
            .field("sender", &self.sender)
            .field("api_url", &self.api_url)
            .finish_non_exhaustive()
    }
}

impl MailConfig {
    pub fn new(api_key: impl Into<String>, recipient: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            recipient: recipient.into(),
            sender: DEFAULT_SENDER.into(),
            api_url: DEFAULT_RESEND_API_URL.into(),
        }
    }

    pub fn with_api_url(mut self, api_url: impl Into<String>) -> Self {
        self.api_url = api_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Address an email from the configured sender to the configured recipient.
    pub fn compose(&self, subject: &str, html: String) -> OutgoingEmail {
        OutgoingEmail {
            from: self.sender.clone(),
            to: vec![self.recipient.clone()],
            subject: subject.to_string(),
            html,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compose_uses_fixed_addressing() {
        let config = MailConfig::new("re_key", "owner@example.hu");
        let email = config.compose("Subject", "<p>hi</p>".into());
        assert_eq!(email.from, "Weboldal <onboarding@resend.dev>");
        assert_eq!(email.to, vec!["owner@example.hu".to_string()]);
        assert_eq!(email.subject, "Subject");
        assert_eq!(email.html, "<p>hi</p>");
    }

    #[test]
    fn api_url_override_drops_trailing_slash() {
        let config = MailConfig::new("k", "r@x").with_api_url("http://127.0.0.1:9000/");
        assert_eq!(config.api_url, "http://127.0.0.1:9000");
    }

    #[test]
    fn debug_hides_api_key() {
        let config = MailConfig::new("re_secret_123", "r@x");
        assert!(!format!("{config:?}").contains("re_secret_123"));
    }

    #[test]
    fn payload_serializes_like_resend_expects() {
        let email = MailConfig::new("k", "r@x").compose("S", "<b>x</b>".into());
        let json = serde_json::to_value(&email).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "from": "Weboldal <onboarding@resend.dev>",
                "to": ["r@x"],
                "subject": "S",
                "html": "<b>x</b>",
            })
        );
    }
}
