use std::sync::Arc;

use formdrop_core::notification::{compose_notification, NOTIFICATION_SUBJECT};
use formdrop_core::submission::READ_URL_TTL;
use formdrop_core::{KeyMinter, StoredAsset, Submission};
use formdrop_mail::{MailConfig, Mailer};
use formdrop_store::ObjectStore;
use tracing::info;

use crate::error::SubmitError;
use crate::routes::InnerAppState;

/// Email delivery plus the addressing it is used with.
#[derive(Clone)]
pub struct Notifier {
    pub mailer: Arc<dyn Mailer>,
    pub config: MailConfig,
}

/// Uploads a decoded submission and sends the notification for it.
pub struct SubmissionHandler<'a> {
    store: &'a dyn ObjectStore,
    notifier: &'a Notifier,
}

impl<'a> SubmissionHandler<'a> {
    pub fn new(store: &'a dyn ObjectStore, notifier: &'a Notifier) -> Self {
        Self { store, notifier }
    }

    /// Fails with `Configuration` unless storage and email are both set up.
    pub fn from_state(state: &'a InnerAppState) -> Result<Self, SubmitError> {
        let store = state
            .store
            .as_deref()
            .ok_or_else(|| SubmitError::Configuration("Missing storage connection string".into()))?;
        let notifier = state
            .notifier
            .as_ref()
            .ok_or_else(|| SubmitError::Configuration("Missing email configuration".into()))?;
        Ok(Self::new(store, notifier))
    }

    /// Upload every attachment in receipt order, one at a time, and mint a
    /// read link for each. Objects written before a failure are left in place.
    pub async fn store_attachments(
        &self,
        submission: &mut Submission,
    ) -> Result<Vec<StoredAsset>, SubmitError> {
        self.store.ensure_container().await?;

        let mut minter = KeyMinter::new();
        let mut assets = Vec::with_capacity(submission.attachments.len());
        for attachment in std::mem::take(&mut submission.attachments) {
            let key = minter.mint_now(&attachment.filename);
            let size = attachment.size();
            // Tagged with the normalized declared type.
            self.store
                .put(&key, attachment.content, &attachment.mime_type)
                .await?;
            let access_url = self.store.signed_read_url(&key, READ_URL_TTL).await?;
            info!(container = self.store.container(), %key, size, "stored attachment");
            assets.push(StoredAsset {
                display_name: attachment.filename,
                access_url,
            });
        }
        Ok(assets)
    }

    pub async fn notify(&self, submission: &Submission, assets: &[StoredAsset]) -> Result<(), SubmitError> {
        let html = compose_notification(submission, assets);
        let email = self.notifier.config.compose(NOTIFICATION_SUBJECT, html);
        self.notifier.mailer.send(&email).await?;
        Ok(())
    }

    pub async fn process(&self, mut submission: Submission) -> Result<Vec<StoredAsset>, SubmitError> {
        let assets = self.store_attachments(&mut submission).await?;
        self.notify(&submission, &assets).await?;
        Ok(assets)
    }
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;
    use formdrop_core::Attachment;

    use super::*;
    use crate::test_helpers::{local_store, FailingStore, RecordingMailer};

    fn attachment(name: &str) -> Attachment {
        Attachment {
            filename: name.into(),
            mime_type: "image/png".into(),
            content: Bytes::from_static(b"\x89PNG"),
        }
    }

    fn notifier(mailer: Arc<RecordingMailer>) -> Notifier {
        Notifier {
            mailer,
            config: MailConfig::new("test", "owner@example.hu"),
        }
    }

    #[tokio::test]
    async fn uploads_in_order_and_sends_one_email() {
        let tmp = tempfile::tempdir().unwrap();
        let store = local_store(tmp.path());
        let mailer = Arc::new(RecordingMailer::default());
        let notifier = notifier(mailer.clone());
        let handler = SubmissionHandler::new(&*store, &notifier);

        let mut submission = Submission::default();
        submission.fields.insert("lastname".into(), "Kis".into());
        submission.attachments = vec![attachment("a b.png"), attachment("a b.png")];

        let assets = handler.process(submission).await.unwrap();
        assert_eq!(assets.len(), 2);
        assert!(assets.iter().all(|a| a.display_name == "a b.png"));
        assert_ne!(assets[0].access_url, assets[1].access_url);

        let sent = mailer.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].subject, NOTIFICATION_SUBJECT);
        assert_eq!(sent[0].to, vec!["owner@example.hu".to_string()]);
        assert!(sent[0].html.contains("Kis"));
        assert_eq!(sent[0].html.matches("<li>").count(), 2);

        let stored = std::fs::read_dir(tmp.path().join("uploads")).unwrap().count();
        assert_eq!(stored, 2);
    }

    #[tokio::test]
    async fn store_failure_keeps_earlier_uploads_and_sends_nothing() {
        let tmp = tempfile::tempdir().unwrap();
        let store = FailingStore::new(local_store(tmp.path()), 1);
        let mailer = Arc::new(RecordingMailer::default());
        let notifier = notifier(mailer.clone());
        let handler = SubmissionHandler::new(&store, &notifier);

        let mut submission = Submission::default();
        submission.attachments = vec![attachment("1.png"), attachment("2.png"), attachment("3.png")];

        let err = handler.process(submission).await.unwrap_err();
        assert!(matches!(err, SubmitError::Upstream(_)));
        assert!(mailer.sent().is_empty());
        let stored = std::fs::read_dir(tmp.path().join("uploads")).unwrap().count();
        assert_eq!(stored, 1);
    }

    #[tokio::test]
    async fn mail_failure_is_upstream_error() {
        let tmp = tempfile::tempdir().unwrap();
        let store = local_store(tmp.path());
        let mailer = Arc::new(RecordingMailer::failing("domain is not verified"));
        let notifier = notifier(mailer);
        let handler = SubmissionHandler::new(&*store, &notifier);

        let mut submission = Submission::default();
        submission.attachments = vec![attachment("1.png")];

        let err = handler.process(submission).await.unwrap_err();
        assert!(matches!(err, SubmitError::Upstream(_)));
        assert_eq!(err.to_string(), "domain is not verified");
    }
}
