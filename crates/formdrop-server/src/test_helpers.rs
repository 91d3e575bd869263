use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Request};
use axum::Router;
use bytes::Bytes;
use formdrop_mail::{MailConfig, MailError, Mailer, OutgoingEmail};
use formdrop_store::{LocalConfig, LocalStore, ObjectStore, StoreError};

use crate::routes::{build_router, AppState, InnerAppState};
use crate::submission::Notifier;

pub const TEST_CONTAINER: &str = "uploads";
pub const TEST_PUBLIC_URL: &str = "http://formdrop.test/blobs";
pub const TEST_RECIPIENT: &str = "owner@example.hu";
const TEST_BODY_LIMIT: usize = 64 * 1024 * 1024;

/// Mailer that keeps every message instead of sending it.
#[derive(Default)]
pub struct RecordingMailer {
    sent: Mutex<Vec<OutgoingEmail>>,
    fail_with: Option<String>,
}

impl RecordingMailer {
    pub fn failing(message: &str) -> Self {
        Self {
            sent: Mutex::default(),
            fail_with: Some(message.to_string()),
        }
    }

    pub fn sent(&self) -> Vec<OutgoingEmail> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, email: &OutgoingEmail) -> Result<(), MailError> {
        if let Some(msg) = &self.fail_with {
            return Err(MailError::Rejected(msg.clone()));
        }
        self.sent.lock().unwrap().push(email.clone());
        Ok(())
    }
}

/// Wraps a [`LocalStore`] and fails the put with the given zero-based index.
pub struct FailingStore {
    inner: Arc<LocalStore>,
    fail_on_put: usize,
    puts: AtomicUsize,
}

impl FailingStore {
    pub fn new(inner: Arc<LocalStore>, fail_on_put: usize) -> Self {
        Self {
            inner,
            fail_on_put,
            puts: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl ObjectStore for FailingStore {
    fn container(&self) -> &str {
        self.inner.container()
    }

    async fn ensure_container(&self) -> Result<(), StoreError> {
        self.inner.ensure_container().await
    }

    async fn put(&self, key: &str, data: Bytes, content_type: &str) -> Result<(), StoreError> {
        if self.puts.fetch_add(1, Ordering::SeqCst) == self.fail_on_put {
            return Err(StoreError::Internal("injected put failure".into()));
        }
        self.inner.put(key, data, content_type).await
    }

    async fn signed_read_url(&self, key: &str, ttl: Duration) -> Result<String, StoreError> {
        self.inner.signed_read_url(key, ttl).await
    }
}

pub fn local_store(root: &Path) -> Arc<LocalStore> {
    Arc::new(LocalStore::new(
        &LocalConfig {
            root: root.to_path_buf(),
            public_url: TEST_PUBLIC_URL.into(),
            signing_key: "test-signing-key".into(),
        },
        TEST_CONTAINER,
    ))
}

/// Hand-built `multipart/form-data` body.
pub struct MultipartBuilder {
    boundary: String,
    body: Vec<u8>,
}

impl Default for MultipartBuilder {
    fn default() -> Self {
        Self {
            boundary: "formdrop-test-boundary-7MA4YWxkTrZu0gW".into(),
            body: Vec::new(),
        }
    }
}

impl MultipartBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(mut self, name: &str, value: &str) -> Self {
        self.body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n",
                self.boundary
            )
            .as_bytes(),
        );
        self
    }

    pub fn file(mut self, name: &str, filename: &str, content_type: &str, content: &[u8]) -> Self {
        self.body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"{name}\"; filename=\"{filename}\"\r\nContent-Type: {content_type}\r\n\r\n",
                self.boundary
            )
            .as_bytes(),
        );
        self.body.extend_from_slice(content);
        self.body.extend_from_slice(b"\r\n");
        self
    }

    /// `POST /api/contact` carrying the finished body.
    pub fn request(mut self) -> Request<Body> {
        self.body
            .extend_from_slice(format!("--{}--\r\n", self.boundary).as_bytes());
        Request::post("/api/contact")
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={}", self.boundary),
            )
            .body(Body::from(self.body))
            .unwrap()
    }
}

/// Router wired to a temp-dir store and a recording mailer.
pub struct TestContext {
    pub router: Router,
    pub mailer: Arc<RecordingMailer>,
    pub store: Arc<LocalStore>,
    pub tmp: tempfile::TempDir,
}

impl TestContext {
    pub fn new() -> Self {
        Self::with_limit(formdrop_core::submission::MAX_TOTAL_BYTES)
    }

    pub fn with_limit(max_upload_bytes: u64) -> Self {
        Self::with_mailer(max_upload_bytes, RecordingMailer::default())
    }

    pub fn with_mailer(max_upload_bytes: u64, mailer: RecordingMailer) -> Self {
        Self::build(max_upload_bytes, TEST_BODY_LIMIT, mailer)
    }

    /// Caps the raw request body below the default.
    pub fn with_body_limit(body_limit: usize) -> Self {
        Self::build(
            formdrop_core::submission::MAX_TOTAL_BYTES,
            body_limit,
            RecordingMailer::default(),
        )
    }

    fn build(max_upload_bytes: u64, body_limit: usize, mailer: RecordingMailer) -> Self {
        let tmp = tempfile::tempdir().unwrap();
        let store = local_store(tmp.path());
        let mailer = Arc::new(mailer);
        let state: AppState = Arc::new(InnerAppState {
            store: Some(store.clone()),
            notifier: Some(Notifier {
                mailer: mailer.clone(),
                config: MailConfig::new("re_test", TEST_RECIPIENT),
            }),
            local_blobs: Some(store.clone()),
            max_upload_bytes,
            body_limit,
            cors_origins: Vec::new(),
        });
        Self {
            router: build_router(state),
            mailer,
            store,
            tmp,
        }
    }

    /// Everything configured except object storage.
    pub fn without_storage() -> Self {
        let mut ctx = Self::new();
        let state: AppState = Arc::new(InnerAppState {
            store: None,
            notifier: Some(Notifier {
                mailer: ctx.mailer.clone(),
                config: MailConfig::new("re_test", TEST_RECIPIENT),
            }),
            local_blobs: None,
            max_upload_bytes: formdrop_core::submission::MAX_TOTAL_BYTES,
            body_limit: TEST_BODY_LIMIT,
            cors_origins: Vec::new(),
        });
        ctx.router = build_router(state);
        ctx
    }

    /// Everything configured except email.
    pub fn without_mail() -> Self {
        let mut ctx = Self::new();
        let state: AppState = Arc::new(InnerAppState {
            store: Some(ctx.store.clone()),
            notifier: None,
            local_blobs: Some(ctx.store.clone()),
            max_upload_bytes: formdrop_core::submission::MAX_TOTAL_BYTES,
            body_limit: TEST_BODY_LIMIT,
            cors_origins: Vec::new(),
        });
        ctx.router = build_router(state);
        ctx
    }

    pub fn upload_dir(&self) -> std::path::PathBuf {
        self.tmp.path().join(TEST_CONTAINER)
    }
}

impl Default for TestContext {
    fn default() -> Self {
        Self::new()
    }
}

/// Href values of the links in a notification, in document order.
pub fn link_targets(html: &str) -> Vec<String> {
    html.split("<a href=\"")
        .skip(1)
        .filter_map(|rest| rest.split_once('"').map(|(url, _)| url.replace("&amp;", "&")))
        .collect()
}
