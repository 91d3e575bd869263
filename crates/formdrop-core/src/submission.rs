use std::collections::HashMap;
use std::time::Duration;

use bytes::Bytes;

/// Multipart field name that carries image uploads.
pub const IMAGE_FIELD: &str = "images";

pub const ALLOWED_MIME_TYPES: &[&str] = &["image/jpeg", "image/png", "image/webp", "image/gif"];

/// Cap on the combined size of every attachment in one submission.
pub const MAX_TOTAL_BYTES: u64 = 50 * 1024 * 1024;

/// Lifetime of the signed read URLs embedded in the notification.
pub const READ_URL_TTL: Duration = Duration::from_secs(7 * 24 * 60 * 60);

/// A decoded contact form. Lives for a single request.
#[derive(Debug, Default)]
pub struct Submission {
    pub fields: HashMap<String, String>,
    pub attachments: Vec<Attachment>,
}

impl Submission {
    /// Value of a text field, or `""` when the form did not send it.
    pub fn field(&self, name: &str) -> &str {
        self.fields.get(name).map(String::as_str).unwrap_or("")
    }
}

#[derive(Debug, Clone)]
pub struct Attachment {
    /// Original filename as sent by the client. Untrusted.
    pub filename: String,
    /// Declared content type, lower-cased with parameters removed. Objects are tagged with it.
    pub mime_type: String,
    pub content: Bytes,
}

impl Attachment {
    pub fn size(&self) -> usize {
        self.content.len()
    }
}

/// An uploaded attachment, ready to be linked from the notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredAsset {
    pub display_name: String,
    pub access_url: String,
}

/// Reduce a declared content type to its lower-cased essence, dropping parameters.
pub fn normalize_mime(declared: &str) -> String {
    declared
        .split(';')
        .next()
        .unwrap_or("")
        .trim()
        .to_ascii_lowercase()
}

pub fn is_allowed_image(declared: &str) -> bool {
    let mime = normalize_mime(declared);
    ALLOWED_MIME_TYPES.contains(&mime.as_str())
}
