//! Incremental assembly of a [`Submission`] from a streamed multipart body.
//!
//! The decoder feeds parts and chunks in arrival order. The first validation
//! failure moves the intake into a rejected state; after that every call is
//! a no-op so the caller can keep draining the body, and [`Intake::finish`]
//! reports the original failure once the stream is exhausted.

use std::collections::HashMap;

use bytes::BytesMut;

use crate::error::ValidationError;
use crate::submission::{is_allowed_image, normalize_mime, Attachment, Submission, MAX_TOTAL_BYTES};

#[derive(Debug)]
struct OpenAttachment {
    filename: String,
    mime_type: String,
    buf: BytesMut,
}

#[derive(Debug)]
enum State {
    Collecting(Option<OpenAttachment>),
    Rejected(ValidationError),
}

#[derive(Debug)]
pub struct Intake {
    fields: HashMap<String, String>,
    attachments: Vec<Attachment>,
    total_bytes: u64,
    limit: u64,
    state: State,
}

impl Default for Intake {
    fn default() -> Self {
        Self::new()
    }
}

impl Intake {
    pub fn new() -> Self {
        Self::with_limit(MAX_TOTAL_BYTES)
    }

    pub fn with_limit(limit: u64) -> Self {
        Self {
            fields: HashMap::new(),
            attachments: Vec::new(),
            total_bytes: 0,
            limit,
            state: State::Collecting(None),
        }
    }

    pub fn is_rejected(&self) -> bool {
        matches!(self.state, State::Rejected(_))
    }

    /// Bytes accepted so far across all attachments.
    pub fn total_bytes(&self) -> u64 {
        self.total_bytes
    }

    /// Store a plain text field. Repeated names overwrite earlier values.
    pub fn record_field(&mut self, name: &str, value: String) {
        if self.is_rejected() {
            return;
        }
        self.fields.insert(name.to_string(), value);
    }

    /// Open a new attachment. An attachment that is still open is finalized first.
    /// The declared type is kept in normalized form (see [`normalize_mime`]).
    pub fn begin_attachment(&mut self, filename: &str, declared_mime: &str) -> Result<(), ValidationError> {
        self.finish_attachment();
        if let State::Rejected(e) = &self.state {
            return Err(e.clone());
        }
        if !is_allowed_image(declared_mime) {
            return Err(self.reject(ValidationError::NotAnImage));
        }
        self.state = State::Collecting(Some(OpenAttachment {
            filename: filename.to_string(),
            mime_type: normalize_mime(declared_mime),
            buf: BytesMut::new(),
        }));
        Ok(())
    }

    /// Add a chunk to the open attachment, enforcing the submission-wide size cap.
    pub fn append(&mut self, chunk: &[u8]) -> Result<(), ValidationError> {
        let total = self.total_bytes + chunk.len() as u64;
        let over_limit = total > self.limit;
        match &mut self.state {
            State::Rejected(e) => return Err(e.clone()),
            State::Collecting(None) => return Ok(()),
            State::Collecting(Some(open)) if !over_limit => {
                open.buf.extend_from_slice(chunk);
                self.total_bytes = total;
                return Ok(());
            }
            State::Collecting(Some(_)) => {}
        }
        Err(self.reject(ValidationError::TooLarge))
    }

    /// Terminal signal for the current attachment.
    pub fn finish_attachment(&mut self) {
        if let State::Collecting(open) = &mut self.state {
            if let Some(open) = open.take() {
                self.attachments.push(Attachment {
                    filename: open.filename,
                    mime_type: open.mime_type,
                    content: open.buf.freeze(),
                });
            }
        }
    }

    /// Record a failure detected outside the intake itself (e.g. by the decoder).
    /// The first failure wins.
    pub fn reject(&mut self, error: ValidationError) -> ValidationError {
        match &self.state {
            State::Rejected(first) => first.clone(),
            State::Collecting(_) => {
                self.state = State::Rejected(error.clone());
                error
            }
        }
    }

    /// Terminal signal for the whole body.
    pub fn finish(mut self) -> Result<Submission, ValidationError> {
        self.finish_attachment();
        if let State::Rejected(e) = self.state {
            return Err(e);
        }
        if self.attachments.is_empty() {
            return Err(ValidationError::NoImage);
        }
        Ok(Submission {
            fields: self.fields,
            attachments: self.attachments,
        })
    }
}
