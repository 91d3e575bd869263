//! Drives an [`Intake`] from axum's streaming multipart decoder.

use axum::extract::multipart::{Field, Multipart, MultipartError};
use axum::http::StatusCode;
use formdrop_core::submission::IMAGE_FIELD;
use formdrop_core::{Intake, Submission, ValidationError};

/// Declared type assumed for file parts that omit `Content-Type`.
const DEFAULT_PART_TYPE: &str = "application/octet-stream";

fn decode_error(e: MultipartError) -> ValidationError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ValidationError::TooLarge
    } else {
        ValidationError::MalformedBody(e.body_text())
    }
}

/// Feed every chunk of an image part into the intake. After a rejection the
/// chunks are still read so the body is consumed to the end.
async fn pump(field: &mut Field<'_>, intake: &mut Intake) -> Result<(), MultipartError> {
    while let Some(chunk) = field.chunk().await? {
        if !intake.is_rejected() {
            // On failure the intake records the error and switches to draining.
            let _ = intake.append(&chunk);
        }
    }
    Ok(())
}

async fn drain(field: &mut Field<'_>) -> Result<(), MultipartError> {
    while field.chunk().await?.is_some() {}
    Ok(())
}

async fn read_part(mut field: Field<'_>, intake: &mut Intake) -> Result<(), MultipartError> {
    let name = field.name().unwrap_or_default().to_string();
    let Some(filename) = field.file_name().map(str::to_string) else {
        if intake.is_rejected() {
            return drain(&mut field).await;
        }
        let value = field.text().await?;
        intake.record_field(&name, value);
        return Ok(());
    };

    if name != IMAGE_FIELD {
        tracing::debug!(field = %name, "ignoring file part outside the image field");
        return drain(&mut field).await;
    }

    let declared = field.content_type().unwrap_or(DEFAULT_PART_TYPE).to_string();
    if let Err(e) = intake.begin_attachment(&filename, &declared) {
        tracing::debug!(%filename, %declared, error = %e, "draining rejected attachment");
    }
    pump(&mut field, intake).await?;
    intake.finish_attachment();
    Ok(())
}

/// Read the whole multipart body, then report either the decoded submission
/// or the first problem found while reading it.
pub async fn decode(mut multipart: Multipart, limit: u64) -> Result<Submission, ValidationError> {
    let mut intake = Intake::with_limit(limit);
    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(e) => {
                intake.reject(decode_error(e));
                break;
            }
        };
        if let Err(e) = read_part(field, &mut intake).await {
            intake.reject(decode_error(e));
            break;
        }
    }
    intake.finish()
}
