use axum::{
    extract::{multipart::MultipartRejection, Multipart, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
    Router,
};
use formdrop_core::ValidationError;

use super::AppState;
use crate::error::SubmitError;
use crate::multipart;
use crate::submission::SubmissionHandler;

pub fn routes() -> Router<AppState> {
    Router::new().route("/api/contact", post(submit))
}

async fn submit(
    State(state): State<AppState>,
    form: Result<Multipart, MultipartRejection>,
) -> Response {
    match handle(&state, form).await {
        Ok(()) => (StatusCode::OK, "OK").into_response(),
        Err(e) => {
            e.log();
            e.into_response()
        }
    }
}

/// Configuration is checked before the body is looked at, so a missing
/// collaborator fails every request the same way.
async fn handle(
    state: &AppState,
    form: Result<Multipart, MultipartRejection>,
) -> Result<(), SubmitError> {
    let handler = SubmissionHandler::from_state(state)?;
    let form = form.map_err(|e| ValidationError::MalformedBody(e.body_text()))?;
    let submission = multipart::decode(form, state.max_upload_bytes).await?;
    let assets = handler.process(submission).await?;
    tracing::info!(attachments = assets.len(), "submission delivered");
    Ok(())
}
