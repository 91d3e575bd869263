use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use formdrop_core::ValidationError;
use formdrop_mail::MailError;
use formdrop_store::StoreError;

/// Everything that can abort a submission. The display string is the
/// plain-text body returned to the caller.
#[derive(Debug, thiserror::Error)]
pub enum SubmitError {
    /// A required collaborator is not configured.
    #[error("{0}")]
    Configuration(String),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Storage or email delivery failed.
    #[error("{0}")]
    Upstream(String),
}

impl From<StoreError> for SubmitError {
    fn from(e: StoreError) -> Self {
        SubmitError::Upstream(e.to_string())
    }
}

impl From<MailError> for SubmitError {
    fn from(e: MailError) -> Self {
        SubmitError::Upstream(e.to_string())
    }
}

impl SubmitError {
    pub fn status(&self) -> StatusCode {
        match self {
            SubmitError::Configuration(_) => StatusCode::INTERNAL_SERVER_ERROR,
            SubmitError::Validation(_) => StatusCode::BAD_REQUEST,
            SubmitError::Upstream(_) => StatusCode::BAD_GATEWAY,
        }
    }

    /// Write the failure to the operator log.
    pub fn log(&self) {
        match self {
            SubmitError::Validation(e) => tracing::warn!(error = %e, "submission rejected"),
            SubmitError::Configuration(msg) => {
                tracing::error!(error = %msg, "submission failed: configuration")
            }
            SubmitError::Upstream(msg) => {
                tracing::error!(error = %msg, "submission failed: upstream")
            }
        }
    }
}

impl IntoResponse for SubmitError {
    fn into_response(self) -> Response {
        (self.status(), self.to_string()).into_response()
    }
}
