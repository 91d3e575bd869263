pub mod blobs;
pub mod contact;
pub mod health;

use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::http::{HeaderValue, Method};
use axum::Router;
use formdrop_store::{LocalStore, ObjectStore};
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::submission::Notifier;

pub struct InnerAppState {
    /// `None` when no storage connection string is configured.
    pub store: Option<Arc<dyn ObjectStore>>,
    /// `None` when the email API key or recipient is missing.
    pub notifier: Option<Notifier>,
    /// Set when the filesystem backend is active; enables `/blobs` downloads.
    pub local_blobs: Option<Arc<LocalStore>>,
    /// Cap on the combined size of the attachments of one submission.
    pub max_upload_bytes: u64,
    /// Cap on the raw request body.
    pub body_limit: usize,
    pub cors_origins: Vec<String>,
}

pub type AppState = Arc<InnerAppState>;

fn cors_layer(origins: &[String]) -> Option<CorsLayer> {
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|o| HeaderValue::from_str(o.trim()).ok())
        .collect();
    if origins.is_empty() {
        return None;
    }
    Some(
        CorsLayer::new()
            .allow_origin(AllowOrigin::list(origins))
            .allow_methods([Method::POST, Method::GET, Method::OPTIONS]),
    )
}

pub fn build_router(state: AppState) -> Router {
    let mut router = Router::new()
        .merge(health::routes())
        .merge(contact::routes());
    if state.local_blobs.is_some() {
        router = router.merge(blobs::routes());
    }

    let mut router = router
        .layer(DefaultBodyLimit::max(state.body_limit))
        .layer(TraceLayer::new_for_http());
    if let Some(cors) = cors_layer(&state.cors_origins) {
        router = router.layer(cors);
    }
    router.with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cors_only_when_origins_configured() {
        assert!(cors_layer(&[]).is_none());
        assert!(cors_layer(&["  ".into()]).is_none());
        assert!(cors_layer(&["https://example.hu".into()]).is_some());
    }
}
