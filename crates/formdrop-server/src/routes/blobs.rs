use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use formdrop_store::{ObjectStore, StoreError};
use serde::Deserialize;

use super::AppState;

pub fn routes() -> Router<AppState> {
    Router::new().route("/blobs/{container}/{key}", get(download))
}

#[derive(Debug, Deserialize)]
struct SignedQuery {
    se: Option<i64>,
    sp: Option<String>,
    sig: Option<String>,
}

/// Serve an object from the local store to the holder of a valid signed link.
async fn download(
    State(state): State<AppState>,
    Path((container, key)): Path<(String, String)>,
    Query(q): Query<SignedQuery>,
) -> Response {
    let Some(store) = state.local_blobs.as_ref() else {
        return StatusCode::NOT_FOUND.into_response();
    };
    if container != store.container() {
        return StatusCode::NOT_FOUND.into_response();
    }

    let (Some(se), Some(sp), Some(sig)) = (q.se, q.sp, q.sig) else {
        return (StatusCode::FORBIDDEN, "missing signature").into_response();
    };
    if !store.verify_read(&key, se, &sp, &sig, chrono::Utc::now()) {
        return (StatusCode::FORBIDDEN, "invalid or expired signature").into_response();
    }

    match store.read(&key).await {
        Ok(object) => (
            [(header::CONTENT_TYPE, object.content_type)],
            object.data,
        )
            .into_response(),
        Err(StoreError::NotFound(_)) | Err(StoreError::InvalidKey(_)) => {
            StatusCode::NOT_FOUND.into_response()
        }
        Err(e) => {
            tracing::error!(%key, error = %e, "blob read failed");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}
