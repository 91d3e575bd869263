pub mod config;
pub mod error;
mod multipart;
pub mod routes;
pub mod submission;

#[cfg(any(test, feature = "test-helpers"))]
pub mod test_helpers;

use std::sync::Arc;

use anyhow::{Context, Result};
use formdrop_mail::ResendMailer;
use formdrop_store::{LocalStore, ObjectStore, StoreConfig};
use tokio::net::TcpListener;

use config::ServerConfig;
use routes::{AppState, InnerAppState};
use submission::Notifier;

/// Resolve collaborators from configuration. Missing storage or mail settings
/// leave the server running; contact submissions then fail with a
/// configuration error. A connection string that is present but invalid
/// aborts startup.
pub fn build_state(config: &ServerConfig) -> Result<AppState> {
    let mut local_blobs = None;
    let store: Option<Arc<dyn ObjectStore>> = match config.store_config()? {
        Some(StoreConfig::Local(local)) => {
            let store = Arc::new(LocalStore::new(&local, &config.container));
            local_blobs = Some(store.clone());
            Some(store as Arc<dyn ObjectStore>)
        }
        Some(other) => Some(
            formdrop_store::create_store(&other, &config.container)
                .context("failed to initialize object store")?,
        ),
        None => {
            tracing::warn!("no storage connection string; submissions will be refused");
            None
        }
    };

    let notifier = match config.mail_config() {
        Some(mail) => Some(Notifier {
            mailer: Arc::new(ResendMailer::new(&mail)),
            config: mail,
        }),
        None => {
            tracing::warn!("RESEND_API_KEY or CONTACT_TO_EMAIL missing; submissions will be refused");
            None
        }
    };

    Ok(Arc::new(InnerAppState {
        store,
        notifier,
        local_blobs,
        max_upload_bytes: config.max_upload_bytes,
        body_limit: config.body_limit,
        cors_origins: config.cors_origins.clone(),
    }))
}

pub async fn serve(listener: TcpListener, state: AppState) -> Result<()> {
    let app = routes::build_router(state);
    axum::serve(listener, app).await?;
    Ok(())
}
