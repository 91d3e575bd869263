use anyhow::Result;
use clap::Parser;
use tokio::net::TcpListener;

use formdrop_server::config::ServerConfig;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config = ServerConfig::parse();
    let state = formdrop_server::build_state(&config)?;

    let addr = config.addr();
    let listener = TcpListener::bind(addr).await?;
    tracing::info!(%addr, container = %config.container, "formdrop-server listening");

    formdrop_server::serve(listener, state).await
}
