use anyhow::Context;
use pack_manager_server::{AppState, app, config::ServerConfig};
use pack_manager_services::services::profile_store::ProfileStore;
use tracing_subscriber::{EnvFilter, prelude::*};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_filter(
                    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
                ),
        )
        .init();

    let version = env!("CARGO_PKG_VERSION");
    tracing::info!("Starting pack-manager server version {version}...");

    let config = ServerConfig::from_env()?;
    let store = ProfileStore::new(config.profiles_dir.clone()).with_context(|| {
        format!(
            "Failed to open profiles directory {}",
            config.profiles_dir.display()
        )
    })?;
    tracing::info!("Serving profiles from {}", store.root().display());

    let address = config.bind_address();
    let listener = tokio::net::TcpListener::bind(&address)
        .await
        .with_context(|| format!("Failed to bind {address}"))?;
    tracing::info!("Listening on http://{address}/pack_manager/api");

    axum::serve(
        listener,
        app(AppState::new(store), config.request_timeout),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
    }
}
