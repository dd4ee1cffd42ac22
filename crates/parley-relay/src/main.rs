use tracing_subscriber::EnvFilter;

use parley_relay::config::RelayConfig;
use parley_relay::state::AppState;

#[tokio::main]
async fn main() -> eyre::Result<()> {
    // Structured JSON logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| "info,parley_relay=debug".into()),
        )
        .json()
        .init();

    let config = RelayConfig::from_env()?;
    let state = AppState::from_config(&config).await;
    let app = parley_relay::router(state);

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    tracing::info!(
        addr = %config.bind_addr,
        upstream = %config.upstream_url,
        storage = config.storage.kind(),
        "relay listening"
    );

    axum::serve(listener, app).await?;
    Ok(())
}
