mod api;
mod client;
mod config;
mod scanner;
mod state;

use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::net::TcpListener;
use tokio::sync::{Mutex, mpsc};
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use crate::client::HttpPixelClient;
use crate::config::Config;
use crate::state::{AppStateInner, Severity};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Config::from_env().context("failed to load configuration")?;

    tracing::info!(
        "pixseek starting, endpoint: {}, listen: {}, request delay: {:?}",
        config.base_url,
        config.listen_addr,
        config.request_delay,
    );

    let client = Arc::new(HttpPixelClient::new(&config).context("failed to build pixel client")?);

    let state: crate::state::AppState = Arc::new(Mutex::new(AppStateInner::new(config.clone())));

    // Scanner status events are logged and kept for the /status endpoint.
    let (events_tx, mut events_rx) = mpsc::unbounded_channel::<crate::state::StatusEvent>();
    let pump_state = state.clone();
    tokio::spawn(async move {
        while let Some(event) = events_rx.recv().await {
            match event.severity {
                Severity::Error => tracing::error!("{}", event.message),
                _ => tracing::info!("{}", event.message),
            }
            pump_state.lock().await.last_status = Some(event);
        }
    });

    let app = api::router(state, client, events_tx).layer(TraceLayer::new_for_http());

    let listener = TcpListener::bind(&config.listen_addr)
        .await
        .context(format!("failed to bind to {}", config.listen_addr))?;

    tracing::info!("listening on {}", config.listen_addr);

    axum::serve(listener, app).await.context("server error")?;

    Ok(())
}
