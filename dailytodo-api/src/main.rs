//! # dailytodo API Server
//!
//! Per-user todo lists where each user may create at most
//! `max_tasks_per_day` tasks per calendar day.
//!
//! ## Usage
//!
//! ```bash
//! DATABASE_URL=postgresql://localhost/dailytodo cargo run -p dailytodo-api
//! ```
//!
//! Without `DATABASE_URL` the server keeps everything in memory.

use dailytodo_api::app::{build_router, AppState};
use dailytodo_api::config::{Config, LogFormat};
use dailytodo_shared::clock::SystemClock;
use dailytodo_shared::store::Storage;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env()?;

    init_tracing(config.log_format);

    tracing::info!(
        "dailytodo API Server v{} starting...",
        env!("CARGO_PKG_VERSION")
    );
    tracing::info!(
        backend = config.storage.backend_name(),
        utc_offset = %config.calendar.offset(),
        "Configuration loaded"
    );

    let storage = Storage::connect(&config.storage).await?;
    let bind_address = config.bind_address();

    let state = AppState::new(storage.clone(), Arc::new(SystemClock), config);
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&bind_address).await?;
    tracing::info!("Server listening on http://{}", bind_address);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    storage.close().await;
    tracing::info!("Server stopped");

    Ok(())
}

fn init_tracing(format: LogFormat) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        "dailytodo_api=debug,dailytodo_shared=debug,tower_http=debug".into()
    });

    let registry = tracing_subscriber::registry().with(filter);
    match format {
        LogFormat::Json => registry.with(tracing_subscriber::fmt::layer().json()).init(),
        LogFormat::Text => registry.with(tracing_subscriber::fmt::layer()).init(),
    }
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received, draining connections...");
}
