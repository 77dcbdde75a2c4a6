//! kpi-server: performance review backend
//!
//! - Evaluation workflow (self → manager → HR → confirm → completed)
//! - Peer invitations with per-item scoring
//! - Personalized realtime notifications over server-sent events

mod api;
mod auth;
mod config;
mod db;
mod error;
mod invitation;
mod live;
mod logger;
mod notification;
mod state;
mod tasks;
mod workflow;

use config::Config;
use state::AppState;
use tasks::BackgroundTasks;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    // Load .env file
    let _ = dotenvy::dotenv();

    let config = Config::from_env()?;
    logger::init_logger(&config.log_level, config.log_json, config.log_dir.as_deref())?;

    tracing::info!(
        environment = %config.environment,
        development = config.is_development(),
        "Starting kpi-server"
    );

    let state = AppState::new(&config).await?;

    let mut tasks = BackgroundTasks::new();
    let live = state.live.clone();
    let shutdown = tasks.shutdown_token();
    tasks.spawn("live_sweeper", live.clone().run_sweeper(shutdown));
    tasks.log_summary();

    let app = api::create_router(state);

    let addr = format!("0.0.0.0:{}", config.http_port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("kpi-server listening on {addr}");

    let stream_shutdown = live.clone();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown_signal().await;
            // open event streams would otherwise hold the server open
            stream_shutdown.close_all();
        })
        .await?;

    tasks.shutdown().await;
    tracing::info!("kpi-server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
