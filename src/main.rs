use dotenvy::dotenv;
use tracing::{info, warn};

mod cli;
mod config;
mod error;
mod handlers;
mod llm;
mod palette;
mod pipeline;
mod state;
mod utils;

use cli::{parse_suggest_args, run_suggest};
use config::CONFIG;
use state::AppState;
use utils::logging::init_logging;

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {err}");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received; draining in-flight requests");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    let _guards = init_logging();

    let state = AppState::from_config(&CONFIG)?;

    let args: Vec<String> = std::env::args().collect();
    if let Some(suggest_args) = parse_suggest_args(&args)? {
        return run_suggest(&state, suggest_args).await;
    }

    for key in state.missing_api_keys() {
        warn!("{key} not configured; palette requests will fail until it is set");
    }

    let address = CONFIG.bind_address();
    let listener = tokio::net::TcpListener::bind(address).await?;
    info!(
        "Starting UI Palette Advisor on http://{} (environment={:?}, upstream_timeout={}s)",
        address, CONFIG.environment, CONFIG.upstream_timeout_seconds
    );

    axum::serve(listener, handlers::router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}
