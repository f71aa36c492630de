use std::net::SocketAddr;
use std::path::PathBuf;

use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::commands::plan_commands;
use crate::commands::AppState;
use crate::error::{AppError, AppResult};

const ENV_BIND_ADDR: &str = "STUDYPLAN_BIND_ADDR";
const ENV_LOG_DIR: &str = "STUDYPLAN_LOG_DIR";
const DEFAULT_BIND_ADDR: &str = "127.0.0.1:3000";
const DEFAULT_LOG_DIR: &str = "./logs";

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,
    pub log_dir: PathBuf,
}

impl ServerConfig {
    pub fn from_env() -> AppResult<Self> {
        let raw_bind = std::env::var(ENV_BIND_ADDR)
            .ok()
            .filter(|value| !value.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string());
        let bind_addr = raw_bind.trim().parse::<SocketAddr>().map_err(|err| {
            AppError::other(format!("invalid {ENV_BIND_ADDR} value {raw_bind:?}: {err}"))
        })?;

        let log_dir = std::env::var(ENV_LOG_DIR)
            .ok()
            .filter(|value| !value.trim().is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_LOG_DIR));

        Ok(Self { bind_addr, log_dir })
    }
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/generate-plan", post(plan_commands::generate_plan))
        .route("/ai/status", get(plan_commands::ai_status))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

pub async fn run_serve(state: AppState, addr: SocketAddr) -> AppResult<()> {
    let app = build_router(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(target: "app::http", %addr, "study plan server listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    info!(target: "app::http", "study plan server shut down");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!(target: "app::http", error = %err, "failed to listen for Ctrl+C");
        std::future::pending::<()>().await;
    }
}
