use anyhow::Result;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{extract::State, response::IntoResponse, routing::get, Json, Router};
use serde::Serialize;
use tracing::info;

use super::product_routes::product_routes;
use super::state::ServerState;
use super::ServerConfig;
use crate::ingestion::IngestionManager;

#[derive(Serialize)]
struct ServerStats {
    pub uptime: String,
    pub port: u16,
}

fn format_uptime(duration: Duration) -> String {
    let total_seconds = duration.as_secs();

    let days = total_seconds / 86_400;
    let hours = (total_seconds % 86_400) / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;

    format!("{}d {:02}:{:02}:{:02}", days, hours, minutes, seconds)
}

async fn home(State(state): State<ServerState>) -> impl IntoResponse {
    let stats = ServerStats {
        uptime: format_uptime(state.start_time.elapsed()),
        port: state.config.port,
    };
    Json(stats)
}

pub fn make_app(config: ServerConfig, ingestion_manager: Arc<IngestionManager>) -> Router {
    let state = ServerState {
        config,
        start_time: Instant::now(),
        ingestion_manager,
    };

    Router::new()
        .route("/", get(home))
        .nest("/v1", product_routes())
        .with_state(state)
}

pub async fn run_server(port: u16, ingestion_manager: Arc<IngestionManager>) -> Result<()> {
    let config = ServerConfig { port };
    let app = make_app(config, ingestion_manager);

    let listener = tokio::net::TcpListener::bind(format!("127.0.0.1:{}", port)).await?;
    info!("Listening on 127.0.0.1:{}", port);

    Ok(axum::serve(listener, app).await?)
}
