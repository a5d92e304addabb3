use axum::extract::FromRef;

use super::ServerConfig;
use crate::ingestion::IngestionManager;
use std::sync::Arc;
use std::time::Instant;

pub type GuardedIngestionManager = Arc<IngestionManager>;

#[derive(Clone)]
pub struct ServerState {
    pub config: ServerConfig,
    pub start_time: Instant,
    pub ingestion_manager: GuardedIngestionManager,
}

impl FromRef<ServerState> for GuardedIngestionManager {
    fn from_ref(input: &ServerState) -> Self {
        input.ingestion_manager.clone()
    }
}
