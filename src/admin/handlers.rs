use axum::{extract::State, Json};
use serde::Serialize;

use crate::http::error::AppError;
use crate::http::server::AppState;
use crate::store::models::ActionLogEntry;
use crate::store::repository::EntityCounts;

#[derive(Serialize)]
pub struct SystemStatus {
    pub version: &'static str,
    pub status: &'static str,
}

pub async fn get_status() -> Json<SystemStatus> {
    Json(SystemStatus {
        version: env!("CARGO_PKG_VERSION"),
        status: "operational",
    })
}

pub async fn get_stats(State(state): State<AppState>) -> Result<Json<EntityCounts>, AppError> {
    let counts = state.store.entity_counts().await?;
    Ok(Json(counts))
}

pub async fn get_actionlog(
    State(state): State<AppState>,
) -> Result<Json<Vec<ActionLogEntry>>, AppError> {
    let entries = state.store.recent_actions(50).await?;
    Ok(Json(entries))
}
