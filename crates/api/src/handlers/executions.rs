use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};

use super::status_for;
use crate::{now_seconds, AppState};

#[derive(Deserialize)]
pub struct CreateExecutionDto {
    pub graph_name: String,
    pub graph_version: String,
}

#[derive(Serialize)]
pub struct ExecutionDto {
    pub id: String,
    pub graph_name: String,
    pub graph_version: String,
    pub graph_hash: String,
    pub revision: i64,
    pub archived_at: Option<i64>,
}

impl From<db::models::ExecutionRow> for ExecutionDto {
    fn from(row: db::models::ExecutionRow) -> Self {
        Self {
            id: row.id,
            graph_name: row.graph_name,
            graph_version: row.graph_version,
            graph_hash: row.graph_hash,
            revision: row.revision,
            archived_at: row.archived_at,
        }
    }
}

pub async fn create(State(state): State<AppState>, Json(payload): Json<CreateExecutionDto>) -> Result<(StatusCode, Json<ExecutionDto>), StatusCode> {
    let execution = engine::execution::create(&state.pool, &state.catalog, &state.hub, &payload.graph_name, &payload.graph_version, now_seconds())
        .await
        .map_err(|e| status_for(&e))?;
    Ok((StatusCode::CREATED, Json(execution.into())))
}

pub async fn get(Path(id): Path<String>, State(state): State<AppState>) -> Result<Json<ExecutionDto>, StatusCode> {
    let row = db::repository::executions::get_execution(&state.pool, &id)
        .await
        .map_err(|e| status_for(&engine::EngineError::from(e)))?;
    Ok(Json(row.into()))
}

pub async fn archive(Path(id): Path<String>, State(state): State<AppState>) -> Result<StatusCode, StatusCode> {
    engine::execution::archive(&state.pool, &id, now_seconds()).await.map_err(|e| status_for(&e))?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn force_retry(Path((id, node_name)): Path<(String, String)>, State(state): State<AppState>) -> Result<StatusCode, StatusCode> {
    engine::execution::force_retry(&state.pool, &state.catalog, &state.hub, &id, &node_name, now_seconds())
        .await
        .map_err(|e| status_for(&e))?;
    Ok(StatusCode::ACCEPTED)
}
