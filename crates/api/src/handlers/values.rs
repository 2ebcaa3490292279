use std::collections::HashMap;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use serde_json::Value;

use engine::{Timeout, WaitMode};

use super::status_for;
use crate::{now_seconds, AppState};

#[derive(Deserialize)]
pub struct SetManyDto {
    pub values: HashMap<String, Value>,
    pub metadata: Option<Value>,
}

pub async fn set_many(Path(id): Path<String>, State(state): State<AppState>, Json(payload): Json<SetManyDto>) -> Result<StatusCode, StatusCode> {
    engine::set_many(&state.pool, &state.catalog, &state.hub, &id, payload.values, payload.metadata, now_seconds())
        .await
        .map_err(|e| status_for(&e))?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Deserialize)]
pub struct UnsetManyDto {
    pub node_names: Vec<String>,
}

pub async fn unset_many(Path(id): Path<String>, State(state): State<AppState>, Json(payload): Json<UnsetManyDto>) -> Result<StatusCode, StatusCode> {
    engine::unset_many(&state.pool, &state.catalog, &state.hub, &id, &payload.node_names, now_seconds())
        .await
        .map_err(|e| status_for(&e))?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Deserialize)]
pub struct GetValueQuery {
    /// `immediate` (default), `any`, or `newer`.
    pub wait: Option<String>,
    /// Required when `wait=newer`.
    pub baseline: Option<i64>,
    /// Milliseconds to wait, or the literal `infinite`. Ignored for `wait=immediate`.
    pub timeout_ms: Option<String>,
}

pub async fn get(Path((id, node_name)): Path<(String, String)>, State(state): State<AppState>, Query(query): Query<GetValueQuery>) -> Result<Json<engine::read::ReadOutcome>, StatusCode> {
    let wait = match query.wait.as_deref() {
        None | Some("immediate") => WaitMode::Immediate,
        Some("any") => WaitMode::Any,
        Some("newer") => {
            let baseline = query.baseline.ok_or(StatusCode::BAD_REQUEST)?;
            WaitMode::Newer { baseline }
        }
        Some(_) => return Err(StatusCode::BAD_REQUEST),
    };

    let timeout = match query.timeout_ms.as_deref() {
        None if matches!(wait, WaitMode::Immediate) => Timeout::Millis(1),
        None => Timeout::Infinity,
        Some("infinite") => Timeout::Infinity,
        Some(ms) => Timeout::Millis(ms.parse().map_err(|_| StatusCode::BAD_REQUEST)?),
    };

    let outcome = engine::get(&state.pool, &state.hub, &id, &node_name, wait, timeout).await.map_err(|e| status_for(&e))?;
    Ok(Json(outcome))
}
