//! Sync API handlers

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Serialize;
use std::sync::Arc;

use crate::{
    error::{AppError, Result},
    middleware::AppState,
    models::sync::*,
};

const DEFAULT_HISTORY_LIMIT: i64 = 50;
const MAX_HISTORY_LIMIT: i64 = 500;

#[derive(Serialize)]
pub struct SyncAccepted {
    pub message: String,
    pub sync_id: i32,
    pub sync_type: SyncType,
}

#[derive(Serialize)]
pub struct SyncHistoryList {
    pub data: Vec<SyncHistory>,
}

/// 解析触发参数：type 缺省为 all，account 缺省为默认账号
pub fn parse_trigger(query: &TriggerSyncQuery) -> Result<SyncRequest> {
    let sync_type = query
        .sync_type
        .as_deref()
        .filter(|t| !t.is_empty())
        .unwrap_or("all")
        .parse::<SyncType>()
        .map_err(AppError::Validation)?;
    let target = query
        .account
        .as_deref()
        .unwrap_or_default()
        .parse::<SyncTarget>()
        .map_err(AppError::Validation)?;

    Ok(SyncRequest::new(sync_type, target))
}

/// 触发同步，立即返回 202 与 sync_id
pub async fn trigger_sync(
    State(state): State<Arc<AppState>>,
    Query(query): Query<TriggerSyncQuery>,
) -> Result<impl IntoResponse> {
    let request = parse_trigger(&query)?;
    let handle = state.queue.submit(request).await?;

    Ok((
        StatusCode::ACCEPTED,
        Json(SyncAccepted {
            message: "Sync started".to_string(),
            sync_id: handle.sync_id,
            sync_type: request.sync_type,
        }),
    ))
}

/// 最近的同步历史
pub async fn list_sync_history(
    State(state): State<Arc<AppState>>,
    Query(query): Query<SyncHistoryQuery>,
) -> Result<impl IntoResponse> {
    let limit = query
        .limit
        .unwrap_or(DEFAULT_HISTORY_LIMIT)
        .clamp(1, MAX_HISTORY_LIMIT);
    let data = state.history.list(limit).await?;
    Ok(Json(SyncHistoryList { data }))
}

pub async fn get_sync_history(
    State(state): State<Arc<AppState>>,
    Path(sync_id): Path<i32>,
) -> Result<impl IntoResponse> {
    let history = state
        .history
        .get(sync_id)
        .await?
        .ok_or_else(|| AppError::not_found("sync"))?;
    Ok(Json(history))
}
