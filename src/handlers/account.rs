//! Source account API handlers

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use std::sync::Arc;

use crate::{error::Result, middleware::AppState, models::account::*};

#[derive(Debug, Deserialize)]
pub struct AccountListQuery {
    pub kind: AccountKind,
}

pub async fn list_accounts(
    State(state): State<Arc<AppState>>,
    Query(query): Query<AccountListQuery>,
) -> Result<impl IntoResponse> {
    let accounts = state.account_service.list(query.kind).await?;
    Ok(Json(accounts))
}

pub async fn create_account(
    State(state): State<Arc<AppState>>,
    Json(request): Json<CreateAccountRequest>,
) -> Result<impl IntoResponse> {
    let account = state.account_service.create(request).await?;
    Ok((StatusCode::CREATED, Json(account)))
}

pub async fn get_account(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
) -> Result<impl IntoResponse> {
    let account = state.account_service.get(id).await?;
    Ok(Json(account))
}

pub async fn update_account(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
    Json(request): Json<UpdateAccountRequest>,
) -> Result<impl IntoResponse> {
    let account = state.account_service.update(id, request).await?;
    Ok(Json(account))
}

/// 软删除
pub async fn delete_account(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
) -> Result<impl IntoResponse> {
    state.account_service.deactivate(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// 测试连接并更新账号状态
pub async fn test_account(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
) -> Result<impl IntoResponse> {
    let result = state.account_service.test_connection(id).await?;
    Ok(Json(result))
}
