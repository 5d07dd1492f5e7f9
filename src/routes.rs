//! 路由注册
//! 创建所有 API 路由并应用中间件

use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::{
    compression::CompressionLayer, cors::CorsLayer, limit::RequestBodyLimitLayer,
    trace::TraceLayer,
};

use crate::{handlers, middleware::AppState};

/// 请求体上限（账号管理请求都很小）
const MAX_BODY_BYTES: usize = 64 * 1024;

/// 创建应用路由
pub fn create_router(state: Arc<AppState>) -> Router {
    // 公开端点（健康检查）
    let public_routes = Router::new()
        .route("/health", get(handlers::health::health_check))
        .route("/ready", get(handlers::health::readiness_check));

    // 同步
    let sync_routes = Router::new()
        .route("/api/v1/sync", post(handlers::sync::trigger_sync))
        .route("/api/v1/sync/history", get(handlers::sync::list_sync_history))
        .route(
            "/api/v1/sync/history/{id}",
            get(handlers::sync::get_sync_history),
        );

    // Source Account 管理
    let account_routes = Router::new()
        .route(
            "/api/v1/accounts",
            get(handlers::account::list_accounts).post(handlers::account::create_account),
        )
        .route(
            "/api/v1/accounts/{id}",
            get(handlers::account::get_account)
                .put(handlers::account::update_account)
                .delete(handlers::account::delete_account),
        )
        .route(
            "/api/v1/accounts/{id}/test",
            post(handlers::account::test_account),
        );

    Router::new()
        .merge(public_routes)
        .merge(sync_routes)
        .merge(account_routes)
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
        .layer(CompressionLayer::new())
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .layer(axum::middleware::from_fn(
            crate::middleware::request_tracking_middleware,
        ))
        .with_state(state)
}
