//! Handler模块

use axum::{
    extract::{Path, State},
    Json,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;

use common::errors::AppError;
use common::models::connection::ConnectionItem;
use common::response::ApiResponse;

use crate::application::ApplicationState;
use crate::service::ConnectionService;
use crate::state::AppState;

/// 列出所有已注册的连接
#[utoipa::path(
    get,
    path = "/api/connections",
    tag = "connections",
    responses(
        (status = 200, description = "连接列表", body = ApiResponse<Vec<ConnectionItem>>)
    )
)]
pub async fn list_connections(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Vec<ConnectionItem>>>, AppError> {
    let service = ConnectionService::new(state.app.connection_manager().clone());
    let data = service.list();
    Ok(Json(ApiResponse::ok_with_service(data, state.service_name())))
}

/// 根据名称获取连接
#[utoipa::path(
    get,
    path = "/api/connections/{name}",
    tag = "connections",
    params(
        ("name" = String, Path, description = "连接名称")
    ),
    responses(
        (status = 200, description = "连接详情", body = ApiResponse<ConnectionItem>),
        (status = 404, description = "连接未找到")
    )
)]
pub async fn get_connection(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<ApiResponse<ConnectionItem>>, AppError> {
    let service = ConnectionService::new(state.app.connection_manager().clone());
    let data = service.get(&name)?;
    Ok(Json(ApiResponse::ok_with_service(data, state.service_name())))
}

/// 执行数据库结构迁移（尚未支持）
#[utoipa::path(
    post,
    path = "/api/schema/migrate",
    tag = "schema",
    responses(
        (status = 501, description = "不支持结构迁移")
    )
)]
pub async fn migrate_schema(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<bool>>, AppError> {
    state.app.migrate_schema().await?;
    Ok(Json(ApiResponse::ok_with_service(true, state.service_name())))
}

/// 健康检查端点
#[utoipa::path(
    get,
    path = "/api/health",
    tag = "health",
    responses(
        (status = 200, description = "服务运行正常", body = HealthResponse)
    )
)]
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let manager = state.app.connection_manager();
    let connected = manager
        .connections()
        .iter()
        .filter(|c| c.is_connected())
        .count();

    Json(HealthResponse {
        status: "healthy".to_string(),
        service: state.service_name().to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: Utc::now(),
        state: state.app.state().await,
        connections: manager.len(),
        connected,
    })
}

#[derive(Serialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
    pub version: String,
    pub timestamp: DateTime<Utc>,
    pub state: ApplicationState,
    pub connections: usize,
    pub connected: usize,
}
