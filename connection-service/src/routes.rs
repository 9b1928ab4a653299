//! 连接服务路由模块

use axum::{
    routing::{get, post},
    Json, Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;

use crate::handlers;
use crate::state::AppState;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "连接服务 API",
        version = "0.1.0",
        description = "数据源连接注册与生命周期管理服务"
    ),
    paths(
        handlers::list_connections,
        handlers::get_connection,
        handlers::migrate_schema,
        handlers::health_check,
    ),
    components(schemas(
        common::models::ConnectionItem,
        common::models::ConnectionState,
        common::models::DbType,
        common::errors::ConnectionFailure,
        crate::application::ApplicationState,
        handlers::HealthResponse,
    )),
    tags(
        (name = "connections", description = "连接查询端点"),
        (name = "schema", description = "结构迁移端点"),
        (name = "health", description = "健康检查端点")
    )
)]
pub struct ApiDoc;

/// 创建连接管理路由
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/connections", get(handlers::list_connections))
        .route("/api/connections/{name}", get(handlers::get_connection))
        .route("/api/schema/migrate", post(handlers::migrate_schema))
        .route("/api/health", get(handlers::health_check))
}

/// 创建带中间件的完整服务
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .merge(router())
        .route("/api-docs/openapi.json", get(openapi_json))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}
