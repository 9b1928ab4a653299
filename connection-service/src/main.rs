//! 数据源连接注册服务
//!
//! 启动流程：
//! - 扫描 `connections/*.connection.json` 并注册连接
//! - 并发建立所有连接
//! - 提供 HTTP 管理接口，收到 Ctrl-C 后关闭所有连接

use std::sync::Arc;

use common::config::AppConfig;
use common::errors::AppError;
use connection_service::routes::create_router;
use connection_service::state::AppState;
use connection_service::Application;
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const SERVICE_NAME: &str = "connection-service";

fn main() -> anyhow::Result<()> {
    // .env 必须在运行时线程启动前加载
    dotenvy::dotenv().ok();

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?
        .block_on(run())
}

async fn run() -> anyhow::Result<()> {
    // 初始化日志追踪
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    // 加载配置
    let config = AppConfig::load_with_service(SERVICE_NAME);
    let app = Arc::new(Application::new(config.clone()));

    // 启动应用：引导连接文件并建立连接。部分连接失败时服务仍然运行
    match app.start().await {
        Ok(()) => {}
        Err(e @ AppError::ConnectionStartup { .. }) => {
            warn!(error = %e, "部分连接启动失败，服务继续运行");
        }
        Err(e) => return Err(e.into()),
    }

    // 启动服务
    let addr = config.bind_addr();
    info!(service = SERVICE_NAME, address = %addr, "启动服务");

    let listener = TcpListener::bind(&addr).await?;
    axum::serve(listener, create_router(AppState::new(Arc::clone(&app))))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // 关闭所有连接，失败不阻止进程退出
    if let Err(e) = app.stop().await {
        warn!(error = %e, "连接关闭未完全成功");
    }
    info!(service = SERVICE_NAME, "服务已停止");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "无法监听 Ctrl-C 信号");
        std::future::pending::<()>().await;
    }
    info!("收到停止信号");
}
