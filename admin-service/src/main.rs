//! CRM 管理后台服务入口

use anyhow::Context;
use admin_service::{create_router, state::AppState};
use common::config::AppConfig;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const SERVICE_NAME: &str = "admin-service";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 初始化日志追踪
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    // 加载配置
    let config = AppConfig::load_with_service(SERVICE_NAME).context("加载配置失败")?;

    // 创建应用状态（只读连接 CRM 数据库）
    let state = AppState::new(config.clone())
        .await
        .context("初始化应用状态失败（检查 DATABASE_URL）")?;

    // 创建路由
    let app = create_router(state);

    // 启动服务
    let addr = config.bind_address();
    info!(
        service = SERVICE_NAME,
        address = %addr,
        timeout_ms = config.query.timeout_ms,
        display_limit = config.query.display_limit,
        "启动服务"
    );

    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("绑定地址失败: {addr}"))?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("服务启动失败")?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "无法监听 Ctrl+C 信号");
        std::future::pending::<()>().await;
    }
    info!("收到关闭信号，停止服务");
}
