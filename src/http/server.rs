//! HTTP 服务器 - 使用 Axum 接收 notify 请求

use axum::{extract::DefaultBodyLimit, Router};
use std::sync::Arc;
use tokio::signal;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use crate::http::routes;
use crate::push::PushDispatcher;

/// HTTP 服务器共享状态
#[derive(Clone)]
pub struct HttpServerState {
    pub dispatcher: Arc<PushDispatcher>,
    /// 请求体上限（字节）
    pub max_body_bytes: usize,
}

impl HttpServerState {
    pub fn new(dispatcher: Arc<PushDispatcher>, max_body_bytes: usize) -> Self {
        Self {
            dispatcher,
            max_body_bytes,
        }
    }
}

/// 构建完整应用（路由 + 中间件 + 状态）
pub fn create_app(state: HttpServerState) -> Router {
    Router::new()
        .merge(routes::create_routes())
        .layer(DefaultBodyLimit::max(state.max_body_bytes))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Push 网关 HTTP 服务器
pub struct GatewayHttpServer {
    state: HttpServerState,
    bind_address: String,
}

impl GatewayHttpServer {
    pub fn new(state: HttpServerState, bind_address: impl Into<String>) -> Self {
        Self {
            state,
            bind_address: bind_address.into(),
        }
    }

    /// 启动 HTTP 服务器，收到 Ctrl+C / SIGTERM 后等待在途请求结束再返回
    pub async fn start(&self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let app = create_app(self.state.clone());

        let listener = tokio::net::TcpListener::bind(&self.bind_address).await?;

        info!("🌐 Push 网关 HTTP 服务器启动在 {}", self.bind_address);

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        info!("👋 HTTP 服务器已停止");
        Ok(())
    }
}

/// 等待 Ctrl+C 或 SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("无法监听 Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("无法监听 SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("收到 Ctrl+C，开始优雅关闭"),
        _ = terminate => info!("收到 SIGTERM，开始优雅关闭"),
    }
}
