//! HTTP 路由模块
//!
//! 路由结构：
//! - `POST /_matrix/push/v1/notify` - 接收 homeserver 推送通知
//! - `GET /health` - 健康检查，返回已配置的厂商
//! - `GET /metrics` - Prometheus 抓取端点

pub mod health;
pub mod metrics;
pub mod notify;

use axum::{routing::get, Router};
use crate::http::HttpServerState;

/// 创建所有路由
pub fn create_routes() -> Router<HttpServerState> {
    Router::new()
        .route("/metrics", get(metrics::metrics_handler))
        .merge(health::create_route())     // /health
        .merge(notify::create_route())     // /_matrix/push/v1/notify
}
