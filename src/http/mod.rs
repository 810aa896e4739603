//! HTTP 服务器模块 - 使用 Axum 提供推送网关接口
//!
//! 功能包括：
//! - notify 接收接口
//! - 健康检查
//! - Prometheus 指标

pub mod routes;
pub mod server;

pub use server::{create_app, GatewayHttpServer, HttpServerState};
