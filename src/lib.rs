pub mod cli;
pub mod config;
pub mod error;
pub mod http;  // notify / health / metrics 接口
pub mod infra;
pub mod logging;
pub mod model;
pub mod push;  // 分组、渲染、厂商通道

pub use config::GatewayConfig;
pub use error::{Result, ServerError};
pub use http::{GatewayHttpServer, HttpServerState};
pub use push::{ProviderRegistry, PushDispatcher};
