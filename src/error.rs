use std::error::Error as StdError;
use std::fmt;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::{Deserialize, Serialize};

use crate::config::ConfigError;

/// 服务器错误类型
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerError {
    /// 请求体缺失、过大、格式错误或设备列表为空
    BadRequest(String),
    /// 配置错误（仅启动阶段）
    Configuration(String),
    /// 内部错误
    Internal(String),
}

impl fmt::Display for ServerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServerError::BadRequest(msg) => write!(f, "Bad request: {}", msg),
            ServerError::Configuration(msg) => write!(f, "Configuration error: {}", msg),
            ServerError::Internal(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl StdError for ServerError {}

impl ServerError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ServerError::BadRequest(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status_code = self.status_code();
        (status_code, Json(ErrorResponse::new(&self))).into_response()
    }
}

impl From<ConfigError> for ServerError {
    fn from(err: ConfigError) -> Self {
        ServerError::Configuration(err.to_string())
    }
}

/// 结果类型别名
pub type Result<T> = std::result::Result<T, ServerError>;

/// 错误响应：`{"code": 400, "message": "..."}`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ErrorResponse {
    /// HTTP 状态码
    pub code: u16,
    pub message: String,
}

impl ErrorResponse {
    pub fn new(error: &ServerError) -> Self {
        let message = match error {
            // 客户端只看到具体原因
            ServerError::BadRequest(msg) => msg.clone(),
            other => other.to_string(),
        };
        Self {
            code: error.status_code().as_u16(),
            message,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bad_request_response() {
        let err = ServerError::BadRequest("body is missing".to_string());
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(
            ErrorResponse::new(&err),
            ErrorResponse {
                code: 400,
                message: "body is missing".to_string()
            }
        );
    }

    #[test]
    fn test_config_error_conversion() {
        let err: ServerError = ConfigError::MissingField {
            section: "pusher.getui",
            field: "app_id",
        }
        .into();
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            err.to_string(),
            "Configuration error: pusher.getui.app_id is required"
        );
    }
}
