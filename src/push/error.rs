use thiserror::Error;

use crate::push::types::PushVendor;

/// 单设备投递过程中的错误
///
/// 这些错误只会记录日志，不会影响 HTTP 响应。
#[derive(Error, Debug)]
pub enum PushError {
    #[error("push client {0} not found")]
    ProviderNotFound(String),

    #[error("{vendor} failed to get token: {message}")]
    TokenFetch { vendor: PushVendor, message: String },

    #[error("{vendor} request failed: {message}")]
    Transport { vendor: PushVendor, message: String },

    #[error("{vendor} rejected push: {message}")]
    Vendor { vendor: PushVendor, message: String },

    #[error("{vendor} request timed out")]
    Timeout { vendor: PushVendor },
}

impl PushError {
    pub fn transport(vendor: PushVendor, err: reqwest::Error) -> Self {
        if err.is_timeout() {
            PushError::Timeout { vendor }
        } else {
            PushError::Transport {
                vendor,
                message: err.to_string(),
            }
        }
    }

    pub fn vendor(vendor: PushVendor, message: impl Into<String>) -> Self {
        PushError::Vendor {
            vendor,
            message: message.into(),
        }
    }

    /// 把发送阶段的错误转为取 token 阶段的错误
    pub fn into_token_error(self, vendor: PushVendor) -> Self {
        match self {
            err @ PushError::TokenFetch { .. } => err,
            other => PushError::TokenFetch {
                vendor,
                message: other.to_string(),
            },
        }
    }

    /// 指标标签
    pub fn kind(&self) -> &'static str {
        match self {
            PushError::ProviderNotFound(_) => "not_found",
            PushError::TokenFetch { .. } => "token",
            PushError::Transport { .. } => "transport",
            PushError::Vendor { .. } => "vendor",
            PushError::Timeout { .. } => "timeout",
        }
    }
}

pub type PushResult<T> = std::result::Result<T, PushError>;
