pub mod client;
pub mod getui;
pub mod huawei;
pub mod mock;
pub mod oppo;
pub mod provider_trait;
pub mod vivo;
pub mod xiaomi;

pub use client::VendorClient;
pub use getui::GetuiTransport;
pub use huawei::HuaweiTransport;
pub use mock::MockProvider;
pub use oppo::OppoTransport;
pub use provider_trait::{PushProvider, VendorTransport};
pub use vivo::VivoTransport;
pub use xiaomi::XiaomiTransport;

use std::time::Duration;

use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use url::Url;

use crate::error::{Result, ServerError};
use crate::push::error::{PushError, PushResult};
use crate::push::types::PushVendor;

/// 所有厂商共用的 HTTP 客户端，带整体超时
pub fn build_http_client(timeout: Duration) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(timeout)
        .connect_timeout(timeout.min(Duration::from_secs(5)))
        .build()
        .map_err(|e| ServerError::Internal(format!("Failed to build HTTP client: {}", e)))
}

/// 解析厂商接口地址（配置覆盖或默认值），去掉末尾 `/`
pub(crate) fn resolve_endpoint(
    vendor: PushVendor,
    configured: Option<&str>,
    default: &str,
) -> Result<String> {
    let raw = configured.unwrap_or(default);
    let url = Url::parse(raw).map_err(|e| {
        ServerError::Configuration(format!("invalid {} endpoint {:?}: {}", vendor, raw, e))
    })?;
    Ok(url.as_str().trim_end_matches('/').to_string())
}

/// 读取厂商响应体
///
/// `accept` 判断哪些 HTTP 状态码仍按 JSON 解析（部分厂商在 400 时也返回业务错误码）。
pub(crate) async fn decode_json<T: DeserializeOwned>(
    vendor: PushVendor,
    response: reqwest::Response,
    accept: impl Fn(StatusCode) -> bool,
) -> PushResult<T> {
    let status = response.status();
    if !accept(status) {
        let body = response.text().await.unwrap_or_default();
        return Err(PushError::vendor(
            vendor,
            format!("status={}, body={}", status, body),
        ));
    }
    response.json::<T>().await.map_err(|e| PushError::Transport {
        vendor,
        message: format!("failed to decode response: {}", e),
    })
}

pub(crate) fn only_ok(status: StatusCode) -> bool {
    status == StatusCode::OK
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_endpoint() {
        assert_eq!(
            resolve_endpoint(PushVendor::Getui, None, "https://restapi.getui.com").unwrap(),
            "https://restapi.getui.com"
        );
        assert_eq!(
            resolve_endpoint(PushVendor::Oppo, Some("http://127.0.0.1:9000/"), "https://x").unwrap(),
            "http://127.0.0.1:9000"
        );
        assert!(matches!(
            resolve_endpoint(PushVendor::Vivo, Some("not a url"), "https://x"),
            Err(ServerError::Configuration(_))
        ));
    }
}
