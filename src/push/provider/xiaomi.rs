use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::{error, info};
use url::form_urlencoded;

use crate::config::XiaomiConfig;
use crate::error::Result;
use crate::push::error::{PushError, PushResult};
use crate::push::provider::provider_trait::VendorTransport;
use crate::push::provider::{decode_json, only_ok, resolve_endpoint};
use crate::push::types::{Message, PushVendor};

const VENDOR: PushVendor = PushVendor::Xiaomi;
const DEFAULT_ENDPOINT: &str = "https://api.xmpush.xiaomi.com";
/// 离线消息保留 1 天
const TIME_TO_LIVE_SECS: &str = "86400";

/// XIAOMI 推送（regid 单推）
///
/// 不需要换取 token，直接以 `key={app_secret}` 作为 Authorization。
pub struct XiaomiTransport {
    client: Client,
    endpoint: String,
    app_pkg_name: String,
    app_secret: String,
    channel_id: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct XiaomiResponse {
    pub result: String,
    pub description: String,
    pub code: i64,
    pub info: String,
    pub reason: String,
}

impl XiaomiTransport {
    pub fn new(config: &XiaomiConfig, client: Client) -> Result<Self> {
        Ok(Self {
            client,
            endpoint: resolve_endpoint(VENDOR, config.endpoint.as_deref(), DEFAULT_ENDPOINT)?,
            app_pkg_name: config.app_pkg_name.clone(),
            app_secret: config.app_secret.clone(),
            channel_id: config.channel_id.clone(),
        })
    }

    /// 表单字段；`payload` 先做一次 URL 编码再随表单整体编码
    pub fn build_form(&self, message: &Message) -> Vec<(&'static str, String)> {
        let payload: String =
            form_urlencoded::byte_serialize(message.payload.content.as_bytes()).collect();
        vec![
            ("payload", payload),
            ("restricted_package_name", self.app_pkg_name.clone()),
            ("title", message.payload.title.clone()),
            ("description", message.payload.content.clone()),
            ("time_to_live", TIME_TO_LIVE_SECS.to_string()),
            ("extra.notify_foreground", "1".to_string()),
            ("extra.notify_effect", "1".to_string()),
            ("extra.channel_id", self.channel_id.clone()),
            ("registration_id", message.joined_tokens()),
        ]
    }

    fn authorization(&self) -> String {
        format!("key={}", self.app_secret)
    }
}

pub fn check_push_response(resp: &XiaomiResponse) -> PushResult<()> {
    if resp.code != 0 {
        return Err(PushError::vendor(
            VENDOR,
            format!("code={}, reason={}, info={}", resp.code, resp.reason, resp.info),
        ));
    }
    Ok(())
}

#[async_trait]
impl VendorTransport for XiaomiTransport {
    fn vendor(&self) -> PushVendor {
        VENDOR
    }

    async fn send_push(&self, _token: Option<&str>, message: &Message) -> PushResult<()> {
        let url = format!("{}/v3/message/regid", self.endpoint);

        info!("[XIAOMI] Sending push: business_id={}", message.payload.business_id);

        let response = self
            .client
            .post(&url)
            .header(reqwest::header::AUTHORIZATION, self.authorization())
            .form(&self.build_form(message))
            .send()
            .await
            .map_err(|e| PushError::transport(VENDOR, e))?;

        let resp: XiaomiResponse = decode_json(VENDOR, response, only_ok).await?;
        if let Err(e) = check_push_response(&resp) {
            error!("[XIAOMI] Push failed: business_id={}, {}", message.payload.business_id, e);
            return Err(e);
        }
        Ok(())
    }
}
