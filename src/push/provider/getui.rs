use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{error, info};

use crate::config::GetuiConfig;
use crate::error::Result;
use crate::push::error::{PushError, PushResult};
use crate::push::provider::provider_trait::VendorTransport;
use crate::push::provider::{decode_json, resolve_endpoint};
use crate::push::sign::{sign_app_key, timestamp_ms};
use crate::push::token::{AccessToken, TokenSource};
use crate::push::types::{Message, PushVendor};

const VENDOR: PushVendor = PushVendor::Getui;
const DEFAULT_ENDPOINT: &str = "https://restapi.getui.com";

/// GETUI（个推）RESTful API v2
///
/// 鉴权：https://docs.getui.com/getui/server/rest_v2/token/
/// 推送：https://docs.getui.com/getui/server/rest_v2/push/
pub struct GetuiTransport {
    client: Client,
    endpoint: String,
    app_id: String,
    app_key: String,
    master_secret: String,
}

/// GETUI 通用响应
#[derive(Debug, Deserialize)]
pub struct GetuiResponse<T> {
    #[serde(default)]
    pub code: i64,
    #[serde(default)]
    pub msg: String,
    pub data: Option<T>,
}

#[derive(Debug, Deserialize)]
pub struct GetuiTokenData {
    pub token: String,
    /// 过期时间，毫秒时间戳字符串
    pub expire_time: String,
}

impl GetuiTransport {
    pub fn new(config: &GetuiConfig, client: Client) -> Result<Self> {
        Ok(Self {
            client,
            endpoint: resolve_endpoint(VENDOR, config.endpoint.as_deref(), DEFAULT_ENDPOINT)?,
            app_id: config.app_id.clone(),
            app_key: config.app_key.clone(),
            master_secret: config.master_secret.clone(),
        })
    }

    fn auth_body(&self, timestamp: i64) -> Value {
        json!({
            "sign": sign_app_key(&self.app_key, timestamp, &self.master_secret),
            "timestamp": timestamp.to_string(),
            "appkey": self.app_key,
        })
    }

    /// 构建单推请求体，厂商通道与个推通道使用相同的标题和正文
    pub fn build_push_body(message: &Message) -> Value {
        let notification = json!({
            "title": message.payload.title,
            "body": message.payload.content,
            "click_type": "startapp",
        });
        json!({
            "request_id": message.payload.business_id,
            "audience": {
                "cid": message.device_tokens,
            },
            "push_message": {
                "notification": notification,
            },
            "push_channel": {
                "android": {
                    "ups": {
                        "notification": notification,
                    }
                }
            }
        })
    }
}

/// GETUI 在 400 时也会返回业务错误码
fn accept_status(status: StatusCode) -> bool {
    status == StatusCode::OK || status == StatusCode::BAD_REQUEST
}

pub fn parse_token_response(resp: GetuiResponse<GetuiTokenData>) -> PushResult<AccessToken> {
    if resp.code != 0 {
        return Err(PushError::vendor(VENDOR, format!("code={}, msg={}", resp.code, resp.msg)));
    }
    let data = resp
        .data
        .ok_or_else(|| PushError::vendor(VENDOR, "token response without data"))?;
    let expire_ms: i64 = data
        .expire_time
        .parse()
        .map_err(|e| PushError::vendor(VENDOR, format!("invalid expire_time {:?}: {}", data.expire_time, e)))?;
    let expires_at = DateTime::<Utc>::from_timestamp_millis(expire_ms)
        .ok_or_else(|| PushError::vendor(VENDOR, format!("expire_time out of range: {}", expire_ms)))?;
    Ok(AccessToken::new(data.token, expires_at))
}

pub fn check_push_response(resp: &GetuiResponse<Value>) -> PushResult<()> {
    if resp.code != 0 {
        return Err(PushError::vendor(VENDOR, format!("code={}, msg={}", resp.code, resp.msg)));
    }
    Ok(())
}

#[async_trait]
impl TokenSource for GetuiTransport {
    fn vendor(&self) -> PushVendor {
        VENDOR
    }

    async fn fetch_token(&self) -> PushResult<AccessToken> {
        let url = format!("{}/v2/{}/auth", self.endpoint, self.app_id);
        let response = self
            .client
            .post(&url)
            .json(&self.auth_body(timestamp_ms()))
            .send()
            .await
            .map_err(|e| PushError::transport(VENDOR, e))?;

        let resp: GetuiResponse<GetuiTokenData> = decode_json(VENDOR, response, accept_status).await?;
        parse_token_response(resp)
    }
}

#[async_trait]
impl VendorTransport for GetuiTransport {
    fn vendor(&self) -> PushVendor {
        VENDOR
    }

    async fn send_push(&self, token: Option<&str>, message: &Message) -> PushResult<()> {
        let token = token.ok_or_else(|| PushError::TokenFetch {
            vendor: VENDOR,
            message: "missing token".to_string(),
        })?;
        let url = format!("{}/v2/{}/push/single/cid", self.endpoint, self.app_id);

        info!("[GETUI] Sending push: business_id={}", message.payload.business_id);

        let response = self
            .client
            .post(&url)
            .header("token", token)
            .json(&Self::build_push_body(message))
            .send()
            .await
            .map_err(|e| PushError::transport(VENDOR, e))?;

        let resp: GetuiResponse<Value> = decode_json(VENDOR, response, accept_status).await?;
        if let Err(e) = check_push_response(&resp) {
            error!("[GETUI] Push failed: business_id={}, {}", message.payload.business_id, e);
            return Err(e);
        }
        Ok(())
    }
}
