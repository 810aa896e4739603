use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{error, info};

use crate::config::HuaweiConfig;
use crate::error::Result;
use crate::push::error::{PushError, PushResult};
use crate::push::provider::provider_trait::VendorTransport;
use crate::push::provider::{decode_json, only_ok, resolve_endpoint};
use crate::push::token::{AccessToken, TokenSource};
use crate::push::types::{Message, PushVendor};

const VENDOR: PushVendor = PushVendor::Huawei;
const DEFAULT_ENDPOINT: &str = "https://push-api.cloud.huawei.com";
const DEFAULT_TOKEN_ENDPOINT: &str = "https://oauth-login.cloud.huawei.com/oauth2/v3/token";
/// 推送成功的业务码
const SUCCESS_CODE: &str = "80000000";

/// HUAWEI Push Kit
///
/// 鉴权走 OAuth 2.0 client_credentials，推送走 `/v1/{client_id}/messages:send`。
pub struct HuaweiTransport {
    client: Client,
    endpoint: String,
    token_endpoint: String,
    client_id: String,
    client_secret: String,
    target_user_type: i32,
}

#[derive(Debug, Deserialize)]
pub struct HuaweiTokenResponse {
    #[serde(default)]
    pub access_token: String,
    #[serde(default)]
    pub token_type: String,
    #[serde(default)]
    pub expires_in: i64,
    pub error: Option<i64>,
    pub error_description: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct HuaweiPushResponse {
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub msg: String,
    #[serde(rename = "requestId", default)]
    pub request_id: String,
}

impl HuaweiTransport {
    pub fn new(config: &HuaweiConfig, client: Client) -> Result<Self> {
        Ok(Self {
            client,
            endpoint: resolve_endpoint(VENDOR, config.endpoint.as_deref(), DEFAULT_ENDPOINT)?,
            token_endpoint: resolve_endpoint(
                VENDOR,
                config.token_endpoint.as_deref(),
                DEFAULT_TOKEN_ENDPOINT,
            )?,
            client_id: config.client_id.clone(),
            client_secret: config.client_secret.clone(),
            target_user_type: config.target_user_type,
        })
    }

    /// 构建 Push Kit 下行消息
    pub fn build_push_body(&self, message: &Message) -> Value {
        json!({
            "validate_only": false,
            "message": {
                "android": {
                    "category": "IM",
                    "target_user_type": self.target_user_type,
                    "notification": {
                        "title": message.payload.title,
                        "body": message.payload.content,
                        "click_action": {
                            "type": 3,
                        }
                    }
                },
                "token": message.device_tokens,
            }
        })
    }
}

/// 请求头取值为 `"{token_type} {access_token}"`
pub fn parse_token_response(resp: HuaweiTokenResponse) -> PushResult<AccessToken> {
    if let Some(code) = resp.error {
        return Err(PushError::vendor(
            VENDOR,
            format!(
                "error={}, description={}",
                code,
                resp.error_description.unwrap_or_default()
            ),
        ));
    }
    if resp.access_token.is_empty() {
        return Err(PushError::vendor(VENDOR, "empty access_token"));
    }
    let header = format!("{} {}", resp.token_type, resp.access_token);
    Ok(AccessToken::expires_in(header.trim_start(), resp.expires_in))
}

pub fn check_push_response(resp: &HuaweiPushResponse) -> PushResult<()> {
    if resp.code != SUCCESS_CODE {
        return Err(PushError::vendor(
            VENDOR,
            format!(
                "code={}, msg={}, request_id={}",
                resp.code, resp.msg, resp.request_id
            ),
        ));
    }
    Ok(())
}

#[async_trait]
impl TokenSource for HuaweiTransport {
    fn vendor(&self) -> PushVendor {
        VENDOR
    }

    async fn fetch_token(&self) -> PushResult<AccessToken> {
        let form = [
            ("grant_type", "client_credentials"),
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.as_str()),
        ];
        let response = self
            .client
            .post(&self.token_endpoint)
            .form(&form)
            .send()
            .await
            .map_err(|e| PushError::transport(VENDOR, e))?;

        let resp: HuaweiTokenResponse = decode_json(VENDOR, response, only_ok).await?;
        parse_token_response(resp)
    }
}

#[async_trait]
impl VendorTransport for HuaweiTransport {
    fn vendor(&self) -> PushVendor {
        VENDOR
    }

    async fn send_push(&self, token: Option<&str>, message: &Message) -> PushResult<()> {
        let token = token.ok_or_else(|| PushError::TokenFetch {
            vendor: VENDOR,
            message: "missing token".to_string(),
        })?;
        let url = format!("{}/v1/{}/messages:send", self.endpoint, self.client_id);

        info!("[HUAWEI] Sending push: business_id={}", message.payload.business_id);

        let response = self
            .client
            .post(&url)
            .header(reqwest::header::AUTHORIZATION, token)
            .json(&self.build_push_body(message))
            .send()
            .await
            .map_err(|e| PushError::transport(VENDOR, e))?;

        let resp: HuaweiPushResponse = decode_json(VENDOR, response, only_ok).await?;
        if let Err(e) = check_push_response(&resp) {
            error!("[HUAWEI] Push failed: business_id={}, {}", message.payload.business_id, e);
            return Err(e);
        }
        Ok(())
    }
}
