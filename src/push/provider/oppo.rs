use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{error, info};

use crate::config::OppoConfig;
use crate::error::Result;
use crate::push::error::{PushError, PushResult};
use crate::push::provider::provider_trait::VendorTransport;
use crate::push::provider::{decode_json, only_ok, resolve_endpoint};
use crate::push::sign::{sign_app_key, timestamp_ms};
use crate::push::token::{AccessToken, TokenSource};
use crate::push::types::{Message, PushVendor};

const VENDOR: PushVendor = PushVendor::Oppo;
const DEFAULT_ENDPOINT: &str = "https://api.push.oppomobile.com";
/// auth_token 有效期 24 小时
const TOKEN_TTL_SECS: i64 = 24 * 60 * 60;
/// 离线消息保留 10 天
const OFFLINE_TTL_SECS: i64 = 10 * 24 * 60 * 60;

/// OPPO PUSH
///
/// https://open.oppomobile.com/new/developmentDoc/info?id=11238
pub struct OppoTransport {
    client: Client,
    endpoint: String,
    app_key: String,
    master_secret: String,
    channel_id: String,
}

#[derive(Debug, Deserialize)]
pub struct OppoResponse<T> {
    #[serde(default)]
    pub code: i64,
    #[serde(default)]
    pub message: String,
    pub data: Option<T>,
}

#[derive(Debug, Deserialize)]
pub struct OppoAuthData {
    #[serde(default)]
    pub auth_token: String,
    #[serde(default)]
    pub create_time: i64,
}

#[derive(Debug, Default, Deserialize)]
pub struct OppoPushData {
    #[serde(rename = "messageId", default)]
    pub message_id: String,
    #[serde(rename = "registrationId", default)]
    pub registration_id: String,
}

impl OppoTransport {
    pub fn new(config: &OppoConfig, client: Client) -> Result<Self> {
        Ok(Self {
            client,
            endpoint: resolve_endpoint(VENDOR, config.endpoint.as_deref(), DEFAULT_ENDPOINT)?,
            app_key: config.app_key.clone(),
            master_secret: config.master_secret.clone(),
            channel_id: config.channel_id.clone(),
        })
    }

    fn auth_form(&self, timestamp: i64) -> Vec<(&'static str, String)> {
        vec![
            ("app_key", self.app_key.clone()),
            ("timestamp", timestamp.to_string()),
            ("sign", sign_app_key(&self.app_key, timestamp, &self.master_secret)),
        ]
    }

    /// 单推消息体，以 JSON 字符串放在表单的 `message` 字段里
    pub fn build_message(&self, message: &Message) -> Value {
        json!({
            // 2: registration_id
            "target_type": 2,
            "target_value": message.joined_tokens(),
            "verify_registration_id": false,
            "notification": {
                "style": 1,
                "title": message.payload.title,
                "content": message.payload.content,
                // 0: 启动应用
                "click_action_type": 0,
                "click_action_activity": "",
                "off_line": true,
                "off_line_ttl": OFFLINE_TTL_SECS,
                "channel_id": self.channel_id,
            }
        })
    }
}

pub fn parse_auth_response(resp: OppoResponse<OppoAuthData>) -> PushResult<AccessToken> {
    if resp.code != 0 {
        return Err(PushError::vendor(
            VENDOR,
            format!("code={}, message={}", resp.code, resp.message),
        ));
    }
    let token = resp
        .data
        .map(|d| d.auth_token)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| PushError::vendor(VENDOR, "empty auth_token"))?;
    Ok(AccessToken::expires_in(token, TOKEN_TTL_SECS))
}

pub fn check_push_response(resp: &OppoResponse<OppoPushData>) -> PushResult<()> {
    if resp.code != 0 {
        let data = resp.data.as_ref();
        return Err(PushError::vendor(
            VENDOR,
            format!(
                "code={}, message={}, message_id={}, registration_id={}",
                resp.code,
                resp.message,
                data.map(|d| d.message_id.as_str()).unwrap_or_default(),
                data.map(|d| d.registration_id.as_str()).unwrap_or_default(),
            ),
        ));
    }
    Ok(())
}

#[async_trait]
impl TokenSource for OppoTransport {
    fn vendor(&self) -> PushVendor {
        VENDOR
    }

    async fn fetch_token(&self) -> PushResult<AccessToken> {
        let url = format!("{}/server/v1/auth", self.endpoint);
        let response = self
            .client
            .post(&url)
            .form(&self.auth_form(timestamp_ms()))
            .send()
            .await
            .map_err(|e| PushError::transport(VENDOR, e))?;

        let resp: OppoResponse<OppoAuthData> = decode_json(VENDOR, response, only_ok).await?;
        parse_auth_response(resp)
    }
}

#[async_trait]
impl VendorTransport for OppoTransport {
    fn vendor(&self) -> PushVendor {
        VENDOR
    }

    async fn send_push(&self, token: Option<&str>, message: &Message) -> PushResult<()> {
        let token = token.ok_or_else(|| PushError::TokenFetch {
            vendor: VENDOR,
            message: "missing auth_token".to_string(),
        })?;
        let url = format!("{}/server/v1/message/notification/unicast", self.endpoint);
        let form = [
            ("auth_token", token.to_string()),
            ("message", self.build_message(message).to_string()),
        ];

        info!("[OPPO] Sending push: business_id={}", message.payload.business_id);

        let response = self
            .client
            .post(&url)
            .form(&form)
            .send()
            .await
            .map_err(|e| PushError::transport(VENDOR, e))?;

        let resp: OppoResponse<OppoPushData> = decode_json(VENDOR, response, only_ok).await?;
        if let Err(e) = check_push_response(&resp) {
            error!("[OPPO] Push failed: business_id={}, {}", message.payload.business_id, e);
            return Err(e);
        }
        Ok(())
    }
}
