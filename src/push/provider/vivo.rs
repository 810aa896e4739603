use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{error, info};

use crate::config::VivoConfig;
use crate::error::Result;
use crate::push::error::{PushError, PushResult};
use crate::push::provider::provider_trait::VendorTransport;
use crate::push::provider::{decode_json, only_ok, resolve_endpoint};
use crate::push::sign::{sign_app_id_key, timestamp_ms};
use crate::push::token::{AccessToken, TokenSource};
use crate::push::types::{Message, PushVendor};

const VENDOR: PushVendor = PushVendor::Vivo;
const DEFAULT_ENDPOINT: &str = "https://api-push.vivo.com.cn";
/// authToken 有效期 24 小时
const TOKEN_TTL_SECS: i64 = 24 * 60 * 60;
/// 消息缓存 1 天（取值 60 秒到 7 天）
const TIME_TO_LIVE_SECS: i64 = 24 * 60 * 60;

/// VIVO PUSH
///
/// https://dev.vivo.com.cn/documentCenter/doc/362
pub struct VivoTransport {
    client: Client,
    endpoint: String,
    app_id: String,
    numeric_app_id: i64,
    app_key: String,
    app_secret: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct VivoResponse {
    pub result: i64,
    pub desc: String,
    #[serde(rename = "authToken")]
    pub auth_token: String,
    #[serde(rename = "taskId")]
    pub task_id: String,
}

impl VivoTransport {
    pub fn new(config: &VivoConfig, client: Client) -> Result<Self> {
        Ok(Self {
            client,
            endpoint: resolve_endpoint(VENDOR, config.endpoint.as_deref(), DEFAULT_ENDPOINT)?,
            app_id: config.app_id.clone(),
            numeric_app_id: config.numeric_app_id()?,
            app_key: config.app_key.clone(),
            app_secret: config.app_secret.clone(),
        })
    }

    fn auth_body(&self, timestamp: i64) -> Value {
        json!({
            "appId": self.app_id,
            "appKey": self.app_key,
            "timestamp": timestamp,
            "sign": sign_app_id_key(&self.app_id, &self.app_key, timestamp, &self.app_secret),
        })
    }

    pub fn build_push_body(&self, message: &Message) -> Value {
        json!({
            "appId": self.numeric_app_id,
            "regId": message.joined_tokens(),
            // 1: 无提醒
            "notifyType": 1,
            "title": message.payload.title,
            "content": message.payload.content,
            "timeToLive": TIME_TO_LIVE_SECS,
            // 1: 打开 APP 首页
            "skipType": 1,
            "skipContent": "",
            // 1: 系统类消息
            "classification": 1,
            "networkType": "",
            "clientCustomMap": {},
            "extra": {},
            "requestId": message.payload.business_id,
            "category": "IM",
        })
    }
}

pub fn parse_auth_response(resp: VivoResponse) -> PushResult<AccessToken> {
    if resp.result != 0 {
        return Err(PushError::vendor(
            VENDOR,
            format!("result={}, desc={}", resp.result, resp.desc),
        ));
    }
    if resp.auth_token.is_empty() {
        return Err(PushError::vendor(VENDOR, "empty authToken"));
    }
    Ok(AccessToken::expires_in(resp.auth_token, TOKEN_TTL_SECS))
}

pub fn check_push_response(resp: &VivoResponse) -> PushResult<()> {
    if resp.result != 0 {
        return Err(PushError::vendor(
            VENDOR,
            format!("result={}, desc={}, task_id={}", resp.result, resp.desc, resp.task_id),
        ));
    }
    Ok(())
}

#[async_trait]
impl TokenSource for VivoTransport {
    fn vendor(&self) -> PushVendor {
        VENDOR
    }

    async fn fetch_token(&self) -> PushResult<AccessToken> {
        let url = format!("{}/message/auth", self.endpoint);
        let response = self
            .client
            .post(&url)
            .json(&self.auth_body(timestamp_ms()))
            .send()
            .await
            .map_err(|e| PushError::transport(VENDOR, e))?;

        let resp: VivoResponse = decode_json(VENDOR, response, only_ok).await?;
        parse_auth_response(resp)
    }
}

#[async_trait]
impl VendorTransport for VivoTransport {
    fn vendor(&self) -> PushVendor {
        VENDOR
    }

    async fn send_push(&self, token: Option<&str>, message: &Message) -> PushResult<()> {
        let token = token.ok_or_else(|| PushError::TokenFetch {
            vendor: VENDOR,
            message: "missing authToken".to_string(),
        })?;
        let url = format!("{}/message/send", self.endpoint);

        info!("[VIVO] Sending push: business_id={}", message.payload.business_id);

        let response = self
            .client
            .post(&url)
            .header("authToken", token)
            .json(&self.build_push_body(message))
            .send()
            .await
            .map_err(|e| PushError::transport(VENDOR, e))?;

        let resp: VivoResponse = decode_json(VENDOR, response, only_ok).await?;
        if let Err(e) = check_push_response(&resp) {
            error!("[VIVO] Push failed: business_id={}, {}", message.payload.business_id, e);
            return Err(e);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ServerError;
    use crate::push::types::Payload;

    fn config(app_id: &str) -> VivoConfig {
        VivoConfig {
            app_id: app_id.to_string(),
            app_key: "key".to_string(),
            app_secret: "secret".to_string(),
            endpoint: None,
        }
    }

    #[test]
    fn test_non_numeric_app_id_rejected() {
        assert!(matches!(
            VivoTransport::new(&config("abc"), Client::new()),
            Err(ServerError::Configuration(_))
        ));
    }

    #[test]
    fn test_auth_body() {
        let t = VivoTransport::new(&config("10086"), Client::new()).unwrap();
        let body = t.auth_body(1700000000000);
        assert_eq!(body["appId"], "10086");
        assert_eq!(body["timestamp"], 1700000000000i64);
        assert_eq!(
            body["sign"],
            sign_app_id_key("10086", "key", 1700000000000, "secret")
        );
    }

    #[test]
    fn test_push_body() {
        let t = VivoTransport::new(&config("10086"), Client::new()).unwrap();
        let message = Message::new(
            "reg-1",
            Payload {
                business_id: "req-9".to_string(),
                title: "Room".to_string(),
                content: "hello".to_string(),
                ..Payload::default()
            },
        );
        let body = t.build_push_body(&message);
        assert_eq!(body["appId"], 10086);
        assert_eq!(body["regId"], "reg-1");
        assert_eq!(body["requestId"], "req-9");
        assert_eq!(body["timeToLive"], 86400);
        assert_eq!(body["classification"], 1);
        assert_eq!(body["category"], "IM");
    }

    #[test]
    fn test_parse_responses() {
        let auth: VivoResponse =
            serde_json::from_str(r#"{"result":0,"desc":"请求成功","authToken":"24ojv"}"#).unwrap();
        assert_eq!(parse_auth_response(auth).unwrap().token, "24ojv");

        let auth: VivoResponse =
            serde_json::from_str(r#"{"result":10070,"desc":"sign不正确"}"#).unwrap();
        assert!(parse_auth_response(auth).is_err());

        let push: VivoResponse =
            serde_json::from_str(r#"{"result":0,"desc":"请求成功","taskId":"5"}"#).unwrap();
        assert!(check_push_response(&push).is_ok());

        let push: VivoResponse =
            serde_json::from_str(r#"{"result":10302,"desc":"regId不合法","taskId":""}"#).unwrap();
        assert!(check_push_response(&push).unwrap_err().to_string().contains("10302"));
    }
}
