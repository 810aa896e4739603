//! notify 接收路由
//!
//! 路由：POST /_matrix/push/v1/notify
//! 请求体：`{"notification": {...}}`；校验通过后总是返回 `{}`，单设备投递失败只记日志。

use axum::{
    extract::{rejection::BytesRejection, State},
    http::StatusCode,
    response::Json,
    routing::post,
    Router,
};
use bytes::Bytes;
use serde_json::{json, Value};
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::{Result, ServerError};
use crate::http::HttpServerState;
use crate::infra::metrics;
use crate::model::notification::NotifyRequest;

pub const NOTIFY_PATH: &str = "/_matrix/push/v1/notify";

pub fn create_route() -> Router<HttpServerState> {
    Router::new().route(NOTIFY_PATH, post(notify))
}

async fn notify(
    State(state): State<HttpServerState>,
    body: std::result::Result<Bytes, BytesRejection>,
) -> Result<Json<Value>> {
    let request_id = Uuid::new_v4().to_string();
    let result = handle_notify(&state, &request_id, body).await;
    match &result {
        Ok(outcome) => metrics::record_notify_request(*outcome),
        Err(e) => {
            warn!("[NOTIFY] Rejected request: request_id={}, {}", request_id, e);
            metrics::record_notify_request("rejected");
        }
    }
    result.map(|_| Json(json!({})))
}

/// 返回请求结果标签（accepted / skipped）
async fn handle_notify(
    state: &HttpServerState,
    request_id: &str,
    body: std::result::Result<Bytes, BytesRejection>,
) -> Result<&'static str> {
    let body = body.map_err(|rejection| {
        if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
            ServerError::BadRequest(format!(
                "body is larger than {} bytes",
                state.max_body_bytes
            ))
        } else {
            ServerError::BadRequest(format!("Fail read request body: {}", rejection.body_text()))
        }
    })?;

    if body.is_empty() {
        return Err(ServerError::BadRequest("body is missing".to_string()));
    }

    let request: NotifyRequest = serde_json::from_slice(&body).map_err(|e| {
        warn!("[NOTIFY] Invalid body: request_id={}, error={}", request_id, e);
        ServerError::BadRequest("Fail unmarshal request body".to_string())
    })?;
    let notification = request.notification;

    if notification.devices.is_empty() {
        return Err(ServerError::BadRequest("Devices field is missing".to_string()));
    }

    info!(
        "[NOTIFY] request_id={}, event_id={}, room_id={}, devices={}",
        request_id,
        notification.event_id,
        notification.room_id,
        notification.devices.len()
    );

    // 没有发送者的事件（如已读回执计数更新）不推送
    if notification.sender.is_empty() {
        return Ok("skipped");
    }

    state.dispatcher.dispatch(request_id, &notification).await;
    Ok("accepted")
}
