//! Prometheus 指标：入站请求、厂商投递结果、token 刷新
//!
//! 通过 `init()` 安装全局 Recorder，通过 HTTP GET `/metrics` 暴露抓取端点。
//! 未初始化时各 `record_*` 调用为空操作。

use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::OnceLock;

use crate::push::types::PushVendor;

static HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// 指标名称
const COUNTER_NOTIFY_REQUESTS: &str = "push_gateway_notify_requests_total";
const COUNTER_DELIVERIES: &str = "push_gateway_deliveries_total";
const HISTOGRAM_DELIVERY_DURATION: &str = "push_gateway_delivery_duration_seconds";
const COUNTER_TOKEN_REFRESH: &str = "push_gateway_token_refresh_total";

/// 初始化 Prometheus 指标（安装全局 Recorder）。
/// 仅需在进程内调用一次；重复调用会返回 Err。
pub fn init() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let handle = metrics_exporter_prometheus::PrometheusBuilder::new().install_recorder()?;
    HANDLE
        .set(handle)
        .map_err(|_| "metrics already initialized")?;
    Ok(())
}

/// 渲染当前指标为 Prometheus 文本格式，供 GET /metrics 使用。
pub fn render_metrics() -> Option<String> {
    HANDLE.get().map(|h| h.render())
}

/// 记录一次 notify 请求，`outcome` 为 accepted / rejected / skipped
pub fn record_notify_request(outcome: &'static str) {
    metrics::counter!(COUNTER_NOTIFY_REQUESTS, "outcome" => outcome).increment(1);
}

/// 记录一次设备投递
pub fn record_delivery(tag: &str, outcome: &'static str, duration_secs: f64) {
    metrics::counter!(COUNTER_DELIVERIES, "tag" => tag.to_string(), "outcome" => outcome).increment(1);
    metrics::histogram!(HISTOGRAM_DELIVERY_DURATION, "tag" => tag.to_string()).record(duration_secs);
}

pub fn record_token_refresh(vendor: PushVendor, success: bool) {
    let outcome = if success { "ok" } else { "error" };
    metrics::counter!(COUNTER_TOKEN_REFRESH, "vendor" => vendor.as_str(), "outcome" => outcome)
        .increment(1);
}
