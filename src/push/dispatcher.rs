use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;

use futures::future::join_all;
use tracing::{debug, info, warn};

use crate::config::RenderConfig;
use crate::infra::metrics;
use crate::model::notification::{Device, Notification};
use crate::push::error::PushResult;
use crate::push::registry::ProviderRegistry;
use crate::push::render::{render, RenderedNotice};
use crate::push::types::{Message, Payload, PushTag};

/// 一次 notify 请求的投递结果
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchReport {
    pub delivered: usize,
    pub failed: usize,
}

/// Push Dispatcher（推送分发器）
///
/// 职责：
/// - 按 `app_id` 把设备分组到厂商标签
/// - 每个请求只渲染一次标题和正文
/// - 为每个设备构造 `Message` 并并发调用对应客户端
/// - 单设备失败只记日志，不影响其他设备
pub struct PushDispatcher {
    registry: Arc<ProviderRegistry>,
    render: RenderConfig,
}

/// 按厂商标签分组，组内保持请求中的设备顺序
pub fn group_devices(devices: &[Device]) -> BTreeMap<PushTag, Vec<&Device>> {
    let mut groups: BTreeMap<PushTag, Vec<&Device>> = BTreeMap::new();
    for device in devices {
        groups
            .entry(PushTag::from_app_id(&device.app_id))
            .or_default()
            .push(device);
    }
    groups
}

impl PushDispatcher {
    pub fn new(registry: Arc<ProviderRegistry>, render: RenderConfig) -> Self {
        Self { registry, render }
    }

    pub fn registry(&self) -> &ProviderRegistry {
        &self.registry
    }

    /// 投递一条通知到其全部设备
    ///
    /// `request_id` 作为每条消息的 business_id。
    pub async fn dispatch(&self, request_id: &str, notification: &Notification) -> DispatchReport {
        let notice = render(notification, &self.render);
        debug!(
            "[DISPATCH] request_id={}, title={:?}, content={:?}",
            request_id, notice.title, notice.content
        );

        let groups = group_devices(&notification.devices);
        let mut deliveries = Vec::with_capacity(notification.devices.len());
        for (tag, devices) in &groups {
            for device in devices {
                deliveries.push(self.deliver(request_id, tag, device, &notice));
            }
        }

        let results = join_all(deliveries).await;
        let delivered = results.iter().filter(|r| r.is_ok()).count();
        let report = DispatchReport {
            delivered,
            failed: results.len() - delivered,
        };

        info!(
            "[DISPATCH] request_id={}, event_id={}, delivered={}, failed={}",
            request_id, notification.event_id, report.delivered, report.failed
        );
        report
    }

    async fn deliver(
        &self,
        request_id: &str,
        tag: &PushTag,
        device: &Device,
        notice: &RenderedNotice,
    ) -> PushResult<()> {
        let started = Instant::now();
        let result = self.try_deliver(request_id, tag, device, notice).await;
        let elapsed = started.elapsed().as_secs_f64();

        match &result {
            Ok(()) => {
                metrics::record_delivery(&tag.to_string(), "ok", elapsed);
            }
            Err(e) => {
                warn!(
                    "[DISPATCH] Delivery failed: request_id={}, tag={}, device={}, error={}",
                    request_id, tag, device.pushkey, e
                );
                metrics::record_delivery(&tag.to_string(), e.kind(), elapsed);
            }
        }
        result
    }

    async fn try_deliver(
        &self,
        request_id: &str,
        tag: &PushTag,
        device: &Device,
        notice: &RenderedNotice,
    ) -> PushResult<()> {
        let client = self.registry.get_client(tag)?;
        let message = Message::new(
            device.pushkey.clone(),
            Payload {
                business_id: request_id.to_string(),
                title: notice.title.clone(),
                content: notice.content.clone(),
                ..Payload::default()
            },
        );
        client.push_notice(&message).await
    }
}
