use async_trait::async_trait;

use crate::push::error::PushResult;
use crate::push::types::{Message, PushVendor};

/// Push Provider Trait（推送提供者接口）
///
/// 注册表按厂商标签返回该接口，HTTP 层只依赖它。
#[async_trait]
pub trait PushProvider: Send + Sync {
    /// 推送一条通知
    async fn push_notice(&self, message: &Message) -> PushResult<()>;

    /// 获取 Provider 对应的 Vendor
    fn vendor(&self) -> PushVendor;
}

/// 厂商推送接口
///
/// 只负责把 `Message` 转成厂商请求并解释厂商返回码；token 由调用方传入，
/// 不需要鉴权的厂商收到 `None`。
#[async_trait]
pub trait VendorTransport: Send + Sync {
    fn vendor(&self) -> PushVendor;

    async fn send_push(&self, token: Option<&str>, message: &Message) -> PushResult<()>;
}
