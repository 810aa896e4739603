use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;
use tracing::info;

use crate::push::error::{PushError, PushResult};
use crate::push::provider::provider_trait::PushProvider;
use crate::push::types::{Message, PushVendor};

/// Mock Provider（用于测试和本地联调）
///
/// 不调用真实 API，只记录收到的消息；可切换为失败模式。
pub struct MockProvider {
    vendor: PushVendor,
    fail: AtomicBool,
    sent: Mutex<Vec<Message>>,
}

impl MockProvider {
    pub fn new(vendor: PushVendor) -> Self {
        Self {
            vendor,
            fail: AtomicBool::new(false),
            sent: Mutex::new(Vec::new()),
        }
    }

    /// 之后的推送全部返回厂商错误
    pub fn set_failing(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    pub fn sent(&self) -> Vec<Message> {
        self.sent.lock().clone()
    }

    pub fn sent_count(&self) -> usize {
        self.sent.lock().len()
    }
}

#[async_trait]
impl PushProvider for MockProvider {
    async fn push_notice(&self, message: &Message) -> PushResult<()> {
        info!(
            "[MOCK PUSH] vendor={}, business_id={}, devices={:?}, title={}",
            self.vendor, message.payload.business_id, message.device_tokens, message.payload.title
        );
        self.sent.lock().push(message.clone());
        if self.fail.load(Ordering::SeqCst) {
            return Err(PushError::vendor(self.vendor, "mock failure"));
        }
        Ok(())
    }

    fn vendor(&self) -> PushVendor {
        self.vendor
    }
}
