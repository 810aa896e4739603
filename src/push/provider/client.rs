use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use crate::push::error::PushResult;
use crate::push::provider::provider_trait::{PushProvider, VendorTransport};
use crate::push::token::{TokenCache, TokenSource};
use crate::push::types::{Message, PushVendor};

/// 厂商推送客户端
///
/// 五个厂商共用同一套流程：需要鉴权时先从 `TokenCache` 取 token，再交给 transport 发送。
pub struct VendorClient {
    transport: Arc<dyn VendorTransport>,
    tokens: Option<TokenCache>,
}

impl VendorClient {
    /// 需要鉴权的厂商：transport 同时负责换取 token
    pub fn authenticated<T>(transport: Arc<T>) -> Self
    where
        T: VendorTransport + TokenSource + 'static,
    {
        Self {
            tokens: Some(TokenCache::new(transport.clone())),
            transport,
        }
    }

    /// 不需要鉴权的厂商
    pub fn unauthenticated(transport: Arc<dyn VendorTransport>) -> Self {
        Self {
            transport,
            tokens: None,
        }
    }
}

#[async_trait]
impl PushProvider for VendorClient {
    async fn push_notice(&self, message: &Message) -> PushResult<()> {
        let token = match &self.tokens {
            Some(cache) => Some(cache.get_token().await?),
            None => None,
        };

        debug!(
            "[{}] sending push: business_id={}, devices={}",
            self.transport.vendor(),
            message.payload.business_id,
            message.device_tokens.len()
        );
        self.transport.send_push(token.as_deref(), message).await
    }

    fn vendor(&self) -> PushVendor {
        self.transport.vendor()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::push::error::PushError;
    use crate::push::token::AccessToken;
    use crate::push::types::Payload;
    use parking_lot::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct FakeTransport {
        fetches: AtomicUsize,
        fail_token: bool,
        sent: Mutex<Vec<(Option<String>, Message)>>,
    }

    #[async_trait]
    impl VendorTransport for FakeTransport {
        fn vendor(&self) -> PushVendor {
            PushVendor::Oppo
        }

        async fn send_push(&self, token: Option<&str>, message: &Message) -> PushResult<()> {
            self.sent
                .lock()
                .push((token.map(str::to_string), message.clone()));
            Ok(())
        }
    }

    #[async_trait]
    impl TokenSource for FakeTransport {
        fn vendor(&self) -> PushVendor {
            PushVendor::Oppo
        }

        async fn fetch_token(&self) -> PushResult<AccessToken> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            if self.fail_token {
                return Err(PushError::vendor(PushVendor::Oppo, "sign error"));
            }
            Ok(AccessToken::expires_in("auth-token", 86400))
        }
    }

    fn message() -> Message {
        Message::new(
            "reg-id",
            Payload {
                business_id: "req-1".to_string(),
                title: "t".to_string(),
                content: "c".to_string(),
                ..Payload::default()
            },
        )
    }

    #[tokio::test]
    async fn test_authenticated_client_attaches_token() {
        let transport = Arc::new(FakeTransport::default());
        let client = VendorClient::authenticated(transport.clone());

        client.push_notice(&message()).await.unwrap();
        client.push_notice(&message()).await.unwrap();

        assert_eq!(transport.fetches.load(Ordering::SeqCst), 1);
        let sent = transport.sent.lock();
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[0].0.as_deref(), Some("auth-token"));
        assert_eq!(sent[0].1, message());
        assert_eq!(PushProvider::vendor(&client), PushVendor::Oppo);
    }

    #[tokio::test]
    async fn test_token_failure_skips_send() {
        let transport = Arc::new(FakeTransport {
            fail_token: true,
            ..FakeTransport::default()
        });
        let client = VendorClient::authenticated(transport.clone());

        let err = client.push_notice(&message()).await.unwrap_err();
        assert!(matches!(err, PushError::TokenFetch { .. }));
        assert!(transport.sent.lock().is_empty());
    }

    #[tokio::test]
    async fn test_unauthenticated_client_sends_without_token() {
        let transport = Arc::new(FakeTransport::default());
        let client = VendorClient::unauthenticated(transport.clone());

        client.push_notice(&message()).await.unwrap();

        assert_eq!(transport.fetches.load(Ordering::SeqCst), 0);
        assert_eq!(transport.sent.lock()[0].0, None);
    }
}
