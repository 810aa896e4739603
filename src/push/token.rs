//! 厂商鉴权 token 缓存
//!
//! 除 XIAOMI 外，每个厂商通道在推送前都要先换取一个短期 token。
//! `TokenCache` 对所有厂商通用：过期前 5 分钟刷新，同一实例同一时刻最多只有
//! 一个刷新请求在途，其余调用方每 500ms 重试一次检查，直到拿到新 token。

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::infra::metrics;
use crate::push::error::PushResult;
use crate::push::types::PushVendor;

/// 距离过期不足该时长即视为需要刷新
pub const REFRESH_MARGIN: Duration = Duration::from_secs(5 * 60);
/// 刷新锁被占用时的重试间隔
pub const CONTENTION_RETRY_INTERVAL: Duration = Duration::from_millis(500);

/// 厂商 token 及其绝对过期时间
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

impl AccessToken {
    pub fn new(token: impl Into<String>, expires_at: DateTime<Utc>) -> Self {
        Self {
            token: token.into(),
            expires_at,
        }
    }

    /// 从当前时刻起 `secs` 秒后过期
    pub fn expires_in(token: impl Into<String>, secs: i64) -> Self {
        Self::new(token, Utc::now() + chrono::Duration::seconds(secs))
    }

    pub fn needs_refresh(&self, now: DateTime<Utc>, margin: Duration) -> bool {
        let margin = chrono::Duration::from_std(margin).unwrap_or_else(|_| chrono::Duration::zero());
        now + margin > self.expires_at
    }
}

/// 换取 token 的能力，由各厂商 transport 实现
#[async_trait]
pub trait TokenSource: Send + Sync {
    fn vendor(&self) -> PushVendor;

    /// 向厂商鉴权接口请求新 token（需要签名的厂商每次现算签名）
    async fn fetch_token(&self) -> PushResult<AccessToken>;
}

pub struct TokenCache {
    source: Arc<dyn TokenSource>,
    current: RwLock<Option<AccessToken>>,
    refresh_lock: Mutex<()>,
    refresh_margin: Duration,
    retry_interval: Duration,
}

impl TokenCache {
    pub fn new(source: Arc<dyn TokenSource>) -> Self {
        Self {
            source,
            current: RwLock::new(None),
            refresh_lock: Mutex::new(()),
            refresh_margin: REFRESH_MARGIN,
            retry_interval: CONTENTION_RETRY_INTERVAL,
        }
    }

    pub fn with_timing(mut self, refresh_margin: Duration, retry_interval: Duration) -> Self {
        self.refresh_margin = refresh_margin;
        self.retry_interval = retry_interval;
        self
    }

    pub fn vendor(&self) -> PushVendor {
        self.source.vendor()
    }

    fn fresh_token(&self) -> Option<String> {
        let now = Utc::now();
        self.current
            .read()
            .as_ref()
            .filter(|t| !t.needs_refresh(now, self.refresh_margin))
            .map(|t| t.token.clone())
    }

    /// 获取可用 token
    ///
    /// 未过期时直接返回，不碰刷新锁；需要刷新且锁被占用时睡眠后重新检查。
    /// 刷新失败返回错误，缓存保持原状，下次调用会再次尝试。
    pub async fn get_token(&self) -> PushResult<String> {
        let vendor = self.vendor();
        loop {
            if let Some(token) = self.fresh_token() {
                return Ok(token);
            }

            let Ok(_guard) = self.refresh_lock.try_lock() else {
                debug!("[TOKEN] {} refresh in progress, retry in {:?}", vendor, self.retry_interval);
                tokio::time::sleep(self.retry_interval).await;
                continue;
            };

            // 拿到锁之前可能已有其他调用方刷新完成
            if let Some(token) = self.fresh_token() {
                return Ok(token);
            }

            return match self.source.fetch_token().await {
                Ok(token) => {
                    info!("[TOKEN] {} token refreshed, expires_at={}", vendor, token.expires_at);
                    metrics::record_token_refresh(vendor, true);
                    let value = token.token.clone();
                    *self.current.write() = Some(token);
                    Ok(value)
                }
                Err(e) => {
                    warn!("[TOKEN] {} token refresh failed: {}", vendor, e);
                    metrics::record_token_refresh(vendor, false);
                    Err(e.into_token_error(vendor))
                }
            };
        }
    }

    /// 当前缓存的 token（不触发刷新）
    pub fn cached(&self) -> Option<AccessToken> {
        self.current.read().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::push::error::PushError;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingSource {
        calls: AtomicUsize,
        delay: Duration,
        ttl_secs: i64,
        fail_first: usize,
    }

    impl CountingSource {
        fn new(delay: Duration, ttl_secs: i64) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                delay,
                ttl_secs,
                fail_first: 0,
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl TokenSource for CountingSource {
        fn vendor(&self) -> PushVendor {
            PushVendor::Huawei
        }

        async fn fetch_token(&self) -> PushResult<AccessToken> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            tokio::time::sleep(self.delay).await;
            if n <= self.fail_first {
                return Err(PushError::vendor(PushVendor::Huawei, "invalid client secret"));
            }
            Ok(AccessToken::expires_in(format!("token-{}", n), self.ttl_secs))
        }
    }

    fn cache(source: Arc<CountingSource>) -> TokenCache {
        TokenCache::new(source).with_timing(REFRESH_MARGIN, Duration::from_millis(10))
    }

    #[tokio::test]
    async fn test_concurrent_callers_share_one_fetch() {
        let source = Arc::new(CountingSource::new(Duration::from_millis(100), 3600));
        let cache = Arc::new(cache(source.clone()));

        let handles: Vec<_> = (0..16)
            .map(|_| {
                let cache = cache.clone();
                tokio::spawn(async move { cache.get_token().await })
            })
            .collect();

        let mut tokens = Vec::new();
        for handle in handles {
            tokens.push(handle.await.unwrap().unwrap());
        }

        assert_eq!(source.calls(), 1);
        assert!(tokens.iter().all(|t| t == "token-1"));
    }

    #[tokio::test]
    async fn test_fresh_token_is_reused() {
        let source = Arc::new(CountingSource::new(Duration::ZERO, 3600));
        let cache = cache(source.clone());

        assert_eq!(cache.get_token().await.unwrap(), "token-1");
        assert_eq!(cache.get_token().await.unwrap(), "token-1");
        assert_eq!(source.calls(), 1);
        assert!(cache.cached().is_some());
    }

    #[tokio::test]
    async fn test_token_inside_margin_is_refreshed() {
        // 60 秒后过期，落在 5 分钟刷新窗口内
        let source = Arc::new(CountingSource::new(Duration::ZERO, 60));
        let cache = cache(source.clone());

        assert_eq!(cache.get_token().await.unwrap(), "token-1");
        assert_eq!(cache.get_token().await.unwrap(), "token-2");
        assert_eq!(source.calls(), 2);
    }

    #[tokio::test]
    async fn test_failure_does_not_poison_cache() {
        let mut source = CountingSource::new(Duration::ZERO, 3600);
        source.fail_first = 1;
        let source = Arc::new(source);
        let cache = cache(source.clone());

        let err = cache.get_token().await.unwrap_err();
        assert!(matches!(err, PushError::TokenFetch { vendor: PushVendor::Huawei, .. }));
        assert!(cache.cached().is_none());

        assert_eq!(cache.get_token().await.unwrap(), "token-2");
        assert_eq!(source.calls(), 2);
    }

    #[tokio::test]
    async fn test_waiting_caller_can_be_cancelled() {
        let source = Arc::new(CountingSource::new(Duration::from_millis(200), 3600));
        let cache = Arc::new(cache(source.clone()));

        let refresher = {
            let cache = cache.clone();
            tokio::spawn(async move { cache.get_token().await })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;

        let waited = tokio::time::timeout(Duration::from_millis(50), cache.get_token()).await;
        assert!(waited.is_err());

        assert_eq!(refresher.await.unwrap().unwrap(), "token-1");
        assert_eq!(cache.get_token().await.unwrap(), "token-1");
        assert_eq!(source.calls(), 1);
    }

    #[test]
    fn test_needs_refresh() {
        let now = Utc::now();
        let token = AccessToken::new("t", now + chrono::Duration::minutes(10));
        assert!(!token.needs_refresh(now, REFRESH_MARGIN));
        assert!(token.needs_refresh(now + chrono::Duration::minutes(6), REFRESH_MARGIN));
    }
}
