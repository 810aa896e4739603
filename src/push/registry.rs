//! 推送客户端注册表
//!
//! 启动时按配置创建各厂商客户端，运行期只读，按设备标签查找。

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tracing::info;

use crate::config::PusherConfig;
use crate::error::Result;
use crate::push::error::{PushError, PushResult};
use crate::push::provider::{
    build_http_client, GetuiTransport, HuaweiTransport, OppoTransport, PushProvider, VendorClient,
    VivoTransport, XiaomiTransport,
};
use crate::push::types::{PushTag, PushVendor};

#[derive(Default)]
pub struct ProviderRegistry {
    providers: HashMap<PushVendor, Arc<dyn PushProvider>>,
    /// `PushTag::Default` 对应的厂商
    default_vendor: Option<PushVendor>,
}

impl ProviderRegistry {
    pub fn new(default_vendor: Option<PushVendor>) -> Self {
        Self {
            providers: HashMap::new(),
            default_vendor,
        }
    }

    /// 为每个已配置的厂商创建客户端，所有客户端共用一个 HTTP 连接池
    pub fn from_config(config: &PusherConfig, timeout: Duration) -> Result<Self> {
        let http = build_http_client(timeout)?;
        let mut registry = Self::new(config.default_vendor);

        if let Some(c) = &config.getui {
            let transport = Arc::new(GetuiTransport::new(c, http.clone())?);
            registry.register(Arc::new(VendorClient::authenticated(transport)));
        }
        if let Some(c) = &config.huawei {
            let transport = Arc::new(HuaweiTransport::new(c, http.clone())?);
            registry.register(Arc::new(VendorClient::authenticated(transport)));
        }
        if let Some(c) = &config.oppo {
            let transport = Arc::new(OppoTransport::new(c, http.clone())?);
            registry.register(Arc::new(VendorClient::authenticated(transport)));
        }
        if let Some(c) = &config.xiaomi {
            let transport = Arc::new(XiaomiTransport::new(c, http.clone())?);
            registry.register(Arc::new(VendorClient::unauthenticated(transport)));
        }
        if let Some(c) = &config.vivo {
            let transport = Arc::new(VivoTransport::new(c, http.clone())?);
            registry.register(Arc::new(VendorClient::authenticated(transport)));
        }

        info!(
            "[REGISTRY] Push clients ready: {:?}, default_vendor={:?}",
            registry.vendors(),
            registry.default_vendor
        );
        Ok(registry)
    }

    /// 注册客户端，同一厂商重复注册时后者覆盖前者
    pub fn register(&mut self, provider: Arc<dyn PushProvider>) {
        self.providers.insert(provider.vendor(), provider);
    }

    pub fn with_provider(mut self, provider: Arc<dyn PushProvider>) -> Self {
        self.register(provider);
        self
    }

    /// 按设备标签查找客户端
    pub fn get_client(&self, tag: &PushTag) -> PushResult<Arc<dyn PushProvider>> {
        let vendor = match tag {
            PushTag::Vendor(vendor) => Some(*vendor),
            PushTag::Default => self.default_vendor,
            PushTag::Unrecognized(_) => None,
        };
        vendor
            .and_then(|v| self.providers.get(&v))
            .cloned()
            .ok_or_else(|| PushError::ProviderNotFound(tag.to_string()))
    }

    /// 已注册的厂商，按固定顺序
    pub fn vendors(&self) -> Vec<PushVendor> {
        PushVendor::ALL
            .into_iter()
            .filter(|v| self.providers.contains_key(v))
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}
