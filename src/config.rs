use std::env;
use std::fs;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use crate::push::types::PushVendor;

/// 请求体大小上限（5 MiB）
pub const DEFAULT_MAX_BODY_BYTES: usize = 5 * 1024 * 1024;

/// 配置校验错误，启动阶段直接退出
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{section}.{field} is required")]
    MissingField {
        section: &'static str,
        field: &'static str,
    },

    #[error("{section}.{field} is invalid: {reason}")]
    InvalidField {
        section: &'static str,
        field: &'static str,
        reason: String,
    },
}

fn require(section: &'static str, field: &'static str, value: &str) -> Result<(), ConfigError> {
    if value.trim().is_empty() {
        return Err(ConfigError::MissingField { section, field });
    }
    Ok(())
}

/// 网关配置
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    pub server: HttpConfig,
    pub logging: LoggingConfig,
    pub render: RenderConfig,
    pub pusher: PusherConfig,
}

/// HTTP 服务配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    /// 监听地址
    pub host: String,
    /// 监听端口
    pub port: u16,
    /// 请求体上限（字节）
    pub max_body_bytes: usize,
    /// 单次厂商 HTTP 调用超时（秒）
    pub vendor_timeout_secs: u64,
    /// 是否暴露 /metrics
    pub enable_metrics: bool,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 80,
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
            vendor_timeout_secs: 10,
            enable_metrics: true,
        }
    }
}

impl HttpConfig {
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn vendor_timeout(&self) -> Duration {
        Duration::from_secs(self.vendor_timeout_secs)
    }
}

/// `[logging]` 段
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: Option<String>,
    pub format: Option<String>,
    pub file: Option<String>,
}

/// 通知渲染配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    pub default_title: String,
    pub default_content: String,
    pub image_content: String,
    pub file_content: String,
    pub truncation: TruncationPolicy,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            default_title: String::new(),
            default_content: String::new(),
            image_content: "[image]".to_string(),
            file_content: "[file]".to_string(),
            truncation: TruncationPolicy::default(),
        }
    }
}

impl RenderConfig {
    pub fn validate(&mut self) -> Result<(), ConfigError> {
        require("render", "default_title", &self.default_title)?;
        require("render", "default_content", &self.default_content)?;
        if self.image_content.is_empty() {
            self.image_content = "[image]".to_string();
        }
        if self.file_content.is_empty() {
            self.file_content = "[file]".to_string();
        }
        self.truncation.validate()
    }
}

/// 正文截断策略
///
/// 默认值：预算 70，多字节码点权重 5，单字节权重 2，尾部不足 4 字节不截断。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TruncationPolicy {
    pub budget: usize,
    pub multibyte_weight: usize,
    pub single_byte_weight: usize,
    pub tail_threshold_bytes: usize,
}

impl Default for TruncationPolicy {
    fn default() -> Self {
        Self {
            budget: 70,
            multibyte_weight: 5,
            single_byte_weight: 2,
            tail_threshold_bytes: 4,
        }
    }
}

impl TruncationPolicy {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.budget == 0 {
            return Err(ConfigError::InvalidField {
                section: "render.truncation",
                field: "budget",
                reason: "must be greater than 0".to_string(),
            });
        }
        if self.multibyte_weight == 0 || self.single_byte_weight == 0 {
            return Err(ConfigError::InvalidField {
                section: "render.truncation",
                field: "weight",
                reason: "weights must be greater than 0".to_string(),
            });
        }
        Ok(())
    }
}

/// 厂商通道配置，未配置的厂商不会创建客户端
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PusherConfig {
    /// 无厂商前缀的设备使用的通道
    pub default_vendor: Option<PushVendor>,
    pub getui: Option<GetuiConfig>,
    pub huawei: Option<HuaweiConfig>,
    pub oppo: Option<OppoConfig>,
    pub xiaomi: Option<XiaomiConfig>,
    pub vivo: Option<VivoConfig>,
}

impl PusherConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(c) = &self.getui {
            c.validate()?;
        }
        if let Some(c) = &self.huawei {
            c.validate()?;
        }
        if let Some(c) = &self.oppo {
            c.validate()?;
        }
        if let Some(c) = &self.xiaomi {
            c.validate()?;
        }
        if let Some(c) = &self.vivo {
            c.validate()?;
        }
        if let Some(vendor) = self.default_vendor {
            if !self.is_configured(vendor) {
                return Err(ConfigError::InvalidField {
                    section: "pusher",
                    field: "default_vendor",
                    reason: format!("vendor {} is not configured", vendor),
                });
            }
        }
        Ok(())
    }

    pub fn is_configured(&self, vendor: PushVendor) -> bool {
        match vendor {
            PushVendor::Getui => self.getui.is_some(),
            PushVendor::Huawei => self.huawei.is_some(),
            PushVendor::Oppo => self.oppo.is_some(),
            PushVendor::Xiaomi => self.xiaomi.is_some(),
            PushVendor::Vivo => self.vivo.is_some(),
        }
    }

    pub fn configured_vendors(&self) -> Vec<PushVendor> {
        PushVendor::ALL
            .into_iter()
            .filter(|v| self.is_configured(*v))
            .collect()
    }
}

/// GETUI：https://docs.getui.com/getui/server/rest_v2/token/
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GetuiConfig {
    pub app_id: String,
    pub app_key: String,
    pub master_secret: String,
    /// 覆盖默认接口地址
    pub endpoint: Option<String>,
}

impl GetuiConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        require("pusher.getui", "app_id", &self.app_id)?;
        require("pusher.getui", "app_key", &self.app_key)?;
        require("pusher.getui", "master_secret", &self.master_secret)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct HuaweiConfig {
    pub client_id: String,
    pub client_secret: String,
    /// 1 表示测试消息，0 表示正式消息
    pub target_user_type: i32,
    pub endpoint: Option<String>,
    pub token_endpoint: Option<String>,
}

impl HuaweiConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        require("pusher.huawei", "client_id", &self.client_id)?;
        require("pusher.huawei", "client_secret", &self.client_secret)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct OppoConfig {
    pub app_key: String,
    pub master_secret: String,
    /// Android 9 起通知必须指定的通道 ID
    pub channel_id: String,
    pub endpoint: Option<String>,
}

impl OppoConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        require("pusher.oppo", "app_key", &self.app_key)?;
        require("pusher.oppo", "master_secret", &self.master_secret)?;
        require("pusher.oppo", "channel_id", &self.channel_id)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct XiaomiConfig {
    pub app_pkg_name: String,
    pub app_secret: String,
    pub channel_id: String,
    pub endpoint: Option<String>,
}

impl XiaomiConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        require("pusher.xiaomi", "app_pkg_name", &self.app_pkg_name)?;
        require("pusher.xiaomi", "app_secret", &self.app_secret)?;
        require("pusher.xiaomi", "channel_id", &self.channel_id)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct VivoConfig {
    /// 数字形式的应用 ID
    pub app_id: String,
    pub app_key: String,
    pub app_secret: String,
    pub endpoint: Option<String>,
}

impl VivoConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        require("pusher.vivo", "app_id", &self.app_id)?;
        require("pusher.vivo", "app_key", &self.app_key)?;
        require("pusher.vivo", "app_secret", &self.app_secret)?;
        self.numeric_app_id().map(|_| ())
    }

    pub fn numeric_app_id(&self) -> Result<i64, ConfigError> {
        self.app_id
            .trim()
            .parse::<i64>()
            .map_err(|e| ConfigError::InvalidField {
                section: "pusher.vivo",
                field: "app_id",
                reason: e.to_string(),
            })
    }
}

impl GatewayConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// 从 TOML 文件加载配置（不做校验）
    pub fn from_toml_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())
            .with_context(|| format!("无法读取配置文件: {:?}", path.as_ref()))?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).with_context(|| "配置文件格式错误")
    }

    /// 从环境变量合并（PUSH_GATEWAY_ 前缀）
    pub fn merge_from_env(&mut self) {
        if let Ok(host) = env::var("PUSH_GATEWAY_HOST") {
            self.server.host = host;
        }
        if let Ok(port) = env::var("PUSH_GATEWAY_PORT") {
            match port.parse() {
                Ok(port) => self.server.port = port,
                Err(_) => warn!("忽略无效的 PUSH_GATEWAY_PORT: {}", port),
            }
        }
        if let Ok(timeout) = env::var("PUSH_GATEWAY_VENDOR_TIMEOUT_SECS") {
            match timeout.parse() {
                Ok(secs) => self.server.vendor_timeout_secs = secs,
                Err(_) => warn!("忽略无效的 PUSH_GATEWAY_VENDOR_TIMEOUT_SECS: {}", timeout),
            }
        }
        if let Ok(level) = env::var("PUSH_GATEWAY_LOG_LEVEL") {
            self.logging.level = Some(level);
        }
        if let Ok(format) = env::var("PUSH_GATEWAY_LOG_FORMAT") {
            self.logging.format = Some(format);
        }
        if let Ok(title) = env::var("PUSH_GATEWAY_DEFAULT_TITLE") {
            self.render.default_title = title;
        }
        if let Ok(content) = env::var("PUSH_GATEWAY_DEFAULT_CONTENT") {
            self.render.default_content = content;
        }
    }

    /// 从命令行参数合并（最高优先级）
    pub fn merge_from_cli(&mut self, cli: &crate::cli::Cli) {
        if let Some(host) = &cli.host {
            self.server.host = host.clone();
        }
        if let Some(port) = cli.port {
            self.server.port = port;
        }
        if let Some(level) = cli.get_log_level() {
            self.logging.level = Some(level);
        }
        if let Some(format) = cli.get_log_format() {
            self.logging.format = Some(format);
        }
        if let Some(file) = &cli.log_file {
            self.logging.file = Some(file.clone());
        }
        if cli.disable_metrics {
            self.server.enable_metrics = false;
        }
    }

    /// 加载配置（优先级：命令行 > 环境变量 > 配置文件 > 默认值）并校验
    pub fn load(cli: &crate::cli::Cli) -> Result<Self> {
        let mut config = if let Some(config_file) = &cli.config_file {
            info!("📄 从配置文件加载: {}", config_file);
            Self::from_toml_file(config_file)?
        } else if Path::new("config.toml").exists() {
            info!("📄 从默认配置文件加载: config.toml");
            Self::from_toml_file("config.toml")?
        } else {
            warn!("⚠️ 未找到配置文件，使用默认配置");
            Self::new()
        };

        config.merge_from_env();
        config.merge_from_cli(cli);
        config.validate().context("配置校验失败")?;

        Ok(config)
    }

    /// 校验必填字段，并补齐可选字段的默认值
    pub fn validate(&mut self) -> Result<(), ConfigError> {
        if self.server.max_body_bytes == 0 {
            return Err(ConfigError::InvalidField {
                section: "server",
                field: "max_body_bytes",
                reason: "must be greater than 0".to_string(),
            });
        }
        if self.server.vendor_timeout_secs == 0 {
            return Err(ConfigError::InvalidField {
                section: "server",
                field: "vendor_timeout_secs",
                reason: "must be greater than 0".to_string(),
            });
        }
        self.render.validate()?;
        self.pusher.validate()
    }

    /// 用于展示的副本，厂商密钥已打码
    pub fn redacted(&self) -> Self {
        let mut config = self.clone();
        let pusher = &mut config.pusher;
        if let Some(c) = &mut pusher.getui {
            mask_secret(&mut c.master_secret);
        }
        if let Some(c) = &mut pusher.huawei {
            mask_secret(&mut c.client_secret);
        }
        if let Some(c) = &mut pusher.oppo {
            mask_secret(&mut c.master_secret);
        }
        if let Some(c) = &mut pusher.xiaomi {
            mask_secret(&mut c.app_secret);
        }
        if let Some(c) = &mut pusher.vivo {
            mask_secret(&mut c.app_secret);
        }
        config
    }
}

const SECRET_MASK: &str = "******";

fn mask_secret(secret: &mut String) {
    if !secret.is_empty() {
        *secret = SECRET_MASK.to_string();
    }
}

/// 早期日志配置（在完整配置加载前初始化日志用）
#[derive(Debug, Default)]
pub struct EarlyLoggingConfig {
    pub level: Option<String>,
    pub format: Option<String>,
    pub file: Option<String>,
}

/// 快速读取配置文件的 [logging] 段，读取失败时返回空配置
pub fn load_early_logging_config(config_file: Option<&str>) -> EarlyLoggingConfig {
    #[derive(Deserialize, Default)]
    #[serde(default)]
    struct Partial {
        logging: LoggingConfig,
    }

    let path = config_file.unwrap_or("config.toml");
    let Ok(content) = fs::read_to_string(path) else {
        return EarlyLoggingConfig::default();
    };
    let partial: Partial = toml::from_str(&content).unwrap_or_default();
    EarlyLoggingConfig {
        level: partial.logging.level,
        format: partial.logging.format,
        file: partial.logging.file,
    }
}

/// `generate-config` 子命令输出的默认配置
pub const DEFAULT_CONFIG_TOML: &str = r#"# push-gateway 配置文件
# 此文件由 push-gateway generate-config 生成

[server]
host = "0.0.0.0"
port = 80
max_body_bytes = 5242880
vendor_timeout_secs = 10
enable_metrics = true

[logging]
level = "info"
format = "compact"
# file = "./logs/push-gateway.log"

[render]
default_title = "新消息"
default_content = "您收到一条新消息"
image_content = "[图片]"
file_content = "[文件]"

[render.truncation]
budget = 70
multibyte_weight = 5
single_byte_weight = 2
tail_threshold_bytes = 4

[pusher]
# 无 android_ 前缀的设备使用的厂商通道
# default_vendor = "getui"

# [pusher.getui]
# app_id = ""
# app_key = ""
# master_secret = ""

# [pusher.huawei]
# client_id = ""
# client_secret = ""
# target_user_type = 0

# [pusher.oppo]
# app_key = ""
# master_secret = ""
# channel_id = ""

# [pusher.xiaomi]
# app_pkg_name = ""
# app_secret = ""
# channel_id = ""

# [pusher.vivo]
# app_id = "10000"
# app_key = ""
# app_secret = ""
"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_template_is_valid() {
        let mut config = GatewayConfig::from_toml_str(DEFAULT_CONFIG_TOML).unwrap();
        config.validate().unwrap();
        assert_eq!(config.server.max_body_bytes, DEFAULT_MAX_BODY_BYTES);
        assert_eq!(config.render.truncation, TruncationPolicy::default());
        assert!(config.pusher.configured_vendors().is_empty());
    }

    #[test]
    fn test_missing_render_defaults() {
        let mut config = GatewayConfig::new();
        let err = config.validate().unwrap_err();
        assert_eq!(
            err,
            ConfigError::MissingField {
                section: "render",
                field: "default_title"
            }
        );
        assert_eq!(err.to_string(), "render.default_title is required");
    }

    #[test]
    fn test_placeholders_default_when_empty() {
        let mut config = GatewayConfig::from_toml_str(
            r#"
            [render]
            default_title = "t"
            default_content = "c"
            image_content = ""
            "#,
        )
        .unwrap();
        config.validate().unwrap();
        assert_eq!(config.render.image_content, "[image]");
        assert_eq!(config.render.file_content, "[file]");
    }

    #[test]
    fn test_vendor_sections() {
        let mut config = GatewayConfig::from_toml_str(
            r#"
            [render]
            default_title = "t"
            default_content = "c"

            [pusher]
            default_vendor = "huawei"

            [pusher.huawei]
            client_id = "108"
            client_secret = "secret"

            [pusher.vivo]
            app_id = "10086"
            app_key = "key"
            app_secret = "secret"
            "#,
        )
        .unwrap();
        config.validate().unwrap();
        assert_eq!(
            config.pusher.configured_vendors(),
            vec![PushVendor::Huawei, PushVendor::Vivo]
        );
        assert_eq!(config.pusher.vivo.unwrap().numeric_app_id().unwrap(), 10086);
    }

    #[test]
    fn test_missing_vendor_field_is_named() {
        let mut config = GatewayConfig::from_toml_str(
            r#"
            [render]
            default_title = "t"
            default_content = "c"

            [pusher.oppo]
            app_key = "key"
            master_secret = "secret"
            "#,
        )
        .unwrap();
        let err = config.validate().unwrap_err();
        assert_eq!(err.to_string(), "pusher.oppo.channel_id is required");
    }

    #[test]
    fn test_invalid_vivo_app_id() {
        let vivo = VivoConfig {
            app_id: "abc".to_string(),
            app_key: "k".to_string(),
            app_secret: "s".to_string(),
            endpoint: None,
        };
        assert!(matches!(
            vivo.validate(),
            Err(ConfigError::InvalidField { field: "app_id", .. })
        ));
    }

    #[test]
    fn test_default_vendor_must_be_configured() {
        let mut config = GatewayConfig::from_toml_str(
            r#"
            [render]
            default_title = "t"
            default_content = "c"

            [pusher]
            default_vendor = "xiaomi"
            "#,
        )
        .unwrap();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidField { field: "default_vendor", .. })
        ));
    }

    #[test]
    fn test_redacted_masks_vendor_secrets() {
        let config = GatewayConfig::from_toml_str(
            r#"
            [pusher.getui]
            app_id = "id"
            app_key = "key"
            master_secret = "getui-secret"

            [pusher.huawei]
            client_id = "108"
            client_secret = "huawei-secret"

            [pusher.xiaomi]
            app_pkg_name = "im.example"
            app_secret = "xiaomi-secret"
            channel_id = "c"
            "#,
        )
        .unwrap();

        let redacted = config.redacted();
        let shown = serde_json::to_string(&redacted).unwrap();
        assert!(!shown.contains("getui-secret"));
        assert!(!shown.contains("huawei-secret"));
        assert!(!shown.contains("xiaomi-secret"));
        assert_eq!(redacted.pusher.getui.unwrap().app_key, "key");
        assert_eq!(redacted.pusher.huawei.unwrap().client_secret, SECRET_MASK);
        // 原配置不受影响
        assert_eq!(config.pusher.xiaomi.unwrap().app_secret, "xiaomi-secret");
    }

    #[test]
    fn test_early_logging_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[logging]\nlevel = \"debug\"\nformat = \"json\"\n").unwrap();

        let early = load_early_logging_config(path.to_str());
        assert_eq!(early.level.as_deref(), Some("debug"));
        assert_eq!(early.format.as_deref(), Some("json"));
        assert!(early.file.is_none());
    }
}
