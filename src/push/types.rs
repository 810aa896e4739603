use serde::{Deserialize, Serialize};
use std::fmt;

/// 安卓设备 app_id 的厂商通道前缀
pub const VENDOR_APP_ID_PREFIX: &str = "android_";

/// 推送平台
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum PushVendor {
    Getui,
    Huawei,
    Oppo,
    Xiaomi,
    Vivo,
}

impl PushVendor {
    pub const ALL: [PushVendor; 5] = [
        PushVendor::Getui,
        PushVendor::Huawei,
        PushVendor::Oppo,
        PushVendor::Xiaomi,
        PushVendor::Vivo,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PushVendor::Getui => "getui",
            PushVendor::Huawei => "huawei",
            PushVendor::Oppo => "oppo",
            PushVendor::Xiaomi => "xiaomi",
            PushVendor::Vivo => "vivo",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "getui" => Some(PushVendor::Getui),
            "huawei" => Some(PushVendor::Huawei),
            "oppo" => Some(PushVendor::Oppo),
            "xiaomi" => Some(PushVendor::Xiaomi),
            "vivo" => Some(PushVendor::Vivo),
            _ => None,
        }
    }
}

impl fmt::Display for PushVendor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 设备分组标签
///
/// 由设备 `app_id` 推导：`android_<vendor>` 得到厂商标签，
/// 无前缀的设备归入 `Default`，前缀后跟未知厂商名的保留原值以便记录日志。
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PushTag {
    Vendor(PushVendor),
    Default,
    Unrecognized(String),
}

impl PushTag {
    pub fn from_app_id(app_id: &str) -> Self {
        match app_id.strip_prefix(VENDOR_APP_ID_PREFIX) {
            Some(name) => match PushVendor::from_str(name) {
                Some(vendor) => PushTag::Vendor(vendor),
                None => PushTag::Unrecognized(name.to_string()),
            },
            None => PushTag::Default,
        }
    }
}

impl fmt::Display for PushTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PushTag::Vendor(vendor) => f.write_str(vendor.as_str()),
            PushTag::Default => f.write_str("default"),
            PushTag::Unrecognized(name) => f.write_str(name),
        }
    }
}

/// 厂商无关的推送消息
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub device_tokens: Vec<String>,
    pub payload: Payload,
}

/// 推送内容
///
/// `callback` / `callback_param` 目前没有厂商通道使用，不会出现在厂商请求中。
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payload {
    pub business_id: String,
    pub title: String,
    pub content: String,
    pub callback: Option<String>,
    pub callback_param: Option<String>,
}

impl Message {
    pub fn new(device_token: impl Into<String>, payload: Payload) -> Self {
        Self {
            device_tokens: vec![device_token.into()],
            payload,
        }
    }

    /// 多个 token 以逗号拼接（OPPO / XIAOMI / VIVO 的接收方字段格式）
    pub fn joined_tokens(&self) -> String {
        self.device_tokens.join(",")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tag_from_app_id() {
        assert_eq!(PushTag::from_app_id("android_huawei"), PushTag::Vendor(PushVendor::Huawei));
        assert_eq!(PushTag::from_app_id("android_XIAOMI"), PushTag::Vendor(PushVendor::Xiaomi));
        assert_eq!(PushTag::from_app_id("com.example.ios"), PushTag::Default);
        assert_eq!(PushTag::from_app_id(""), PushTag::Default);
        assert_eq!(
            PushTag::from_app_id("android_honor"),
            PushTag::Unrecognized("honor".to_string())
        );
    }

    #[test]
    fn test_tag_display() {
        assert_eq!(PushTag::Vendor(PushVendor::Vivo).to_string(), "vivo");
        assert_eq!(PushTag::Default.to_string(), "default");
        assert_eq!(PushTag::Unrecognized("meizu".into()).to_string(), "meizu");
    }

    #[test]
    fn test_joined_tokens() {
        let mut message = Message::new("a", Payload::default());
        message.device_tokens.push("b".to_string());
        assert_eq!(message.joined_tokens(), "a,b");
    }
}
