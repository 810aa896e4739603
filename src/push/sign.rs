//! 厂商鉴权签名
//!
//! 签名串为若干字段与毫秒时间戳的直接拼接，摘要结果取小写 hex。
//! 每次换取 token 时现算，不缓存。

use sha2::{Digest, Sha256};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignAlgorithm {
    Sha256,
    Md5,
}

impl SignAlgorithm {
    pub fn digest_hex(&self, input: &str) -> String {
        match self {
            SignAlgorithm::Sha256 => hex::encode(Sha256::digest(input.as_bytes())),
            SignAlgorithm::Md5 => format!("{:x}", md5::compute(input.as_bytes())),
        }
    }
}

/// GETUI / OPPO：sha256(appKey + timestamp + masterSecret)
pub fn sign_app_key(app_key: &str, timestamp_ms: i64, master_secret: &str) -> String {
    SignAlgorithm::Sha256.digest_hex(&format!("{}{}{}", app_key, timestamp_ms, master_secret))
}

/// VIVO：md5(appId + appKey + timestamp + appSecret)
pub fn sign_app_id_key(app_id: &str, app_key: &str, timestamp_ms: i64, app_secret: &str) -> String {
    SignAlgorithm::Md5.digest_hex(&format!("{}{}{}{}", app_id, app_key, timestamp_ms, app_secret))
}

/// 当前毫秒时间戳
pub fn timestamp_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
