//! 推送网关入站事件模型
//!
//! 与 Matrix Push Gateway API 的 `/_matrix/push/v1/notify` 请求体对应，
//! 所有字段在线上都是可选的，缺失时取默认值。

use serde::{Deserialize, Deserializer, Serialize};

/// 请求体外层：`{ "notification": { ... } }`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct NotifyRequest {
    #[serde(deserialize_with = "null_as_default")]
    pub notification: Notification,
}

/// 一次消息事件
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Notification {
    #[serde(deserialize_with = "null_as_default")]
    pub content: Content,
    #[serde(deserialize_with = "null_as_default")]
    pub counts: Counts,
    #[serde(deserialize_with = "null_as_default")]
    pub devices: Vec<Device>,
    #[serde(deserialize_with = "null_as_default")]
    pub event_id: String,
    #[serde(deserialize_with = "null_as_default")]
    pub prio: String,
    #[serde(deserialize_with = "null_as_default")]
    pub room_alias: String,
    #[serde(deserialize_with = "null_as_default")]
    pub room_id: String,
    #[serde(deserialize_with = "null_as_default")]
    pub room_name: String,
    #[serde(deserialize_with = "null_as_default")]
    pub sender: String,
    #[serde(deserialize_with = "null_as_default")]
    pub sender_display_name: String,
    #[serde(rename = "type", deserialize_with = "null_as_default")]
    pub event_type: String,
}

/// 消息内容
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Content {
    #[serde(deserialize_with = "null_as_default")]
    pub body: String,
    #[serde(deserialize_with = "null_as_default")]
    pub msgtype: String,
    /// 编辑消息：修改后的内容
    #[serde(rename = "m.new_content", skip_serializing_if = "Option::is_none")]
    pub new_content: Option<Box<Content>>,
    /// 回复消息：被回复的事件
    #[serde(rename = "m.relates_to", skip_serializing_if = "Option::is_none")]
    pub relates_to: Option<RelatesTo>,

    // 成员事件
    #[serde(rename = "displayname", deserialize_with = "null_as_default")]
    pub display_name: String,
    #[serde(deserialize_with = "null_as_default")]
    pub membership: String,

    // 通话事件
    #[serde(deserialize_with = "null_as_default")]
    pub call_id: String,
    #[serde(deserialize_with = "null_as_default")]
    pub party_id: String,
    pub version: serde_json::Value,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RelatesTo {
    #[serde(deserialize_with = "null_as_default")]
    pub event_id: String,
    #[serde(deserialize_with = "null_as_default")]
    pub rel_type: String,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Counts {
    #[serde(deserialize_with = "null_as_default")]
    pub missed_calls: u64,
    #[serde(deserialize_with = "null_as_default")]
    pub unread: u64,
}

/// 接收推送的设备
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Device {
    /// 平台应用标识，安卓厂商通道形如 `android_huawei`
    #[serde(deserialize_with = "null_as_default")]
    pub app_id: String,
    pub data: serde_json::Value,
    /// 厂商注册 ID / 设备 token
    #[serde(deserialize_with = "null_as_default")]
    pub pushkey: String,
    #[serde(deserialize_with = "null_as_default")]
    pub pushkey_ts: i64,
    #[serde(deserialize_with = "null_as_default")]
    pub tweaks: Tweaks,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Tweaks {
    #[serde(deserialize_with = "null_as_default")]
    pub sound: String,
}

/// 消息类型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    Text,
    Image,
    File,
    Other,
}

/// 显式的 `null` 与缺失字段一样取默认值
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Option::unwrap_or_default)
}

impl Content {
    pub fn kind(&self) -> MessageKind {
        match self.msgtype.as_str() {
            "m.text" => MessageKind::Text,
            "m.image" => MessageKind::Image,
            "m.file" => MessageKind::File,
            _ => MessageKind::Other,
        }
    }

    pub fn is_reply(&self) -> bool {
        self.relates_to.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_request() {
        let raw = r#"{
            "notification": {
                "content": {
                    "body": "* hello",
                    "msgtype": "m.text",
                    "m.new_content": { "body": "hello", "msgtype": "m.text" },
                    "m.relates_to": { "event_id": "$abc", "rel_type": "m.replace" }
                },
                "counts": { "unread": 2, "missed_calls": 1 },
                "devices": [
                    {
                        "app_id": "android_huawei",
                        "pushkey": "token-1",
                        "pushkey_ts": 12345678,
                        "data": {},
                        "tweaks": { "sound": "bing" }
                    }
                ],
                "event_id": "$3957tyerfgewrf384",
                "prio": "high",
                "room_id": "!slw48wfj34rtnrf:example.com",
                "room_name": "Mission Control",
                "sender": "@exampleuser:matrix.org",
                "sender_display_name": "Major Tom",
                "type": "m.room.message",
                "unknown_field": true
            }
        }"#;

        let request: NotifyRequest = serde_json::from_str(raw).unwrap();
        let n = request.notification;
        assert_eq!(n.event_type, "m.room.message");
        assert_eq!(n.counts.unread, 2);
        assert_eq!(n.devices.len(), 1);
        assert_eq!(n.devices[0].app_id, "android_huawei");
        assert_eq!(n.devices[0].tweaks.sound, "bing");
        assert!(n.content.new_content.is_some());
        assert!(n.content.is_reply());
        assert_eq!(n.content.new_content.unwrap().body, "hello");
    }

    #[test]
    fn test_parse_minimal_request() {
        let request: NotifyRequest =
            serde_json::from_str(r#"{"notification":{"devices":[{"pushkey":"k"}]}}"#).unwrap();
        let n = request.notification;
        assert!(n.sender.is_empty());
        assert_eq!(n.content.kind(), MessageKind::Other);
        assert_eq!(n.devices[0].pushkey, "k");
    }

    #[test]
    fn test_null_fields_take_defaults() {
        let raw = r#"{
            "notification": {
                "sender": "@a:example.org",
                "room_name": null,
                "type": null,
                "content": { "body": null, "msgtype": "m.text", "m.relates_to": null },
                "counts": { "unread": null },
                "devices": [
                    { "app_id": "android_huawei", "pushkey": "k", "pushkey_ts": null, "tweaks": null }
                ]
            }
        }"#;

        let n = serde_json::from_str::<NotifyRequest>(raw).unwrap().notification;
        assert!(n.room_name.is_empty());
        assert!(n.event_type.is_empty());
        assert!(n.content.body.is_empty());
        assert!(!n.content.is_reply());
        assert_eq!(n.counts.unread, 0);
        assert_eq!(n.devices[0].pushkey_ts, 0);
        assert!(n.devices[0].tweaks.sound.is_empty());

        let n = serde_json::from_str::<NotifyRequest>(r#"{"notification":{"devices":null}}"#)
            .unwrap()
            .notification;
        assert!(n.devices.is_empty());
    }

    #[test]
    fn test_missing_notification_key() {
        let request: NotifyRequest = serde_json::from_str("{}").unwrap();
        assert!(request.notification.devices.is_empty());

        let request: NotifyRequest = serde_json::from_str(r#"{"notification":null}"#).unwrap();
        assert!(request.notification.sender.is_empty());
    }

    #[test]
    fn test_message_kind() {
        let mut content = Content::default();
        content.msgtype = "m.image".to_string();
        assert_eq!(content.kind(), MessageKind::Image);
        content.msgtype = "m.file".to_string();
        assert_eq!(content.kind(), MessageKind::File);
        content.msgtype = "m.call.invite".to_string();
        assert_eq!(content.kind(), MessageKind::Other);
    }
}
