//! 通知内容渲染
//!
//! 把入站事件转成厂商无关的标题和正文，纯函数，无副作用。

use crate::config::{RenderConfig, TruncationPolicy};
use crate::model::notification::{Content, MessageKind, Notification};

/// 截断后缀
pub const ELLIPSIS: &str = "...";

/// 回复消息中引用内容与正文之间的分隔
const REPLY_SEPARATOR: &str = "\n\n";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedNotice {
    pub title: String,
    pub content: String,
}

/// 渲染标题与正文，二者保证非空
pub fn render(notification: &Notification, config: &RenderConfig) -> RenderedNotice {
    let title = [&notification.room_name, &notification.sender_display_name]
        .into_iter()
        .find(|s| !s.is_empty())
        .cloned()
        .unwrap_or_else(|| config.default_title.clone());

    let content = match notification.content.kind() {
        MessageKind::Text => truncate_weighted(text_body(&notification.content), &config.truncation),
        MessageKind::Image => config.image_content.clone(),
        MessageKind::File => config.file_content.clone(),
        // 通话、成员变更等事件
        MessageKind::Other => config.default_content.clone(),
    };

    let content = if content.is_empty() {
        config.default_content.clone()
    } else {
        content
    };

    RenderedNotice { title, content }
}

/// 文本消息中用于推送的部分
///
/// 编辑消息取修改后的内容；回复消息取第一个空行之后的内容。
/// 编辑与回复可以叠加（修改一条回复），此时以编辑为准。
fn text_body(content: &Content) -> &str {
    if let Some(new_content) = &content.new_content {
        return &new_content.body;
    }
    if content.is_reply() {
        if let Some((_, reply)) = content.body.split_once(REPLY_SEPARATOR) {
            return reply;
        }
    }
    &content.body
}

/// 按权重截断文本
///
/// 逐个码点累加权重：前一个码点为多字节时记 `multibyte_weight`，否则记
/// `single_byte_weight`，用来近似中日韩文字比拉丁字母更宽。累计超过 `budget`
/// 时在当前码点之前截断并追加省略号；若剩余部分不足 `tail_threshold_bytes`
/// 字节则保留全文，不加省略号。
pub fn truncate_weighted(text: &str, policy: &TruncationPolicy) -> String {
    let mut weight = 0usize;
    let mut prev = 0usize;

    for (idx, _) in text.char_indices() {
        weight += if idx - prev > 1 {
            policy.multibyte_weight
        } else {
            policy.single_byte_weight
        };
        prev = idx;

        if weight > policy.budget {
            if text.len() - idx < policy.tail_threshold_bytes {
                return text.to_string();
            }
            return format!("{}{}", &text[..idx], ELLIPSIS);
        }
    }

    text.to_string()
}
