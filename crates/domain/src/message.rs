use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::errors::DomainError;
use crate::value_objects::{
    MessageText, ParticipantName, Timestamp, BROADCAST_RECIPIENT, JOIN_TEXT, LEAVE_TEXT,
};

/// 消息类型。`Status` 只能由系统生成。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageKind {
    Message,
    PrivateMessage,
    Status,
}

impl MessageKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageKind::Message => "message",
            MessageKind::PrivateMessage => "private_message",
            MessageKind::Status => "status",
        }
    }

    /// 解析客户端提交的消息类型，拒绝 `status`。
    pub fn parse_user_kind(value: &str) -> Result<Self, DomainError> {
        match value.parse::<MessageKind>()? {
            MessageKind::Status => Err(DomainError::invalid_argument(
                "type",
                "must be one of message, private_message",
            )),
            kind => Ok(kind),
        }
    }
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MessageKind {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "message" => Ok(MessageKind::Message),
            "private_message" => Ok(MessageKind::PrivateMessage),
            "status" => Ok(MessageKind::Status),
            "" => Err(DomainError::invalid_argument("type", "cannot be empty")),
            other => Err(DomainError::invalid_argument(
                "type",
                format!("unknown message type '{other}'"),
            )),
        }
    }
}

/// 系统生成状态消息的事件。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PresenceEvent {
    Joined,
    Left,
}

impl PresenceEvent {
    pub fn text(&self) -> &'static str {
        match self {
            PresenceEvent::Joined => JOIN_TEXT,
            PresenceEvent::Left => LEAVE_TEXT,
        }
    }
}

/// 聊天消息，创建后不可变。
///
/// `from` / `to` 按值引用参与者名称，不做外键约束：
/// 被移出房间的参与者留下的消息仍然保留。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub from: String,
    pub to: String,
    pub text: MessageText,
    pub kind: MessageKind,
    pub created_at: Timestamp,
}

impl Message {
    pub fn new(
        from: impl Into<String>,
        to: impl Into<String>,
        text: MessageText,
        kind: MessageKind,
        created_at: Timestamp,
    ) -> Result<Self, DomainError> {
        let to = to.into();
        if to.trim().is_empty() {
            return Err(DomainError::invalid_argument("to", "cannot be empty"));
        }
        Ok(Self {
            from: from.into(),
            to,
            text,
            kind,
            created_at,
        })
    }

    /// 构造加入 / 离开房间的广播状态消息。
    pub fn presence(name: &ParticipantName, event: PresenceEvent, at: Timestamp) -> Self {
        Self {
            from: name.as_str().to_owned(),
            to: BROADCAST_RECIPIENT.to_owned(),
            text: MessageText::system(event.text()),
            kind: MessageKind::Status,
            created_at: at,
        }
    }

    pub fn is_broadcast(&self) -> bool {
        self.to == BROADCAST_RECIPIENT
    }

    /// 广播消息、发给 `viewer` 的消息、以及 `viewer` 自己发出的消息可见。
    pub fn is_visible_to(&self, viewer: &str) -> bool {
        self.is_broadcast() || self.to == viewer || self.from == viewer
    }

    /// 展示用的时间，格式 `HH:MM:SS`（UTC）。
    pub fn display_time(&self) -> String {
        self.created_at.format("%H:%M:%S").to_string()
    }
}
