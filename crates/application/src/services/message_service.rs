//! 消息日志：发送消息与按可见性过滤的查询。

use std::sync::Arc;

use domain::{DomainError, Message, MessageKind, MessageText, ParticipantName, PresenceEvent};
use tracing::{debug, warn};

use crate::{
    clock::Clock,
    error::ApplicationError,
    repository::{MessageRepository, ParticipantRepository},
};
use config::UnregisteredSenderPolicy;

#[derive(Debug, Clone)]
pub struct SendMessageRequest {
    pub from: String,
    pub to: String,
    pub text: String,
    pub kind: String,
}

#[derive(Debug, Clone)]
pub struct ListMessagesQuery {
    pub viewer: String,
    /// 只返回最后 `limit` 条；`None` 返回全部
    pub limit: Option<usize>,
}

pub struct MessageServiceDependencies {
    pub message_repository: Arc<dyn MessageRepository>,
    pub participant_repository: Arc<dyn ParticipantRepository>,
    pub clock: Arc<dyn Clock>,
    pub unregistered_sender: UnregisteredSenderPolicy,
}

pub struct MessageService {
    deps: MessageServiceDependencies,
}

impl MessageService {
    pub fn new(deps: MessageServiceDependencies) -> Self {
        Self { deps }
    }

    pub async fn send(&self, request: SendMessageRequest) -> Result<Message, ApplicationError> {
        if request.to.trim().is_empty() {
            return Err(DomainError::invalid_argument("to", "cannot be empty").into());
        }
        let text = MessageText::new(request.text)?;
        let kind = MessageKind::parse_user_kind(&request.kind)?;

        let registered = self
            .deps
            .participant_repository
            .find_by_name(&request.from)
            .await?
            .is_some();
        if !registered {
            match self.deps.unregistered_sender {
                UnregisteredSenderPolicy::Reject => {
                    warn!(from = %request.from, to = %request.to, "拒绝未注册发送者的消息");
                    return Err(DomainError::SenderNotRegistered.into());
                }
                UnregisteredSenderPolicy::Log => {
                    warn!(from = %request.from, to = %request.to, "未注册发送者的消息，照常写入");
                }
            }
        }

        let message = Message::new(request.from, request.to, text, kind, self.deps.clock.now())?;
        let message = self.deps.message_repository.insert(message).await?;

        debug!(from = %message.from, to = %message.to, kind = %message.kind, "消息已写入");
        Ok(message)
    }

    /// 写入系统生成的加入 / 离开状态消息
    pub(crate) async fn record_presence(
        &self,
        name: &ParticipantName,
        event: PresenceEvent,
    ) -> Result<Message, ApplicationError> {
        let message = Message::presence(name, event, self.deps.clock.now());
        Ok(self.deps.message_repository.insert(message).await?)
    }

    /// 返回 `viewer` 可见的消息，按写入顺序；指定 `limit` 时取最后几条。
    pub async fn list(&self, query: ListMessagesQuery) -> Result<Vec<Message>, ApplicationError> {
        if query.limit == Some(0) {
            return Err(
                DomainError::invalid_argument("limit", "must be a positive integer").into(),
            );
        }

        let mut visible: Vec<Message> = self
            .deps
            .message_repository
            .find_all()
            .await?
            .into_iter()
            .filter(|message| message.is_visible_to(&query.viewer))
            .collect();

        if let Some(limit) = query.limit {
            let skip = visible.len().saturating_sub(limit);
            visible.drain(..skip);
        }

        Ok(visible)
    }
}
