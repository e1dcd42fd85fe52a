//! 内存存储实现，用于测试和单机开发。

use async_trait::async_trait;
use domain::{Message, Participant, RepositoryError, Timestamp};
use tokio::sync::RwLock;

use crate::repository::{MessageRepository, ParticipantRepository};

/// 以写入顺序保存参与者，名称唯一。
#[derive(Debug, Default)]
pub struct InMemoryParticipantRepository {
    participants: RwLock<Vec<Participant>>,
}

impl InMemoryParticipantRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ParticipantRepository for InMemoryParticipantRepository {
    async fn insert(&self, participant: Participant) -> Result<Participant, RepositoryError> {
        let mut participants = self.participants.write().await;
        if participants.iter().any(|p| p.name == participant.name) {
            return Err(RepositoryError::Conflict);
        }
        participants.push(participant.clone());
        Ok(participant)
    }

    async fn find_all(&self) -> Result<Vec<Participant>, RepositoryError> {
        Ok(self.participants.read().await.clone())
    }

    async fn find_by_name(&self, name: &str) -> Result<Option<Participant>, RepositoryError> {
        let participants = self.participants.read().await;
        Ok(participants.iter().find(|p| p.name.as_str() == name).cloned())
    }

    async fn touch(&self, name: &str, at: Timestamp) -> Result<bool, RepositoryError> {
        let mut participants = self.participants.write().await;
        match participants.iter_mut().find(|p| p.name.as_str() == name) {
            Some(participant) => {
                participant.touch(at);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete_by_name(&self, name: &str) -> Result<bool, RepositoryError> {
        let mut participants = self.participants.write().await;
        let before = participants.len();
        participants.retain(|p| p.name.as_str() != name);
        Ok(participants.len() != before)
    }
}

/// 只追加的消息日志。
#[derive(Debug, Default)]
pub struct InMemoryMessageRepository {
    messages: RwLock<Vec<Message>>,
}

impl InMemoryMessageRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl MessageRepository for InMemoryMessageRepository {
    async fn insert(&self, message: Message) -> Result<Message, RepositoryError> {
        self.messages.write().await.push(message.clone());
        Ok(message)
    }

    async fn find_all(&self) -> Result<Vec<Message>, RepositoryError> {
        Ok(self.messages.read().await.clone())
    }
}
