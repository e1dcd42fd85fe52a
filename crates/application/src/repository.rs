//! 存储抽象：`participants` 与 `messages` 两个集合。

use async_trait::async_trait;
use domain::{Message, Participant, RepositoryError, Timestamp};

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ParticipantRepository: Send + Sync {
    /// 插入参与者；同名记录已存在时返回 `RepositoryError::Conflict`
    async fn insert(&self, participant: Participant) -> Result<Participant, RepositoryError>;

    async fn find_all(&self) -> Result<Vec<Participant>, RepositoryError>;

    async fn find_by_name(&self, name: &str) -> Result<Option<Participant>, RepositoryError>;

    /// 刷新 `last_seen`，只允许时间前进。返回是否命中记录。
    async fn touch(&self, name: &str, at: Timestamp) -> Result<bool, RepositoryError>;

    /// 删除参与者，返回是否确实删除了记录
    async fn delete_by_name(&self, name: &str) -> Result<bool, RepositoryError>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MessageRepository: Send + Sync {
    async fn insert(&self, message: Message) -> Result<Message, RepositoryError>;

    /// 按写入顺序返回全部消息
    async fn find_all(&self) -> Result<Vec<Message>, RepositoryError>;
}
