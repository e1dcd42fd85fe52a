//! 参与者注册表：加入、心跳、列表与移除。

use std::{sync::Arc, time::Duration};

use domain::{DomainError, Participant, ParticipantName, PresenceEvent, RepositoryError};
use tracing::{debug, info, warn};

use crate::{
    clock::Clock, error::ApplicationError, locks::NameLocks, repository::ParticipantRepository,
    services::MessageService,
};

pub struct ParticipantServiceDependencies {
    pub participant_repository: Arc<dyn ParticipantRepository>,
    pub message_service: Arc<MessageService>,
    pub clock: Arc<dyn Clock>,
    pub locks: Arc<NameLocks>,
}

pub struct ParticipantService {
    deps: ParticipantServiceDependencies,
}

impl ParticipantService {
    pub fn new(deps: ParticipantServiceDependencies) -> Self {
        Self { deps }
    }

    /// 加入房间并广播加入消息。
    ///
    /// 参与者写入成功后状态消息写入失败时不回滚，错误照常返回。
    pub async fn join(&self, name: String) -> Result<Participant, ApplicationError> {
        let name = ParticipantName::parse(name)?;
        let guard = self.deps.locks.lock(name.as_str()).await;

        let existing = self.deps.participant_repository.find_all().await?;
        if existing.iter().any(|p| p.name == name) {
            return Err(DomainError::ParticipantAlreadyExists.into());
        }

        let participant = Participant::new(name, self.deps.clock.now());
        let participant = self
            .deps
            .participant_repository
            .insert(participant)
            .await
            .map_err(|err| match err {
                RepositoryError::Conflict => {
                    ApplicationError::from(DomainError::ParticipantAlreadyExists)
                }
                other => ApplicationError::from(other),
            })?;
        drop(guard);

        info!(name = %participant.name, "参与者加入房间");

        if let Err(err) = self
            .deps
            .message_service
            .record_presence(&participant.name, PresenceEvent::Joined)
            .await
        {
            warn!(name = %participant.name, error = %err, "加入消息写入失败，参与者已登记");
            return Err(err);
        }

        Ok(participant)
    }

    pub async fn heartbeat(&self, name: &str) -> Result<(), ApplicationError> {
        let _guard = self.deps.locks.lock(name).await;

        if self
            .deps
            .participant_repository
            .find_by_name(name)
            .await?
            .is_none()
        {
            return Err(DomainError::ParticipantNotFound.into());
        }

        let now = self.deps.clock.now();
        if !self.deps.participant_repository.touch(name, now).await? {
            return Err(DomainError::ParticipantNotFound.into());
        }

        debug!(name = %name, "心跳");
        Ok(())
    }

    pub async fn list(&self) -> Result<Vec<Participant>, ApplicationError> {
        Ok(self.deps.participant_repository.find_all().await?)
    }

    /// 移除参与者，重复调用无副作用
    pub async fn evict(&self, name: &str) -> Result<(), ApplicationError> {
        let _guard = self.deps.locks.lock(name).await;
        if self.deps.participant_repository.delete_by_name(name).await? {
            info!(name = %name, "参与者已移除");
        }
        Ok(())
    }

    /// 在名称锁内重新读取并确认仍然超时后才移除，避免误删刚刚心跳过的参与者。
    pub(crate) async fn evict_if_stale(
        &self,
        name: &ParticipantName,
        threshold: Duration,
    ) -> Result<bool, ApplicationError> {
        let _guard = self.deps.locks.lock(name.as_str()).await;

        let current = self
            .deps
            .participant_repository
            .find_by_name(name.as_str())
            .await?;
        let now = self.deps.clock.now();
        match current {
            Some(participant) if participant.is_stale(now, threshold) => Ok(self
                .deps
                .participant_repository
                .delete_by_name(name.as_str())
                .await?),
            _ => Ok(false),
        }
    }
}
