use std::sync::Arc;

use application::{
    InMemoryMessageRepository, InMemoryParticipantRepository, MessageRepository,
    ParticipantRepository,
};
use config::{DatabaseConfig, StoreBackend};
use thiserror::Error;

use crate::{
    migrations::MIGRATOR,
    repository::{create_pg_pool, PgMessageRepository, PgParticipantRepository},
};

#[derive(Debug, Error)]
pub enum InfrastructureError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

/// 按配置装配好的存储
#[derive(Clone)]
pub struct Infrastructure {
    pub participants: Arc<dyn ParticipantRepository>,
    pub messages: Arc<dyn MessageRepository>,
}

impl Infrastructure {
    pub fn in_memory() -> Self {
        Self {
            participants: Arc::new(InMemoryParticipantRepository::new()),
            messages: Arc::new(InMemoryMessageRepository::new()),
        }
    }

    pub async fn connect(config: &DatabaseConfig) -> Result<Self, InfrastructureError> {
        match config.backend {
            StoreBackend::Memory => {
                tracing::warn!("使用内存存储，重启后数据丢失");
                Ok(Self::in_memory())
            }
            StoreBackend::Postgres => {
                let pool = create_pg_pool(&config.url, config.max_connections).await?;
                MIGRATOR.run(&pool).await?;

                Ok(Self {
                    participants: Arc::new(PgParticipantRepository::new(pool.clone())),
                    messages: Arc::new(PgMessageRepository::new(pool)),
                })
            }
        }
    }
}
