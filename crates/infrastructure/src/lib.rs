//! 基础设施层实现。
//!
//! 提供 PostgreSQL 存储适配器，并根据配置选择内存或数据库存储。

pub mod builder;
pub mod migrations;
pub mod repository;

pub use builder::{Infrastructure, InfrastructureError};
pub use migrations::MIGRATOR;
pub use repository::{create_pg_pool, PgMessageRepository, PgParticipantRepository};
