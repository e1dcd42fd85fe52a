//! 应用层实现。
//!
//! 这里提供围绕领域模型的用例服务：参与者注册表、消息日志、
//! 以及后台的在线状态清理任务。存储和时钟通过 trait 注入。

pub mod clock;
pub mod dto;
pub mod error;
pub mod locks;
pub mod memory;
pub mod repository;
pub mod services;
pub mod sweeper;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::UnregisteredSenderPolicy;
pub use dto::{MessageDto, ParticipantDto};
pub use error::ApplicationError;
pub use locks::NameLocks;
pub use memory::{InMemoryMessageRepository, InMemoryParticipantRepository};
pub use repository::{MessageRepository, ParticipantRepository};
pub use services::{
    ListMessagesQuery, MessageService, MessageServiceDependencies, ParticipantService,
    ParticipantServiceDependencies, SendMessageRequest,
};
pub use sweeper::{PresenceSweeper, SweepFailure, SweepReport, SweeperSettings};
