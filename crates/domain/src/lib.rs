//! 聊天室在线状态与消息核心领域模型
//!
//! 包含参与者、消息两个实体，以及相关的值对象和错误定义。

pub mod errors;
pub mod message;
pub mod participant;
pub mod value_objects;

// 重新导出常用类型
pub use errors::*;
pub use message::*;
pub use participant::*;
pub use value_objects::*;
