pub mod message_service;
pub mod participant_service;

pub use message_service::{
    ListMessagesQuery, MessageService, MessageServiceDependencies, SendMessageRequest,
};
pub use participant_service::{ParticipantService, ParticipantServiceDependencies};

#[cfg(test)]
mod tests;
