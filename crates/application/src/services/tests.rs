//! 参与者注册表与消息日志的单元测试

use std::sync::Arc;

use chrono::{TimeZone, Utc};
use domain::{
    DomainError, MessageKind, RepositoryError, Timestamp, BROADCAST_RECIPIENT, JOIN_TEXT,
};

use crate::{
    clock::ManualClock,
    error::ApplicationError,
    locks::NameLocks,
    memory::{InMemoryMessageRepository, InMemoryParticipantRepository},
    repository::{MessageRepository, MockMessageRepository, ParticipantRepository},
    services::*,
};
use config::UnregisteredSenderPolicy;

struct Harness {
    participants: Arc<ParticipantService>,
    messages: Arc<MessageService>,
    participant_repository: Arc<InMemoryParticipantRepository>,
    message_repository: Arc<InMemoryMessageRepository>,
    clock: Arc<ManualClock>,
}

fn start() -> Timestamp {
    Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
}

fn harness(policy: UnregisteredSenderPolicy) -> Harness {
    let participant_repository = Arc::new(InMemoryParticipantRepository::new());
    let message_repository = Arc::new(InMemoryMessageRepository::new());
    let clock = Arc::new(ManualClock::new(start()));

    let messages = Arc::new(MessageService::new(MessageServiceDependencies {
        message_repository: message_repository.clone(),
        participant_repository: participant_repository.clone(),
        clock: clock.clone(),
        unregistered_sender: policy,
    }));
    let participants = Arc::new(ParticipantService::new(ParticipantServiceDependencies {
        participant_repository: participant_repository.clone(),
        message_service: messages.clone(),
        clock: clock.clone(),
        locks: Arc::new(NameLocks::new()),
    }));

    Harness {
        participants,
        messages,
        participant_repository,
        message_repository,
        clock,
    }
}

fn send(from: &str, to: &str, text: &str, kind: &str) -> SendMessageRequest {
    SendMessageRequest {
        from: from.into(),
        to: to.into(),
        text: text.into(),
        kind: kind.into(),
    }
}

fn list(viewer: &str, limit: Option<usize>) -> ListMessagesQuery {
    ListMessagesQuery {
        viewer: viewer.into(),
        limit,
    }
}

#[tokio::test]
async fn join_registers_participant_and_broadcasts_status() {
    let h = harness(UnregisteredSenderPolicy::Reject);

    let alice = h.participants.join("Alice".into()).await.unwrap();
    assert_eq!(alice.last_seen, start());

    let names: Vec<String> = h
        .participants
        .list()
        .await
        .unwrap()
        .into_iter()
        .map(|p| p.name.to_string())
        .collect();
    assert_eq!(names, vec!["Alice"]);

    let log = h.message_repository.find_all().await.unwrap();
    assert_eq!(log.len(), 1);
    assert_eq!(log[0].from, "Alice");
    assert_eq!(log[0].to, BROADCAST_RECIPIENT);
    assert_eq!(log[0].kind, MessageKind::Status);
    assert_eq!(log[0].text.as_str(), JOIN_TEXT);
}

#[tokio::test]
async fn second_join_with_same_name_conflicts() {
    let h = harness(UnregisteredSenderPolicy::Reject);
    h.participants.join("Alice".into()).await.unwrap();

    let err = h.participants.join("Alice".into()).await.unwrap_err();
    assert!(matches!(
        err,
        ApplicationError::Domain(DomainError::ParticipantAlreadyExists)
    ));
    assert_eq!(h.participants.list().await.unwrap().len(), 1);
    assert_eq!(h.message_repository.find_all().await.unwrap().len(), 1);
}

#[tokio::test]
async fn names_are_case_sensitive() {
    let h = harness(UnregisteredSenderPolicy::Reject);
    h.participants.join("alice".into()).await.unwrap();
    h.participants.join("Alice".into()).await.unwrap();
    assert_eq!(h.participants.list().await.unwrap().len(), 2);
}

#[tokio::test]
async fn join_rejects_blank_name() {
    let h = harness(UnregisteredSenderPolicy::Reject);
    let err = h.participants.join("  ".into()).await.unwrap_err();
    assert!(matches!(
        err,
        ApplicationError::Domain(DomainError::InvalidArgument { .. })
    ));
    assert!(h.participants.list().await.unwrap().is_empty());
}

#[tokio::test]
async fn heartbeat_refreshes_last_seen() {
    let h = harness(UnregisteredSenderPolicy::Reject);
    h.participants.join("Alice".into()).await.unwrap();

    h.clock.advance(std::time::Duration::from_secs(7));
    h.participants.heartbeat("Alice").await.unwrap();

    let alice = h
        .participant_repository
        .find_by_name("Alice")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(alice.last_seen, start() + chrono::Duration::seconds(7));
}

#[tokio::test]
async fn heartbeat_never_regresses_last_seen() {
    let h = harness(UnregisteredSenderPolicy::Reject);
    h.participants.join("Alice".into()).await.unwrap();

    h.clock.set(start() - chrono::Duration::seconds(30));
    h.participants.heartbeat("Alice").await.unwrap();

    let alice = h
        .participant_repository
        .find_by_name("Alice")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(alice.last_seen, start());
}

#[tokio::test]
async fn heartbeat_for_unknown_participant_is_not_found_and_writes_nothing() {
    let h = harness(UnregisteredSenderPolicy::Reject);

    let err = h.participants.heartbeat("Ghost").await.unwrap_err();
    assert!(matches!(
        err,
        ApplicationError::Domain(DomainError::ParticipantNotFound)
    ));
    assert!(h.participant_repository.find_all().await.unwrap().is_empty());
    assert!(h.message_repository.find_all().await.unwrap().is_empty());
}

#[tokio::test]
async fn evict_is_idempotent() {
    let h = harness(UnregisteredSenderPolicy::Reject);
    h.participants.join("Alice".into()).await.unwrap();
    h.participants.join("Bob".into()).await.unwrap();

    h.participants.evict("Alice").await.unwrap();
    let after_first = h.participants.list().await.unwrap();
    let log_after_first = h.message_repository.find_all().await.unwrap();

    h.participants.evict("Alice").await.unwrap();
    assert_eq!(h.participants.list().await.unwrap(), after_first);
    assert_eq!(h.message_repository.find_all().await.unwrap(), log_after_first);
    assert_eq!(after_first.len(), 1);
}

#[tokio::test]
async fn send_from_registered_participant_is_stored() {
    let h = harness(UnregisteredSenderPolicy::Reject);
    h.participants.join("Alice".into()).await.unwrap();
    h.clock.advance(std::time::Duration::from_secs(3));

    let message = h
        .messages
        .send(send("Alice", "Bob", "hi", "private_message"))
        .await
        .unwrap();
    assert_eq!(message.kind, MessageKind::PrivateMessage);
    assert_eq!(message.created_at, start() + chrono::Duration::seconds(3));
    assert_eq!(message.display_time(), "12:00:03");
    assert_eq!(h.message_repository.find_all().await.unwrap().len(), 2);
}

#[tokio::test]
async fn send_validates_fields_before_anything_else() {
    let h = harness(UnregisteredSenderPolicy::Reject);
    h.participants.join("Alice".into()).await.unwrap();

    let cases = [
        send("Alice", "", "hi", "message"),
        send("Alice", "Todos", "", "message"),
        send("Alice", "Todos", "hi", ""),
        send("Alice", "Todos", "hi", "status"),
        send("Alice", "Todos", "hi", "shout"),
        send("Nobody", "Todos", "", "message"),
    ];
    for request in cases {
        let err = h.messages.send(request.clone()).await.unwrap_err();
        assert!(
            matches!(err, ApplicationError::Domain(DomainError::InvalidArgument { .. })),
            "expected validation error for {request:?}, got {err:?}"
        );
    }
    assert_eq!(h.message_repository.find_all().await.unwrap().len(), 1);
}

#[tokio::test]
async fn reject_policy_refuses_unregistered_sender() {
    let h = harness(UnregisteredSenderPolicy::Reject);
    h.participants.join("Alice".into()).await.unwrap();

    let err = h
        .messages
        .send(send("Bob", "Alice", "hi", "message"))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        ApplicationError::Domain(DomainError::SenderNotRegistered)
    ));
    assert_eq!(h.message_repository.find_all().await.unwrap().len(), 1);
}

#[tokio::test]
async fn log_policy_lets_unregistered_sender_through() {
    let h = harness(UnregisteredSenderPolicy::Log);
    h.participants.join("Alice".into()).await.unwrap();

    let message = h
        .messages
        .send(send("Bob", "Alice", "hi", "message"))
        .await
        .unwrap();
    assert_eq!(message.from, "Bob");
    assert_eq!(h.message_repository.find_all().await.unwrap().len(), 2);
}

#[tokio::test]
async fn message_to_unregistered_recipient_is_allowed() {
    let h = harness(UnregisteredSenderPolicy::Reject);
    h.participants.join("Alice".into()).await.unwrap();

    h.messages
        .send(send("Alice", "Bob", "hi", "message"))
        .await
        .unwrap();
}

async fn seed_conversation(h: &Harness) {
    for name in ["Alice", "Bob", "Carol"] {
        h.participants.join(name.into()).await.unwrap();
    }
    let script = [
        ("Alice", "Todos", "hello all", "message"),
        ("Alice", "Bob", "psst bob", "private_message"),
        ("Carol", "Alice", "hi alice", "private_message"),
        ("Bob", "Carol", "hey carol", "message"),
        ("Carol", "Todos", "bye all", "message"),
    ];
    for (from, to, text, kind) in script {
        h.messages.send(send(from, to, text, kind)).await.unwrap();
    }
}

#[tokio::test]
async fn list_filters_by_visibility_in_insertion_order() {
    let h = harness(UnregisteredSenderPolicy::Reject);
    seed_conversation(&h).await;

    let texts: Vec<String> = h
        .messages
        .list(list("Bob", None))
        .await
        .unwrap()
        .into_iter()
        .map(|m| m.text.to_string())
        .collect();
    assert_eq!(
        texts,
        vec![
            JOIN_TEXT,
            JOIN_TEXT,
            JOIN_TEXT,
            "hello all",
            "psst bob",
            "hey carol",
            "bye all"
        ]
    );

    let all = h.message_repository.find_all().await.unwrap();
    let expected: Vec<_> = all
        .iter()
        .filter(|m| m.to == "Todos" || m.to == "Alice" || m.from == "Alice")
        .cloned()
        .collect();
    assert_eq!(h.messages.list(list("Alice", None)).await.unwrap(), expected);
}

#[tokio::test]
async fn list_limit_returns_the_last_matching_messages() {
    let h = harness(UnregisteredSenderPolicy::Reject);
    seed_conversation(&h).await;

    let full = h.messages.list(list("Carol", None)).await.unwrap();
    let last_two = h.messages.list(list("Carol", Some(2))).await.unwrap();
    assert_eq!(last_two, full[full.len() - 2..].to_vec());
    assert_eq!(last_two[1].text.as_str(), "bye all");

    let more_than_available = h.messages.list(list("Carol", Some(100))).await.unwrap();
    assert_eq!(more_than_available, full);
}

#[tokio::test]
async fn list_for_unknown_viewer_only_shows_broadcasts() {
    let h = harness(UnregisteredSenderPolicy::Reject);
    seed_conversation(&h).await;

    let visible = h.messages.list(list("Mallory", None)).await.unwrap();
    assert!(visible.iter().all(|m| m.to == "Todos"));
    assert_eq!(visible.len(), 5);
}

#[tokio::test]
async fn zero_limit_is_rejected() {
    let h = harness(UnregisteredSenderPolicy::Reject);
    let err = h.messages.list(list("Alice", Some(0))).await.unwrap_err();
    assert!(matches!(
        err,
        ApplicationError::Domain(DomainError::InvalidArgument { .. })
    ));
}

#[tokio::test]
async fn join_keeps_participant_when_status_write_fails() {
    let participant_repository = Arc::new(InMemoryParticipantRepository::new());
    let mut message_repository = MockMessageRepository::new();
    message_repository
        .expect_insert()
        .times(1)
        .returning(|_| Err(RepositoryError::storage("down")));

    let clock = Arc::new(ManualClock::new(start()));
    let messages = Arc::new(MessageService::new(MessageServiceDependencies {
        message_repository: Arc::new(message_repository),
        participant_repository: participant_repository.clone(),
        clock: clock.clone(),
        unregistered_sender: UnregisteredSenderPolicy::Reject,
    }));
    let participants = ParticipantService::new(ParticipantServiceDependencies {
        participant_repository: participant_repository.clone(),
        message_service: messages,
        clock,
        locks: Arc::new(NameLocks::new()),
    });

    let result = participants.join("Alice".into()).await;
    assert!(matches!(
        result,
        Err(ApplicationError::Repository(RepositoryError::Storage { .. }))
    ));

    let registered = participant_repository.find_all().await.unwrap();
    assert_eq!(registered.len(), 1);
    assert_eq!(registered[0].name.as_str(), "Alice");
    assert_eq!(registered[0].last_seen, start());

    // 再次加入同名仍然冲突
    assert!(matches!(
        participants.join("Alice".into()).await,
        Err(ApplicationError::Domain(DomainError::ParticipantAlreadyExists))
    ));
}
