#![allow(dead_code)]

use std::sync::Arc;

use application::{
    InMemoryMessageRepository, InMemoryParticipantRepository, ManualClock, MessageService,
    MessageServiceDependencies, NameLocks, ParticipantService, ParticipantServiceDependencies,
    PresenceSweeper, SweeperSettings, UnregisteredSenderPolicy,
};
use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    Router,
};
use chrono::{TimeZone, Utc};
use serde_json::Value;
use tower::ServiceExt;
use web_api::{router, AppState};

pub struct TestApp {
    pub router: Router,
    pub clock: Arc<ManualClock>,
    pub sweeper: Arc<PresenceSweeper>,
}

pub fn build_app(policy: UnregisteredSenderPolicy) -> TestApp {
    let participant_repository = Arc::new(InMemoryParticipantRepository::new());
    let message_repository = Arc::new(InMemoryMessageRepository::new());
    let clock = Arc::new(ManualClock::new(
        Utc.with_ymd_and_hms(2024, 6, 1, 9, 30, 0).unwrap(),
    ));

    let message_service = Arc::new(MessageService::new(MessageServiceDependencies {
        message_repository,
        participant_repository: participant_repository.clone(),
        clock: clock.clone(),
        unregistered_sender: policy,
    }));
    let participant_service = Arc::new(ParticipantService::new(ParticipantServiceDependencies {
        participant_repository,
        message_service: message_service.clone(),
        clock: clock.clone(),
        locks: Arc::new(NameLocks::new()),
    }));
    let sweeper = Arc::new(PresenceSweeper::new(
        participant_service.clone(),
        message_service.clone(),
        clock.clone(),
        SweeperSettings {
            period: std::time::Duration::from_secs(15),
            stale_threshold: std::time::Duration::from_secs(10),
        },
    ));

    let state = AppState::new(participant_service, message_service);
    TestApp {
        router: router(state, &["*".to_string()]),
        clock,
        sweeper,
    }
}

pub async fn call(
    app: &TestApp,
    method: &str,
    uri: &str,
    user: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut request = Request::builder().method(method).uri(uri);
    if let Some(user) = user {
        request = request.header("User", user);
    }
    let request = match body {
        Some(body) => request
            .header("content-type", "application/json")
            .body(Body::from(body.to_string())),
        None => request.body(Body::empty()),
    }
    .expect("request");

    let response = app
        .router
        .clone()
        .oneshot(request)
        .await
        .expect("response");
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).expect("json body")
    };
    (status, json)
}
