use axum::{
    extract::{Query, State},
    http::{HeaderMap, HeaderValue, StatusCode},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    trace::TraceLayer,
};
use validator::Validate;

use application::{ListMessagesQuery, MessageDto, ParticipantDto, SendMessageRequest};

use crate::{error::ApiError, state::AppState};

/// 调用者通过该请求头声明自己的名称
const USER_HEADER: &str = "user";

#[derive(Debug, Deserialize, Validate)]
struct JoinPayload {
    #[serde(default)]
    #[validate(length(min = 1, message = "is required"))]
    name: String,
}

#[derive(Debug, Deserialize, Validate)]
struct SendMessagePayload {
    #[serde(default)]
    #[validate(length(min = 1, message = "is required"))]
    to: String,
    #[serde(default)]
    #[validate(length(min = 1, message = "is required"))]
    text: String,
    #[serde(default, rename = "type")]
    #[validate(length(min = 1, message = "is required"))]
    kind: String,
}

#[derive(Debug, Deserialize)]
struct MessagesQuery {
    limit: Option<String>,
}

pub fn router(state: AppState, cors_origins: &[String]) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/participants", post(join).get(list_participants))
        .route("/messages", post(send_message).get(list_messages))
        .route("/status", post(heartbeat))
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(cors_origins))
        .with_state(state)
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    if origins.is_empty() || origins.iter().any(|origin| origin == "*") {
        return layer.allow_origin(Any);
    }
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "忽略无效的 CORS 来源");
                None
            }
        })
        .collect();
    layer.allow_origin(AllowOrigin::list(origins))
}

fn user_from_headers(headers: &HeaderMap) -> Result<String, ApiError> {
    headers
        .get(USER_HEADER)
        .and_then(|value| value.to_str().ok())
        .filter(|value| !value.is_empty())
        .map(str::to_owned)
        .ok_or_else(|| ApiError::invalid_field("User", "header is required"))
}

fn parse_limit(raw: Option<String>) -> Result<Option<usize>, ApiError> {
    match raw {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse::<usize>()
            .map(Some)
            .map_err(|_| ApiError::invalid_field("limit", "must be a positive integer")),
    }
}

async fn health() -> StatusCode {
    StatusCode::OK
}

async fn join(
    State(state): State<AppState>,
    Json(payload): Json<JoinPayload>,
) -> Result<(StatusCode, Json<ParticipantDto>), ApiError> {
    payload.validate()?;
    let participant = state.participant_service.join(payload.name).await?;
    Ok((StatusCode::CREATED, Json(ParticipantDto::from(&participant))))
}

async fn list_participants(
    State(state): State<AppState>,
) -> Result<Json<Vec<ParticipantDto>>, ApiError> {
    let participants = state.participant_service.list().await?;
    Ok(Json(participants.iter().map(ParticipantDto::from).collect()))
}

async fn send_message(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<SendMessagePayload>,
) -> Result<(StatusCode, Json<MessageDto>), ApiError> {
    payload.validate()?;
    let from = user_from_headers(&headers)?;
    let message = state
        .message_service
        .send(SendMessageRequest {
            from,
            to: payload.to,
            text: payload.text,
            kind: payload.kind,
        })
        .await?;
    Ok((StatusCode::CREATED, Json(MessageDto::from(&message))))
}

async fn list_messages(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<MessagesQuery>,
) -> Result<Json<Vec<MessageDto>>, ApiError> {
    let viewer = user_from_headers(&headers)?;
    let limit = parse_limit(query.limit)?;
    let messages = state
        .message_service
        .list(ListMessagesQuery { viewer, limit })
        .await?;
    Ok(Json(messages.iter().map(MessageDto::from).collect()))
}

async fn heartbeat(State(state): State<AppState>, headers: HeaderMap) -> Result<StatusCode, ApiError> {
    let name = user_from_headers(&headers)?;
    state.participant_service.heartbeat(&name).await?;
    Ok(StatusCode::OK)
}
