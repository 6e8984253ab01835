//! REST handlers and DTOs.
//!
//! Endpoints:
//!
//! - `GET    /`                            — liveness marker
//! - `POST   /conversations`               — create a conversation
//! - `GET    /conversations`               — list, most recently active first
//! - `GET    /conversations/{id}`          — detail with messages + attachments
//! - `PATCH  /conversations/{id}`          — partial update
//! - `DELETE /conversations/{id}`          — delete with cascade
//! - `POST   /upload?conversation_id=`     — multipart file upload
//! - `POST   /conversations/{id}/messages` — send a message, get the reply
//! - `POST   /feedback`                    — thumbs up/down on a message
//! - `GET    /analytics`                   — aggregate usage counts

use axum::{
    Router,
    extract::{ConnectInfo, FromRequestParts, Multipart, Path, Query, State},
    http::{StatusCode, request::Parts},
    response::Json,
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use tracing::{debug, error};

use crate::SharedState;
use aura_core::error::{ChatError, StoreError};
use aura_core::model::{
    Attachment, ChatMessage, Conversation, Feedback, DEFAULT_MODEL, DEFAULT_TEMPERATURE,
    DEFAULT_TITLE,
};
use aura_store::{AnalyticsSummary, ConversationPatch, NewConversation};

/// Build the API router. All routes sit at the root.
pub fn api_router(state: SharedState) -> Router {
    Router::new()
        .route("/", get(root_handler))
        .route(
            "/conversations",
            post(create_conversation_handler).get(list_conversations_handler),
        )
        .route(
            "/conversations/{id}",
            get(get_conversation_handler)
                .patch(update_conversation_handler)
                .delete(delete_conversation_handler),
        )
        .route("/conversations/{id}/messages", post(create_message_handler))
        .route("/upload", post(upload_handler))
        .route("/feedback", post(create_feedback_handler))
        .route("/analytics", get(analytics_handler))
        .with_state(state)
}

// ── Client identity ───────────────────────────────────────────────────────

/// The rate-limiter key for a request: the first `X-Forwarded-For` hop if a
/// proxy set one, else the peer address, else a fixed fallback for harnesses
/// without socket info.
pub struct ClientKey(pub String);

impl<S> FromRequestParts<S> for ClientKey
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        _state: &S,
    ) -> Result<Self, Self::Rejection> {
        let forwarded = parts
            .headers
            .get("x-forwarded-for")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(',').next())
            .map(|v| v.trim().to_string());

        let key = forwarded
            .or_else(|| {
                parts
                    .extensions
                    .get::<ConnectInfo<SocketAddr>>()
                    .map(|ci| ci.0.ip().to_string())
            })
            .unwrap_or_else(|| "anonymous".to_string());

        Ok(ClientKey(key))
    }
}

// ── Request / Response types ──────────────────────────────────────────────

#[derive(Serialize)]
pub struct ErrorDetail {
    pub detail: String,
}

type ApiError = (StatusCode, Json<ErrorDetail>);

fn api_error(status: StatusCode, detail: impl Into<String>) -> ApiError {
    (
        status,
        Json(ErrorDetail {
            detail: detail.into(),
        }),
    )
}

fn map_store_error(e: StoreError) -> ApiError {
    match e {
        StoreError::NotFound { entity } => {
            api_error(StatusCode::NOT_FOUND, format!("{entity} not found"))
        }
        other => {
            error!(error = %other, "Store operation failed");
            api_error(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
        }
    }
}

fn map_chat_error(e: ChatError) -> ApiError {
    match e {
        ChatError::RateLimited { .. } => {
            api_error(StatusCode::TOO_MANY_REQUESTS, e.to_string())
        }
        ChatError::ConversationNotFound => {
            api_error(StatusCode::NOT_FOUND, "Conversation not found")
        }
        ChatError::Store(inner) => map_store_error(inner),
    }
}

#[derive(Deserialize)]
struct ConversationCreateRequest {
    #[serde(default = "default_title")]
    title: String,
    #[serde(default)]
    system_prompt: Option<String>,
    #[serde(default = "default_temperature")]
    temperature: f64,
    #[serde(default = "default_model")]
    selected_model: String,
}

fn default_title() -> String {
    DEFAULT_TITLE.into()
}
fn default_temperature() -> f64 {
    DEFAULT_TEMPERATURE
}
fn default_model() -> String {
    DEFAULT_MODEL.into()
}

#[derive(Deserialize)]
struct ConversationUpdateRequest {
    #[serde(default)]
    title: Option<String>,
    /// Absent means "leave unchanged"; an explicit `null` clears the prompt.
    #[serde(default, deserialize_with = "present_field")]
    system_prompt: Option<Option<String>>,
    #[serde(default)]
    temperature: Option<f64>,
    #[serde(default)]
    selected_model: Option<String>,
}

/// Wrap a field's value in `Some` so a present-but-null field deserializes
/// to `Some(None)` while an absent field falls back to the `None` default.
fn present_field<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: serde::Deserializer<'de>,
{
    Deserialize::deserialize(deserializer).map(Some)
}

#[derive(Deserialize)]
struct ListQuery {
    #[serde(default)]
    skip: i64,
    #[serde(default = "default_limit")]
    limit: i64,
}

fn default_limit() -> i64 {
    100
}

#[derive(Serialize)]
struct ConversationDetailResponse {
    #[serde(flatten)]
    conversation: Conversation,
    messages: Vec<ChatMessage>,
    attachments: Vec<Attachment>,
}

#[derive(Deserialize)]
struct UploadQuery {
    conversation_id: i64,
}

#[derive(Deserialize)]
struct MessageCreateRequest {
    /// Accepted for wire compatibility; inbound messages are always stored
    /// with the user role.
    #[serde(default = "default_role")]
    role: String,
    content: String,
}

fn default_role() -> String {
    "user".into()
}

#[derive(Deserialize)]
struct FeedbackCreateRequest {
    message_id: i64,
    conversation_id: i64,
    is_positive: bool,
    #[serde(default)]
    comment: Option<String>,
}

#[derive(Serialize)]
struct StatusMessage {
    message: &'static str,
}

// ── Handlers ──────────────────────────────────────────────────────────────

async fn root_handler() -> Json<StatusMessage> {
    Json(StatusMessage {
        message: "Aura API is running",
    })
}

async fn create_conversation_handler(
    State(state): State<SharedState>,
    Json(payload): Json<ConversationCreateRequest>,
) -> Result<Json<Conversation>, ApiError> {
    let conversation = state
        .store
        .create_conversation(NewConversation {
            title: payload.title,
            system_prompt: payload.system_prompt,
            temperature: payload.temperature,
            selected_model: payload.selected_model,
        })
        .await
        .map_err(map_store_error)?;

    Ok(Json(conversation))
}

async fn list_conversations_handler(
    State(state): State<SharedState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<Conversation>>, ApiError> {
    let conversations = state
        .store
        .list_conversations(query.skip, query.limit)
        .await
        .map_err(map_store_error)?;

    Ok(Json(conversations))
}

async fn get_conversation_handler(
    State(state): State<SharedState>,
    Path(id): Path<i64>,
) -> Result<Json<ConversationDetailResponse>, ApiError> {
    let conversation = state
        .store
        .get_conversation(id)
        .await
        .map_err(map_store_error)?
        .ok_or_else(|| api_error(StatusCode::NOT_FOUND, "Conversation not found"))?;

    let messages = state.store.list_messages(id).await.map_err(map_store_error)?;
    let attachments = state
        .store
        .list_attachments(id)
        .await
        .map_err(map_store_error)?;

    Ok(Json(ConversationDetailResponse {
        conversation,
        messages,
        attachments,
    }))
}

async fn update_conversation_handler(
    State(state): State<SharedState>,
    Path(id): Path<i64>,
    Json(payload): Json<ConversationUpdateRequest>,
) -> Result<Json<Conversation>, ApiError> {
    let updated = state
        .store
        .update_conversation(
            id,
            ConversationPatch {
                title: payload.title,
                system_prompt: payload.system_prompt,
                temperature: payload.temperature,
                selected_model: payload.selected_model,
            },
        )
        .await
        .map_err(map_store_error)?
        .ok_or_else(|| api_error(StatusCode::NOT_FOUND, "Conversation not found"))?;

    Ok(Json(updated))
}

async fn delete_conversation_handler(
    State(state): State<SharedState>,
    Path(id): Path<i64>,
) -> Result<Json<StatusMessage>, ApiError> {
    let deleted = state
        .store
        .delete_conversation(id)
        .await
        .map_err(map_store_error)?;

    if !deleted {
        return Err(api_error(StatusCode::NOT_FOUND, "Conversation not found"));
    }

    Ok(Json(StatusMessage {
        message: "Conversation deleted",
    }))
}

async fn upload_handler(
    State(state): State<SharedState>,
    Query(query): Query<UploadQuery>,
    mut multipart: Multipart,
) -> Result<Json<Attachment>, ApiError> {
    // Take the part named "file", skipping any other form fields.
    let field = loop {
        match multipart.next_field().await.map_err(|e| {
            api_error(StatusCode::BAD_REQUEST, format!("Invalid multipart body: {e}"))
        })? {
            Some(field) if field.name() == Some("file") => break field,
            Some(_) => continue,
            None => return Err(api_error(StatusCode::BAD_REQUEST, "Missing file field")),
        }
    };

    let filename = field
        .file_name()
        .map(String::from)
        .ok_or_else(|| api_error(StatusCode::BAD_REQUEST, "Missing filename"))?;
    let content_type = field.content_type().map(String::from);

    let data = field
        .bytes()
        .await
        .map_err(|e| api_error(StatusCode::BAD_REQUEST, format!("Failed to read upload: {e}")))?;

    let attachment = state
        .pipeline
        .handle_upload(
            query.conversation_id,
            &filename,
            content_type.as_deref(),
            &data,
        )
        .await
        .map_err(map_chat_error)?;

    Ok(Json(attachment))
}

async fn create_message_handler(
    State(state): State<SharedState>,
    Path(id): Path<i64>,
    client: ClientKey,
    Json(payload): Json<MessageCreateRequest>,
) -> Result<Json<ChatMessage>, ApiError> {
    debug!(conversation_id = id, role = %payload.role, "Inbound message");

    let reply = state
        .pipeline
        .handle_message(id, &client.0, &payload.content)
        .await
        .map_err(map_chat_error)?;

    Ok(Json(reply))
}

async fn create_feedback_handler(
    State(state): State<SharedState>,
    Json(payload): Json<FeedbackCreateRequest>,
) -> Result<Json<Feedback>, ApiError> {
    let feedback = state
        .store
        .insert_feedback(
            payload.message_id,
            payload.conversation_id,
            payload.is_positive,
            payload.comment.as_deref(),
        )
        .await
        .map_err(map_store_error)?;

    Ok(Json(feedback))
}

async fn analytics_handler(
    State(state): State<SharedState>,
) -> Result<Json<AnalyticsSummary>, ApiError> {
    let summary = state.store.analytics().await.map_err(map_store_error)?;
    Ok(Json(summary))
}
