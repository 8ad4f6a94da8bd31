//! services/api/src/web/messages.rs
//!
//! Messaging endpoints: the patient-doctor inbox, threads, and read
//! tracking. Enum-valued query and body fields arrive as strings and are
//! parsed here so unknown values fail as 400s rather than deserialization
//! noise.

use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
    Extension, Json,
};
use portal_core::domain::{
    Attachment, Caller, MessageFilters, MessagePriority, MessageType, OutgoingMessage, PageRequest,
    PartyRef, Role,
};
use portal_core::messaging;
use portal_core::ports::PortError;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::error::ApiError;
use crate::web::envelope;
use crate::web::state::AppState;

#[derive(Deserialize, ToSchema)]
pub struct SendMessageRequest {
    pub recipient_id: Uuid,
    /// `patient` or `doctor`; must be the opposite of the caller's role.
    pub recipient_role: String,
    pub subject: String,
    pub content: String,
    pub message_type: Option<String>,
    pub priority: Option<String>,
    pub appointment_id: Option<Uuid>,
    #[serde(default)]
    #[schema(value_type = Vec<Object>)]
    pub attachments: Vec<Attachment>,
}

#[derive(Deserialize, ToSchema)]
pub struct ReplyRequest {
    pub content: String,
}

#[derive(Deserialize, ToSchema)]
pub struct MarkManyReadRequest {
    pub message_ids: Vec<Uuid>,
}

#[derive(Serialize, ToSchema)]
pub struct MarkManyReadResponse {
    pub updated: u64,
}

#[derive(Deserialize)]
pub struct InboxQuery {
    pub message_type: Option<String>,
    pub is_read: Option<bool>,
    pub priority: Option<String>,
    pub page: Option<u64>,
    pub limit: Option<u64>,
}

fn parse_message_type(s: &str) -> Result<MessageType, ApiError> {
    MessageType::parse(s).ok_or_else(|| {
        ApiError::Port(PortError::invalid("message_type", "unknown message type"))
    })
}

fn parse_priority(s: &str) -> Result<MessagePriority, ApiError> {
    MessagePriority::parse(s)
        .ok_or_else(|| ApiError::Port(PortError::invalid("priority", "unknown priority")))
}

/// GET /api/v1/messages - The caller's inbox: received messages, newest
/// first, with an unread count that ignores the filters.
#[utoipa::path(
    get,
    path = "/api/v1/messages",
    params(
        ("message_type" = Option<String>, Query, description = "Filter by message type"),
        ("is_read" = Option<bool>, Query, description = "Filter by read state"),
        ("priority" = Option<String>, Query, description = "Filter by priority"),
        ("page" = Option<u64>, Query, description = "1-based page number"),
        ("limit" = Option<u64>, Query, description = "Page size, clamped to 1..=100")
    ),
    responses(
        (status = 200, description = "One page of the caller's inbox"),
        (status = 400, description = "Unknown filter value"),
        (status = 401, description = "Not authenticated")
    )
)]
pub async fn inbox_handler(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<Caller>,
    Query(query): Query<InboxQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let filters = MessageFilters {
        message_type: query
            .message_type
            .as_deref()
            .map(parse_message_type)
            .transpose()?,
        is_read: query.is_read,
        priority: query.priority.as_deref().map(parse_priority).transpose()?,
    };
    let page = PageRequest::new(query.page, query.limit);
    let inbox = messaging::inbox(state.messages.as_ref(), caller, filters, page).await?;
    Ok(envelope::ok(inbox))
}

/// POST /api/v1/messages - Send a message to the other side.
#[utoipa::path(
    post,
    path = "/api/v1/messages",
    request_body = SendMessageRequest,
    responses(
        (status = 201, description = "Message sent"),
        (status = 400, description = "Validation failed"),
        (status = 404, description = "Recipient not found")
    )
)]
pub async fn send_handler(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<Caller>,
    Json(req): Json<SendMessageRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let recipient_role = Role::parse(&req.recipient_role).ok_or_else(|| {
        ApiError::Port(PortError::invalid(
            "recipient_role",
            "expected patient or doctor",
        ))
    })?;
    let outgoing = OutgoingMessage {
        recipient: PartyRef {
            role: recipient_role,
            id: req.recipient_id,
        },
        subject: req.subject,
        content: req.content,
        message_type: req
            .message_type
            .as_deref()
            .map(parse_message_type)
            .transpose()?,
        priority: req.priority.as_deref().map(parse_priority).transpose()?,
        appointment_id: req.appointment_id,
        attachments: req.attachments,
    };
    let message =
        messaging::send(state.identities.as_ref(), state.messages.as_ref(), caller, outgoing)
            .await?;
    Ok(envelope::created(message))
}

/// GET /api/v1/messages/{id}
#[utoipa::path(
    get,
    path = "/api/v1/messages/{id}",
    params(("id" = Uuid, Path, description = "Message id")),
    responses(
        (status = 200, description = "The message"),
        (status = 403, description = "Caller is not a party of this message"),
        (status = 404, description = "No such message")
    )
)]
pub async fn get_handler(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<Caller>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let message = messaging::get(state.messages.as_ref(), caller, id).await?;
    Ok(envelope::ok(message))
}

/// POST /api/v1/messages/{id}/reply - Reply within the parent's thread.
#[utoipa::path(
    post,
    path = "/api/v1/messages/{id}/reply",
    request_body = ReplyRequest,
    params(("id" = Uuid, Path, description = "Parent message id")),
    responses(
        (status = 201, description = "Reply sent"),
        (status = 403, description = "Caller is not a party of the parent"),
        (status = 404, description = "No such message")
    )
)]
pub async fn reply_handler(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<Caller>,
    Path(id): Path<Uuid>,
    Json(req): Json<ReplyRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let message = messaging::reply(state.messages.as_ref(), caller, id, req.content).await?;
    Ok(envelope::created(message))
}

/// PUT /api/v1/messages/{id}/read - Recipient marks one message read.
#[utoipa::path(
    put,
    path = "/api/v1/messages/{id}/read",
    params(("id" = Uuid, Path, description = "Message id")),
    responses(
        (status = 200, description = "Message marked read"),
        (status = 403, description = "Caller is not the recipient"),
        (status = 404, description = "No such message")
    )
)]
pub async fn mark_read_handler(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<Caller>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let message = messaging::mark_read(state.messages.as_ref(), caller, id).await?;
    Ok(envelope::ok(message))
}

/// PUT /api/v1/messages/read - Bulk mark-read; ids the caller does not
/// receive are skipped, not errors.
#[utoipa::path(
    put,
    path = "/api/v1/messages/read",
    request_body = MarkManyReadRequest,
    responses(
        (status = 200, description = "Count of messages newly marked read", body = MarkManyReadResponse)
    )
)]
pub async fn mark_many_read_handler(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<Caller>,
    Json(req): Json<MarkManyReadRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let updated =
        messaging::mark_many_read(state.messages.as_ref(), caller, &req.message_ids).await?;
    Ok(envelope::ok(MarkManyReadResponse { updated }))
}

/// DELETE /api/v1/messages/{id} - Recipient removes a message from their
/// inbox.
#[utoipa::path(
    delete,
    path = "/api/v1/messages/{id}",
    params(("id" = Uuid, Path, description = "Message id")),
    responses(
        (status = 200, description = "Message deleted"),
        (status = 403, description = "Caller is not the recipient"),
        (status = 404, description = "No such message")
    )
)]
pub async fn delete_handler(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<Caller>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    messaging::delete(state.messages.as_ref(), caller, id).await?;
    Ok(envelope::message("Message deleted"))
}

/// GET /api/v1/messages/thread/{thread_id} - The thread's messages the
/// caller participates in, oldest first. Reading a thread marks the
/// caller's unread incoming messages in it as read.
#[utoipa::path(
    get,
    path = "/api/v1/messages/thread/{thread_id}",
    params(("thread_id" = Uuid, Path, description = "Thread id (the root message's id)")),
    responses(
        (status = 200, description = "The thread, oldest first"),
        (status = 404, description = "No visible messages in this thread")
    )
)]
pub async fn thread_handler(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<Caller>,
    Path(thread_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let messages = messaging::get_thread(state.messages.as_ref(), caller, thread_id).await?;
    Ok(envelope::ok(messages))
}
