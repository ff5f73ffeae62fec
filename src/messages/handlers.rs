/**
 * Messaging HTTP Handlers
 *
 * Send (multipart), conversation fetch with read-state side effect, explicit
 * mark-read, and the thread listing.
 */

use axum::extract::{Multipart, Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use uuid::Uuid;

use crate::error::ApiError;
use crate::messages::db;
use crate::messages::db::{MessageResponse, ThreadSummary};
use crate::middleware::auth::AuthUser;
use crate::posts::handlers::PageParams;
use crate::realtime::events::ServerEvent;
use crate::server::state::AppState;
use crate::users::db::get_user_by_id;

/// Default window size for conversation pages
const DEFAULT_CONVERSATION_LIMIT: i64 = 50;

/// Send a new message (multipart: `receiver` + `text` and/or `file`).
///
/// Persists the message, then pushes it to both participants' rooms and
/// plays a notification on the receiver's side.
pub async fn send_message(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<MessageResponse>), ApiError> {
    let pool = state.db_pool.clone().ok_or(ApiError::DatabaseUnavailable)?;

    let mut receiver: Option<Uuid> = None;
    let mut text: Option<String> = None;
    let mut file: Option<String> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::validation(format!("Invalid multipart body: {}", e)))?
    {
        match field.name() {
            Some("receiver") => {
                let raw = field
                    .text()
                    .await
                    .map_err(|e| ApiError::validation(format!("Invalid receiver field: {}", e)))?;
                receiver = Some(
                    Uuid::parse_str(raw.trim())
                        .map_err(|_| ApiError::validation("receiver must be a user ID"))?,
                );
            }
            Some("text") => {
                let raw = field
                    .text()
                    .await
                    .map_err(|e| ApiError::validation(format!("Invalid text field: {}", e)))?;
                if !raw.is_empty() {
                    text = Some(raw);
                }
            }
            Some("file") => {
                file = Some(state.uploads.store(field).await?);
            }
            _ => {}
        }
    }

    let receiver = receiver.ok_or_else(|| ApiError::validation("receiver is required"))?;
    if text.is_none() && file.is_none() {
        return Err(ApiError::validation("Message needs text or a file."));
    }

    if get_user_by_id(&pool, receiver).await?.is_none() {
        return Err(ApiError::not_found("Receiver not found."));
    }

    let message = db::create_message(&pool, user.user_id, receiver, text, file).await?;

    // Push to both sides so every open tab converges, and nudge the receiver
    let payload = serde_json::to_value(&message)
        .map_err(|e| ApiError::Internal(format!("Failed to serialize message: {}", e)))?;
    state
        .gateway
        .emit_to_user(receiver, ServerEvent::ReceiveMessage(payload.clone()));
    if receiver != user.user_id {
        state
            .gateway
            .emit_to_user(user.user_id, ServerEvent::ReceiveMessage(payload));
    }
    state.gateway.emit_to_user(
        receiver,
        ServerEvent::PlayNotification { from: user.user_id },
    );

    Ok((StatusCode::CREATED, Json(message)))
}

/// Get the conversation with another user, oldest -> newest.
///
/// Side effect: unread incoming messages are marked read, and a read receipt
/// goes to the counterpart when anything changed.
pub async fn get_conversation(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(other_id): Path<Uuid>,
    Query(params): Query<PageParams>,
) -> Result<Json<Vec<MessageResponse>>, ApiError> {
    let pool = state.db_pool.clone().ok_or(ApiError::DatabaseUnavailable)?;

    let page = params.page.unwrap_or(1).max(1);
    let limit = params.limit.unwrap_or(DEFAULT_CONVERSATION_LIMIT).clamp(1, 100);
    let offset = (page - 1) * limit;

    let messages = db::conversation(&pool, user.user_id, other_id, limit, offset).await?;

    let modified = db::mark_conversation_read(&pool, user.user_id, other_id).await?;
    if modified > 0 {
        state.gateway.emit_to_user(
            other_id,
            ServerEvent::MessagesRead {
                by: user.user_id,
                from: other_id,
            },
        );
    }

    Ok(Json(messages))
}

/// Mark all messages from a specific sender as read
pub async fn mark_conversation_read(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(other_id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let pool = state.db_pool.clone().ok_or(ApiError::DatabaseUnavailable)?;

    let modified = db::mark_conversation_read(&pool, user.user_id, other_id).await?;
    if modified > 0 {
        state.gateway.emit_to_user(
            other_id,
            ServerEvent::MessagesRead {
                by: user.user_id,
                from: other_id,
            },
        );
    }

    Ok(Json(serde_json::json!({
        "message": "Messages marked as read",
        "modifiedCount": modified,
    })))
}

/// List conversation threads: one per partner, latest message preview and
/// unread count, unread threads first
pub async fn get_threads(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> Result<Json<Vec<ThreadSummary>>, ApiError> {
    let pool = state.db_pool.clone().ok_or(ApiError::DatabaseUnavailable)?;

    let messages = db::all_messages_for(&pool, user.user_id).await?;
    let unread = db::unread_counts(&pool, user.user_id).await?;

    Ok(Json(db::build_threads(&messages, &unread, user.user_id)))
}
