use std::convert::Infallible;

use axum::{
    extract::{Path, State},
    response::sse::{Event, KeepAlive, Sse},
    Extension, Json,
};
use chrono::Utc;
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, QueryOrder, Set};
use serde::Deserialize;
use tokio_stream::{Stream, StreamExt};
use uuid::Uuid;

use crate::entities::{meetup, message};
use crate::error::{AppError, AppResult};
use crate::services::chat::ChatMessage;
use crate::utils::jwt::Claims;
use crate::AppState;

const MAX_MESSAGE_LEN: usize = 2000;

async fn ensure_meetup(state: &AppState, meetup_id: Uuid) -> AppResult<()> {
    meetup::Entity::find_by_id(meetup_id)
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Meetup not found".to_string()))?;
    Ok(())
}

/// Chat history, oldest first
pub async fn list_messages(
    State(state): State<AppState>,
    Path(meetup_id): Path<Uuid>,
) -> AppResult<Json<Vec<ChatMessage>>> {
    ensure_meetup(&state, meetup_id).await?;

    let messages = message::Entity::find()
        .filter(message::Column::MeetupId.eq(meetup_id))
        .order_by_asc(message::Column::CreatedAt)
        .all(&state.db)
        .await?;

    Ok(Json(messages.into_iter().map(Into::into).collect()))
}

#[derive(Debug, Deserialize)]
pub struct SendMessageRequest {
    pub message: String,
}

/// Store a message and push it to live subscribers
pub async fn send_message(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(meetup_id): Path<Uuid>,
    Json(payload): Json<SendMessageRequest>,
) -> AppResult<Json<ChatMessage>> {
    let body = payload.message.trim();
    if body.is_empty() {
        return Err(AppError::BadRequest("Message cannot be empty".to_string()));
    }
    if body.chars().count() > MAX_MESSAGE_LEN {
        return Err(AppError::BadRequest(format!(
            "Message cannot exceed {} characters",
            MAX_MESSAGE_LEN
        )));
    }

    ensure_meetup(&state, meetup_id).await?;

    let saved = message::ActiveModel {
        id: Set(Uuid::new_v4()),
        meetup_id: Set(meetup_id),
        user_id: Set(claims.sub),
        user_name: Set(claims.name.clone()),
        body: Set(body.to_string()),
        created_at: Set(Utc::now().into()),
    }
    .insert(&state.db)
    .await?;

    let chat_message = ChatMessage::from(saved);
    let delivered = state.chat.publish(chat_message.clone());
    tracing::debug!(meetup_id = %meetup_id, delivered, "Chat message sent");

    Ok(Json(chat_message))
}

/// Live feed of new messages as server-sent events
pub async fn stream_messages(
    State(state): State<AppState>,
    Path(meetup_id): Path<Uuid>,
) -> AppResult<Sse<impl Stream<Item = Result<Event, Infallible>>>> {
    ensure_meetup(&state, meetup_id).await?;

    let stream = state
        .chat
        .subscribe(meetup_id)
        .filter_map(|message| Event::default().event("message").json_data(message).ok())
        .map(Ok);

    Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}
