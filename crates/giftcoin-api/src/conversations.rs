use axum::{
    Json,
    extract::{Path, State, rejection::JsonRejection},
};

use giftcoin_core::GiftError;
use giftcoin_types::api::{CreateConversationRequest, SendMessageRequest};
use giftcoin_types::models::{Conversation, Message};

use crate::error::{ApiError, blocking, parse_id};
use crate::state::AppState;

/// Returns the caller's open conversation if there is one.
pub async fn create_conversation(
    State(state): State<AppState>,
    payload: Result<Json<CreateConversationRequest>, JsonRejection>,
) -> Result<Json<Conversation>, ApiError> {
    let Json(req) = payload?;

    let conversation =
        blocking(move || state.chat.open_conversation(req.user_name, req.user_email)).await?;
    Ok(Json(conversation))
}

pub async fn list_conversations(
    State(state): State<AppState>,
) -> Result<Json<Vec<Conversation>>, ApiError> {
    let conversations = blocking(move || state.chat.list_conversations()).await?;
    Ok(Json(conversations))
}

pub async fn close_conversation(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Conversation>, ApiError> {
    let conversation_id = parse_id(&id, GiftError::ConversationNotFound)?;

    let conversation = blocking(move || state.chat.close_conversation(conversation_id)).await?;
    Ok(Json(conversation))
}

pub async fn get_messages(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Vec<Message>>, ApiError> {
    let conversation_id = parse_id(&id, GiftError::ConversationNotFound)?;

    let messages = blocking(move || state.chat.messages(conversation_id)).await?;
    Ok(Json(messages))
}

pub async fn send_message(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<SendMessageRequest>, JsonRejection>,
) -> Result<Json<Message>, ApiError> {
    let conversation_id = parse_id(&id, GiftError::ConversationNotFound)?;
    let Json(req) = payload?;

    let message = blocking(move || {
        state
            .chat
            .send_message(conversation_id, req.sender_type, req.content)
    })
    .await?;
    Ok(Json(message))
}
