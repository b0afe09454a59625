//! Support inbox rules.

use std::cmp::Ordering;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use giftcoin_types::models::{Conversation, ConversationStatus, Message, SenderType};

use crate::error::{GiftError, Result};

/// Characters of the latest message kept on the conversation row.
pub const PREVIEW_CHARS: usize = 100;

pub fn preview(content: &str) -> String {
    content.chars().take(PREVIEW_CHARS).collect()
}

pub fn new_conversation(
    user_name: Option<String>,
    user_email: Option<String>,
    id: Uuid,
    now: DateTime<Utc>,
) -> Result<Conversation> {
    let user_name = user_name
        .map(|n| n.trim().to_string())
        .filter(|n| !n.is_empty())
        .ok_or(GiftError::MissingField("userName"))?;
    let user_email = user_email
        .map(|e| e.trim().to_string())
        .filter(|e| !e.is_empty());

    Ok(Conversation {
        id,
        user_name,
        user_email,
        status: ConversationStatus::Open,
        last_message: None,
        last_message_at: None,
        created_at: now,
    })
}

/// An open conversation belongs to the same user when the emails match, or,
/// if no email was given, when the names match.
pub fn same_user(existing: &Conversation, user_name: &str, user_email: Option<&str>) -> bool {
    match user_email {
        Some(email) => existing.user_email.as_deref() == Some(email),
        None => existing.user_email.is_none() && existing.user_name == user_name,
    }
}

pub fn new_message(
    conversation_id: Uuid,
    sender_type: Option<SenderType>,
    content: Option<String>,
    id: Uuid,
    now: DateTime<Utc>,
) -> Result<Message> {
    let sender_type = sender_type.ok_or(GiftError::MissingField("senderType"))?;
    let content = content
        .map(|c| c.trim().to_string())
        .filter(|c| !c.is_empty())
        .ok_or(GiftError::MissingField("content"))?;

    Ok(Message {
        id,
        conversation_id,
        sender_type,
        content,
        created_at: now,
    })
}

/// Open conversations first, then most recent activity first.
pub fn inbox_order(a: &Conversation, b: &Conversation) -> Ordering {
    let open = |c: &Conversation| c.status == ConversationStatus::Open;
    open(b)
        .cmp(&open(a))
        .then_with(|| b.activity_at().cmp(&a.activity_at()))
}
