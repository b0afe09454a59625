//! Database row types. These map directly to SQLite rows and are converted
//! into the `giftcoin-types` models at the edge of this crate.

use anyhow::{Context, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::Row;
use uuid::Uuid;

use giftcoin_types::models::{Conversation, Gift, Message, Payment};

/// Timestamps are stored as fixed-width RFC 3339 strings in UTC so that
/// lexicographic order in SQL equals chronological order.
pub fn ts(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn parse_ts(raw: &str) -> Result<DateTime<Utc>> {
    Ok(DateTime::parse_from_rfc3339(raw)
        .with_context(|| format!("corrupt timestamp '{}'", raw))?
        .with_timezone(&Utc))
}

fn parse_opt_ts(raw: Option<String>) -> Result<Option<DateTime<Utc>>> {
    raw.as_deref().map(parse_ts).transpose()
}

fn parse_id(raw: &str) -> Result<Uuid> {
    raw.parse().with_context(|| format!("corrupt id '{}'", raw))
}

pub const GIFT_COLUMNS: &str = "id, code, amount, sender_name, sender_phone, sender_email, \
     receiver_name, receiver_phone, receiver_email, message, status, payment_id, \
     thank_you_message, created_at, expires_at, registered_at, refunded_at";

pub struct GiftRow {
    pub id: String,
    pub code: String,
    pub amount: i64,
    pub sender_name: String,
    pub sender_phone: Option<String>,
    pub sender_email: Option<String>,
    pub receiver_name: String,
    pub receiver_phone: Option<String>,
    pub receiver_email: Option<String>,
    pub message: Option<String>,
    pub status: String,
    pub payment_id: Option<String>,
    pub thank_you_message: Option<String>,
    pub created_at: String,
    pub expires_at: String,
    pub registered_at: Option<String>,
    pub refunded_at: Option<String>,
}

impl GiftRow {
    /// Expects the columns in [`GIFT_COLUMNS`] order.
    pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            code: row.get(1)?,
            amount: row.get(2)?,
            sender_name: row.get(3)?,
            sender_phone: row.get(4)?,
            sender_email: row.get(5)?,
            receiver_name: row.get(6)?,
            receiver_phone: row.get(7)?,
            receiver_email: row.get(8)?,
            message: row.get(9)?,
            status: row.get(10)?,
            payment_id: row.get(11)?,
            thank_you_message: row.get(12)?,
            created_at: row.get(13)?,
            expires_at: row.get(14)?,
            registered_at: row.get(15)?,
            refunded_at: row.get(16)?,
        })
    }

    pub fn into_gift(self) -> Result<Gift> {
        Ok(Gift {
            id: parse_id(&self.id)?,
            code: self.code,
            amount: self.amount,
            sender_name: self.sender_name,
            sender_phone: self.sender_phone,
            sender_email: self.sender_email,
            receiver_name: self.receiver_name,
            receiver_phone: self.receiver_phone,
            receiver_email: self.receiver_email,
            message: self.message,
            status: self.status.parse()?,
            payment_id: self.payment_id.as_deref().map(parse_id).transpose()?,
            thank_you_message: self.thank_you_message,
            created_at: parse_ts(&self.created_at)?,
            expires_at: parse_ts(&self.expires_at)?,
            registered_at: parse_opt_ts(self.registered_at)?,
            refunded_at: parse_opt_ts(self.refunded_at)?,
        })
    }
}

pub const PAYMENT_COLUMNS: &str = "id, gift_id, amount, method, status, created_at, completed_at";

pub struct PaymentRow {
    pub id: String,
    pub gift_id: String,
    pub amount: i64,
    pub method: String,
    pub status: String,
    pub created_at: String,
    pub completed_at: Option<String>,
}

impl PaymentRow {
    pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            gift_id: row.get(1)?,
            amount: row.get(2)?,
            method: row.get(3)?,
            status: row.get(4)?,
            created_at: row.get(5)?,
            completed_at: row.get(6)?,
        })
    }

    pub fn into_payment(self) -> Result<Payment> {
        Ok(Payment {
            id: parse_id(&self.id)?,
            gift_id: parse_id(&self.gift_id)?,
            amount: self.amount,
            method: self.method,
            status: self.status.parse()?,
            created_at: parse_ts(&self.created_at)?,
            completed_at: parse_opt_ts(self.completed_at)?,
        })
    }
}

pub const CONVERSATION_COLUMNS: &str =
    "id, user_name, user_email, status, last_message, last_message_at, created_at";

pub struct ConversationRow {
    pub id: String,
    pub user_name: String,
    pub user_email: Option<String>,
    pub status: String,
    pub last_message: Option<String>,
    pub last_message_at: Option<String>,
    pub created_at: String,
}

impl ConversationRow {
    pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            user_name: row.get(1)?,
            user_email: row.get(2)?,
            status: row.get(3)?,
            last_message: row.get(4)?,
            last_message_at: row.get(5)?,
            created_at: row.get(6)?,
        })
    }

    pub fn into_conversation(self) -> Result<Conversation> {
        Ok(Conversation {
            id: parse_id(&self.id)?,
            user_name: self.user_name,
            user_email: self.user_email,
            status: self.status.parse()?,
            last_message: self.last_message,
            last_message_at: parse_opt_ts(self.last_message_at)?,
            created_at: parse_ts(&self.created_at)?,
        })
    }
}

pub const MESSAGE_COLUMNS: &str = "id, conversation_id, sender_type, content, created_at";

pub struct MessageRow {
    pub id: String,
    pub conversation_id: String,
    pub sender_type: String,
    pub content: String,
    pub created_at: String,
}

impl MessageRow {
    pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            conversation_id: row.get(1)?,
            sender_type: row.get(2)?,
            content: row.get(3)?,
            created_at: row.get(4)?,
        })
    }

    pub fn into_message(self) -> Result<Message> {
        Ok(Message {
            id: parse_id(&self.id)?,
            conversation_id: parse_id(&self.conversation_id)?,
            sender_type: self.sender_type.parse()?,
            content: self.content,
            created_at: parse_ts(&self.created_at)?,
        })
    }
}
