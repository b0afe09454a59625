//! Storage ports. Implemented by `giftcoin-db` (SQLite) and by
//! [`crate::memory::MemoryStore`].
//!
//! Methods are blocking; async callers run them on the blocking pool.

use anyhow::Result;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use giftcoin_types::models::{Conversation, ConversationStatus, Gift, Identity, Message, Payment};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GiftQuery {
    All,
    SentBy(Identity),
    ReceivedBy(Identity),
}

pub trait GiftStore: Send + Sync {
    fn insert_gift(&self, gift: &Gift) -> Result<()>;

    fn gift_by_id(&self, id: Uuid) -> Result<Option<Gift>>;

    /// `code` must already be normalized.
    fn gift_by_code(&self, code: &str) -> Result<Option<Gift>>;

    fn gift_by_payment_id(&self, payment_id: Uuid) -> Result<Option<Gift>>;

    /// Newest first.
    fn list_gifts(&self, query: &GiftQuery) -> Result<Vec<Gift>>;

    /// Write the mutable columns of `next` only if the stored row still
    /// matches `current` in all of them (status, payment id, thank-you note
    /// and both timestamps). Returns whether the write happened.
    fn compare_and_set(&self, current: &Gift, next: &Gift) -> Result<bool>;

    /// Set the thank-you note only if the gift is registered and has none yet.
    fn set_thank_you(&self, id: Uuid, message: &str) -> Result<bool>;

    /// `pending` and `paid` gifts whose `expires_at <= now`.
    fn gifts_expiring_before(&self, now: DateTime<Utc>) -> Result<Vec<Gift>>;

    fn refunded_gifts_sent_by(&self, identity: &Identity) -> Result<Vec<Gift>>;

    /// [`GiftStore::compare_and_set`] `current -> stamped` and insert
    /// `payment` as one atomic step. Nothing is written when the gift moved on.
    fn attach_payment(&self, current: &Gift, stamped: &Gift, payment: &Payment) -> Result<bool>;

    fn payment_by_id(&self, id: Uuid) -> Result<Option<Payment>>;

    /// Mark a pending payment completed. Returns false if it was not pending.
    fn complete_payment_row(&self, id: Uuid, at: DateTime<Utc>) -> Result<bool>;
}

pub trait ChatStore: Send + Sync {
    fn insert_conversation(&self, conversation: &Conversation) -> Result<()>;

    fn conversation_by_id(&self, id: Uuid) -> Result<Option<Conversation>>;

    fn open_conversations(&self) -> Result<Vec<Conversation>>;

    fn list_conversations(&self) -> Result<Vec<Conversation>>;

    fn set_conversation_status(&self, id: Uuid, status: ConversationStatus) -> Result<bool>;

    /// Append `message` and refresh the conversation's last message preview
    /// and timestamp.
    fn insert_message(&self, message: &Message, preview: &str) -> Result<()>;

    /// Oldest first; equal timestamps keep insertion order.
    fn messages_for(&self, conversation_id: Uuid) -> Result<Vec<Message>>;
}
