use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use anyhow::{Result, anyhow, bail};
use chrono::{DateTime, Utc};
use uuid::Uuid;

use giftcoin_types::models::{
    Conversation, ConversationStatus, Gift, GiftStatus, Identity, Message, Payment, PaymentStatus,
};

use crate::store::{ChatStore, GiftQuery, GiftStore};

#[derive(Default)]
struct Tables {
    gifts: Vec<Gift>,
    payments: Vec<Payment>,
    conversations: Vec<Conversation>,
    messages: Vec<Message>,
}

/// Thread-safe in-memory row store, for tests and local experiments.
///
/// Rows live in insertion-ordered vectors behind one lock, so every trait
/// method is atomic with respect to the others.
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Tables>> {
        self.tables
            .read()
            .map_err(|e| anyhow!("memory store lock poisoned: {}", e))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Tables>> {
        self.tables
            .write()
            .map_err(|e| anyhow!("memory store lock poisoned: {}", e))
    }
}

fn newest_first(mut gifts: Vec<Gift>) -> Vec<Gift> {
    gifts.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    gifts
}

impl GiftStore for MemoryStore {
    fn insert_gift(&self, gift: &Gift) -> Result<()> {
        let mut t = self.write()?;
        if t.gifts.iter().any(|g| g.id == gift.id || g.code == gift.code) {
            bail!("duplicate gift id or code");
        }
        t.gifts.push(gift.clone());
        Ok(())
    }

    fn gift_by_id(&self, id: Uuid) -> Result<Option<Gift>> {
        Ok(self.read()?.gifts.iter().find(|g| g.id == id).cloned())
    }

    fn gift_by_code(&self, code: &str) -> Result<Option<Gift>> {
        Ok(self.read()?.gifts.iter().find(|g| g.code == code).cloned())
    }

    fn gift_by_payment_id(&self, payment_id: Uuid) -> Result<Option<Gift>> {
        Ok(self
            .read()?
            .gifts
            .iter()
            .find(|g| g.payment_id == Some(payment_id))
            .cloned())
    }

    fn list_gifts(&self, query: &GiftQuery) -> Result<Vec<Gift>> {
        let t = self.read()?;
        let rows = t
            .gifts
            .iter()
            .filter(|g| match query {
                GiftQuery::All => true,
                GiftQuery::SentBy(who) => who.matches(g.sender_phone.as_deref(), g.sender_email.as_deref()),
                GiftQuery::ReceivedBy(who) => {
                    who.matches(g.receiver_phone.as_deref(), g.receiver_email.as_deref())
                }
            })
            .cloned()
            .collect();
        Ok(newest_first(rows))
    }

    fn compare_and_set(&self, current: &Gift, next: &Gift) -> Result<bool> {
        Ok(swap_gift(&mut *self.write()?, current, next))
    }

    fn set_thank_you(&self, id: Uuid, message: &str) -> Result<bool> {
        let mut t = self.write()?;
        match t.gifts.iter_mut().find(|g| g.id == id) {
            Some(row) if row.status == GiftStatus::Registered && row.thank_you_message.is_none() => {
                row.thank_you_message = Some(message.to_string());
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    fn gifts_expiring_before(&self, now: DateTime<Utc>) -> Result<Vec<Gift>> {
        Ok(self
            .read()?
            .gifts
            .iter()
            .filter(|g| matches!(g.status, GiftStatus::Pending | GiftStatus::Paid))
            .filter(|g| g.expires_at <= now)
            .cloned()
            .collect())
    }

    fn refunded_gifts_sent_by(&self, identity: &Identity) -> Result<Vec<Gift>> {
        let rows = self
            .list_gifts(&GiftQuery::SentBy(identity.clone()))?
            .into_iter()
            .filter(|g| g.status == GiftStatus::Refunded)
            .collect();
        Ok(rows)
    }

    fn attach_payment(&self, current: &Gift, stamped: &Gift, payment: &Payment) -> Result<bool> {
        let mut t = self.write()?;
        if !swap_gift(&mut t, current, stamped) {
            return Ok(false);
        }
        t.payments.push(payment.clone());
        Ok(true)
    }

    fn payment_by_id(&self, id: Uuid) -> Result<Option<Payment>> {
        Ok(self.read()?.payments.iter().find(|p| p.id == id).cloned())
    }

    fn complete_payment_row(&self, id: Uuid, at: DateTime<Utc>) -> Result<bool> {
        let mut t = self.write()?;
        match t.payments.iter_mut().find(|p| p.id == id) {
            Some(p) if p.status == PaymentStatus::Pending => {
                p.status = PaymentStatus::Completed;
                p.completed_at = Some(at);
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

impl ChatStore for MemoryStore {
    fn insert_conversation(&self, conversation: &Conversation) -> Result<()> {
        self.write()?.conversations.push(conversation.clone());
        Ok(())
    }

    fn conversation_by_id(&self, id: Uuid) -> Result<Option<Conversation>> {
        Ok(self.read()?.conversations.iter().find(|c| c.id == id).cloned())
    }

    fn open_conversations(&self) -> Result<Vec<Conversation>> {
        Ok(self
            .read()?
            .conversations
            .iter()
            .filter(|c| c.status == ConversationStatus::Open)
            .cloned()
            .collect())
    }

    fn list_conversations(&self) -> Result<Vec<Conversation>> {
        Ok(self.read()?.conversations.clone())
    }

    fn set_conversation_status(&self, id: Uuid, status: ConversationStatus) -> Result<bool> {
        let mut t = self.write()?;
        match t.conversations.iter_mut().find(|c| c.id == id) {
            Some(c) => {
                c.status = status;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn insert_message(&self, message: &Message, preview: &str) -> Result<()> {
        let mut t = self.write()?;
        let conversation = t
            .conversations
            .iter_mut()
            .find(|c| c.id == message.conversation_id)
            .ok_or_else(|| anyhow!("conversation {} not found", message.conversation_id))?;
        conversation.last_message = Some(preview.to_string());
        conversation.last_message_at = Some(message.created_at);
        t.messages.push(message.clone());
        Ok(())
    }

    fn messages_for(&self, conversation_id: Uuid) -> Result<Vec<Message>> {
        let mut rows: Vec<Message> = self
            .read()?
            .messages
            .iter()
            .filter(|m| m.conversation_id == conversation_id)
            .cloned()
            .collect();
        // stable sort keeps insertion order for equal timestamps
        rows.sort_by_key(|m| m.created_at);
        Ok(rows)
    }
}

fn same_mutable_state(a: &Gift, b: &Gift) -> bool {
    a.status == b.status
        && a.payment_id == b.payment_id
        && a.thank_you_message == b.thank_you_message
        && a.registered_at == b.registered_at
        && a.refunded_at == b.refunded_at
}

fn swap_gift(t: &mut Tables, current: &Gift, next: &Gift) -> bool {
    match t.gifts.iter_mut().find(|g| g.id == current.id) {
        Some(row) if same_mutable_state(row, current) => {
            // id, code, amount and parties are immutable after creation
            row.status = next.status;
            row.payment_id = next.payment_id;
            row.thank_you_message = next.thank_you_message.clone();
            row.registered_at = next.registered_at;
            row.refunded_at = next.refunded_at;
            true
        }
        _ => false,
    }
}
