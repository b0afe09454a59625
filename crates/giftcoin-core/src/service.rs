use std::sync::Arc;

use chrono::{DateTime, SubsecRound, Utc};
use tracing::{debug, info, warn};
use uuid::Uuid;

use giftcoin_types::models::{
    Conversation, ConversationStatus, Gift, GiftStatus, Identity, Message, Payment, SenderType,
};

use crate::cash::{self, CashLedger};
use crate::chat;
use crate::code;
use crate::error::{GiftError, Result};
use crate::lifecycle::{self, GiftDraft, GiftPatch};
use crate::payment::{self, Completion};
use crate::store::{ChatStore, GiftQuery, GiftStore};

/// Attempts at drawing a code that is not already taken.
const MAX_CODE_ATTEMPTS: usize = 8;

/// Current time at the precision the stores keep (microseconds).
pub fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

type CodeSource = Box<dyn Fn() -> String + Send + Sync>;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub refunded: usize,
    pub expired: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentOutcome {
    Completed,
    AlreadyCompleted,
}

/// Gift lifecycle operations over an injected [`GiftStore`].
pub struct GiftService {
    store: Arc<dyn GiftStore>,
    codes: CodeSource,
}

impl GiftService {
    pub fn new(store: Arc<dyn GiftStore>) -> Self {
        Self {
            store,
            codes: Box::new(code::generate),
        }
    }

    /// Replace the code generator, e.g. to force collisions in tests.
    pub fn with_code_source<F>(mut self, source: F) -> Self
    where
        F: Fn() -> String + Send + Sync + 'static,
    {
        self.codes = Box::new(source);
        self
    }

    pub fn create_gift(&self, draft: GiftDraft) -> Result<Gift> {
        self.create_gift_at(draft, now())
    }

    pub fn create_gift_at(&self, draft: GiftDraft, now: DateTime<Utc>) -> Result<Gift> {
        let mut gift = lifecycle::issue(draft, Uuid::new_v4(), (self.codes)(), now)?;

        let mut attempts = 1;
        while self.store.gift_by_code(&gift.code)?.is_some() {
            if attempts == MAX_CODE_ATTEMPTS {
                warn!("No free gift code after {} attempts", attempts);
                return Err(GiftError::CodeSpaceExhausted);
            }
            debug!("Gift code collision, drawing again");
            gift.code = (self.codes)();
            attempts += 1;
        }

        self.store.insert_gift(&gift)?;
        info!("Gift {} created: amount={} expires_at={}", gift.id, gift.amount, gift.expires_at);
        Ok(gift)
    }

    /// Look up by UUID, falling back to the (normalized) redemption code.
    pub fn get_gift(&self, id_or_code: &str) -> Result<Gift> {
        let input = id_or_code.trim();
        if let Ok(id) = input.parse::<Uuid>() {
            if let Some(gift) = self.store.gift_by_id(id)? {
                return Ok(gift);
            }
        }
        self.store
            .gift_by_code(&code::normalize(input))?
            .ok_or(GiftError::GiftNotFound)
    }

    pub fn list_gifts(&self, query: &GiftQuery) -> Result<Vec<Gift>> {
        Ok(self.store.list_gifts(query)?)
    }

    pub fn redeem(&self, code: &str) -> Result<Gift> {
        self.redeem_at(code, now())
    }

    /// Claim a gift by code. A rejected redemption writes nothing.
    pub fn redeem_at(&self, input: &str, now: DateTime<Utc>) -> Result<Gift> {
        if input.trim().is_empty() {
            return Err(GiftError::MissingCode);
        }
        let code = code::normalize(input);
        if !code::is_canonical(&code) {
            debug!("Redemption input is not a well-formed code");
            return Err(GiftError::InvalidCode);
        }
        let gift = self
            .store
            .gift_by_code(&code)?
            .ok_or(GiftError::InvalidCode)?;

        let registered = lifecycle::redeem(&gift, now).inspect_err(|e| {
            warn!("Redemption of gift {} rejected: {:?}", gift.id, e);
        })?;

        if self.store.compare_and_set(&gift, &registered)? {
            info!("Gift {} registered", gift.id);
            return Ok(registered);
        }

        // Lost a race with another writer; report the state it left behind.
        warn!("Gift {} changed during redemption", gift.id);
        let fresh = self
            .store
            .gift_by_id(gift.id)?
            .ok_or(GiftError::InvalidCode)?;
        lifecycle::check_redeemable(&fresh, now)?;
        Err(GiftError::AlreadyRegistered)
    }

    pub fn create_payment(
        &self,
        gift_id: Option<Uuid>,
        amount: Option<i64>,
        method: Option<String>,
    ) -> Result<Payment> {
        let gift_id = gift_id.ok_or(GiftError::MissingField("giftId"))?;
        let gift = self
            .store
            .gift_by_id(gift_id)?
            .ok_or(GiftError::GiftNotFound)?;

        let (payment, stamped) = payment::start(&gift, amount, method, Uuid::new_v4(), now())?;
        if !self.store.attach_payment(&gift, &stamped, &payment)? {
            warn!("Gift {} changed before payment {} was attached", gift.id, payment.id);
            return Err(GiftError::NotPending);
        }

        info!("Payment {} opened for gift {} via {}", payment.id, gift.id, payment.method);
        Ok(payment)
    }

    /// Confirm a payment. Unknown or malformed ids are reported as
    /// "payment not found".
    pub fn complete_payment(&self, payment_id: &str) -> Result<PaymentOutcome> {
        let payment_id: Uuid = payment_id
            .trim()
            .parse()
            .map_err(|_| GiftError::PaymentNotFound)?;
        let gift = self
            .store
            .gift_by_payment_id(payment_id)?
            .ok_or(GiftError::PaymentNotFound)?;

        let at = now();
        match payment::complete(&gift, at)? {
            Completion::AlreadyPaid => {
                debug!("Payment {} already completed", payment_id);
                Ok(PaymentOutcome::AlreadyCompleted)
            }
            Completion::Paid(paid) => {
                if !self.store.compare_and_set(&gift, &paid)? {
                    return match self.store.gift_by_id(gift.id)? {
                        Some(g) if g.status == GiftStatus::Paid => Ok(PaymentOutcome::AlreadyCompleted),
                        _ => Err(GiftError::PaymentAlreadyProcessed),
                    };
                }
                if !self.store.complete_payment_row(payment_id, at)? {
                    warn!("Payment row {} missing or not pending", payment_id);
                }
                info!("Gift {} paid (payment {})", gift.id, payment_id);
                Ok(PaymentOutcome::Completed)
            }
        }
    }

    pub fn cash(&self, identity: &Identity) -> Result<CashLedger> {
        if identity.is_empty() {
            return Ok(CashLedger::default());
        }
        let gifts = self.store.refunded_gifts_sent_by(identity)?;
        cash::ledger(&gifts, identity).inspect_err(|_| {
            warn!("Refund total overflowed for {} gifts", gifts.len());
        })
    }

    pub fn thank_you(&self, gift_id: Uuid, message: Option<String>) -> Result<Gift> {
        let gift = self
            .store
            .gift_by_id(gift_id)?
            .ok_or(GiftError::GiftNotFound)?;
        let next = lifecycle::attach_thank_you(&gift, message)?;
        let text = next.thank_you_message.as_deref().unwrap_or_default();

        if !self.store.set_thank_you(gift_id, text)? {
            return Err(GiftError::ThankYouAlreadySent);
        }
        info!("Thank-you note attached to gift {}", gift_id);
        Ok(next)
    }

    pub fn update_gift(&self, gift_id: Uuid, patch: GiftPatch) -> Result<Gift> {
        self.update_gift_at(gift_id, patch, now())
    }

    pub fn update_gift_at(&self, gift_id: Uuid, patch: GiftPatch, now: DateTime<Utc>) -> Result<Gift> {
        let gift = self
            .store
            .gift_by_id(gift_id)?
            .ok_or(GiftError::GiftNotFound)?;
        let next = lifecycle::apply_patch(&gift, patch, now)?;
        if next == gift {
            return Ok(gift);
        }

        if !self.store.compare_and_set(&gift, &next)? {
            warn!("Gift {} changed while an update was being applied", gift_id);
            return Err(GiftError::ConcurrentUpdate);
        }
        info!("Gift {} updated: {} -> {}", gift_id, gift.status, next.status);
        Ok(next)
    }

    pub fn sweep(&self) -> Result<SweepReport> {
        self.sweep_at(now())
    }

    /// Refund paid gifts and expire unpaid ones whose expiry has passed.
    pub fn sweep_at(&self, now: DateTime<Utc>) -> Result<SweepReport> {
        let mut report = SweepReport::default();

        for gift in self.store.gifts_expiring_before(now)? {
            let Some(target) = lifecycle::sweep_target(&gift, now) else {
                continue;
            };
            let next = lifecycle::transition(&gift, target, now)?;
            if !self.store.compare_and_set(&gift, &next)? {
                debug!("Gift {} moved on before the sweep reached it", gift.id);
                continue;
            }
            match target {
                GiftStatus::Refunded => report.refunded += 1,
                _ => report.expired += 1,
            }
            info!("Gift {} swept: {} -> {}", gift.id, gift.status, target);
        }

        Ok(report)
    }
}

/// Support inbox operations over an injected [`ChatStore`].
pub struct ChatService {
    store: Arc<dyn ChatStore>,
}

impl ChatService {
    pub fn new(store: Arc<dyn ChatStore>) -> Self {
        Self { store }
    }

    /// Return the user's open conversation, creating one if there is none.
    pub fn open_conversation(
        &self,
        user_name: Option<String>,
        user_email: Option<String>,
    ) -> Result<Conversation> {
        let draft = chat::new_conversation(user_name, user_email, Uuid::new_v4(), now())?;

        let existing = self
            .store
            .open_conversations()?
            .into_iter()
            .find(|c| chat::same_user(c, &draft.user_name, draft.user_email.as_deref()));
        if let Some(conversation) = existing {
            return Ok(conversation);
        }

        self.store.insert_conversation(&draft)?;
        info!("Conversation {} opened", draft.id);
        Ok(draft)
    }

    pub fn list_conversations(&self) -> Result<Vec<Conversation>> {
        let mut conversations = self.store.list_conversations()?;
        conversations.sort_by(chat::inbox_order);
        Ok(conversations)
    }

    pub fn close_conversation(&self, id: Uuid) -> Result<Conversation> {
        if !self.store.set_conversation_status(id, ConversationStatus::Closed)? {
            return Err(GiftError::ConversationNotFound);
        }
        self.store
            .conversation_by_id(id)?
            .ok_or(GiftError::ConversationNotFound)
    }

    pub fn send_message(
        &self,
        conversation_id: Uuid,
        sender_type: Option<SenderType>,
        content: Option<String>,
    ) -> Result<Message> {
        let conversation = self
            .store
            .conversation_by_id(conversation_id)?
            .ok_or(GiftError::ConversationNotFound)?;
        let message = chat::new_message(conversation_id, sender_type, content, Uuid::new_v4(), now())?;

        self.store.insert_message(&message, &chat::preview(&message.content))?;

        if conversation.status == ConversationStatus::Closed && message.sender_type == SenderType::User {
            self.store
                .set_conversation_status(conversation_id, ConversationStatus::Open)?;
            info!("Conversation {} reopened by user", conversation_id);
        }
        Ok(message)
    }

    pub fn messages(&self, conversation_id: Uuid) -> Result<Vec<Message>> {
        if self.store.conversation_by_id(conversation_id)?.is_none() {
            return Err(GiftError::ConversationNotFound);
        }
        Ok(self.store.messages_for(conversation_id)?)
    }
}
