//! Bridge between the (simulated) payment provider and the gift lifecycle.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use giftcoin_types::models::{Gift, GiftStatus, Payment, PaymentStatus};

use crate::error::{GiftError, Result};
use crate::lifecycle;

pub const DEFAULT_METHOD: &str = "card";

/// Open a payment for a pending gift. Returns the payment row and the gift
/// with `payment_id` stamped on it.
pub fn start(
    gift: &Gift,
    amount: Option<i64>,
    method: Option<String>,
    id: Uuid,
    now: DateTime<Utc>,
) -> Result<(Payment, Gift)> {
    let amount = amount.ok_or(GiftError::MissingField("amount"))?;
    if amount != gift.amount {
        return Err(GiftError::AmountMismatch {
            expected: gift.amount,
            actual: amount,
        });
    }
    if gift.status != GiftStatus::Pending {
        return Err(GiftError::NotPending);
    }

    let method = method
        .map(|m| m.trim().to_string())
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| DEFAULT_METHOD.to_string());

    let payment = Payment {
        id,
        gift_id: gift.id,
        amount,
        method,
        status: PaymentStatus::Pending,
        created_at: now,
        completed_at: None,
    };
    let gift = Gift {
        payment_id: Some(id),
        ..gift.clone()
    };
    Ok((payment, gift))
}

#[derive(Debug, Clone, PartialEq)]
pub enum Completion {
    /// The gift moves to `paid` and must be persisted.
    Paid(Gift),
    /// A repeated confirmation for a gift that is already paid.
    AlreadyPaid,
}

pub fn complete(gift: &Gift, now: DateTime<Utc>) -> Result<Completion> {
    match gift.status {
        GiftStatus::Pending => lifecycle::transition(gift, GiftStatus::Paid, now).map(Completion::Paid),
        GiftStatus::Paid => Ok(Completion::AlreadyPaid),
        _ => Err(GiftError::PaymentAlreadyProcessed),
    }
}
