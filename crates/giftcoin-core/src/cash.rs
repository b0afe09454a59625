//! Cash balance derived from refunded gifts. Nothing here is persisted; the
//! ledger is rebuilt from gift rows on every query.

use giftcoin_types::models::{CashEntry, CashEntryType, Gift, GiftStatus, Identity};

use crate::error::{GiftError, Result};

pub const REFUND_DESCRIPTION: &str = "선물 환불";

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CashLedger {
    pub history: Vec<CashEntry>,
    pub total: i64,
}

/// Build the ledger for `identity` as a sender. Rows that are not refunded or
/// belong to someone else are ignored, so callers may pass a superset.
///
/// Fails with [`GiftError::CashOverflow`] rather than wrapping if the stored
/// amounts cannot be summed.
pub fn ledger<'a, I>(gifts: I, identity: &Identity) -> Result<CashLedger>
where
    I: IntoIterator<Item = &'a Gift>,
{
    if identity.is_empty() {
        return Ok(CashLedger::default());
    }

    let history: Vec<CashEntry> = gifts
        .into_iter()
        .filter(|g| g.status == GiftStatus::Refunded)
        .filter(|g| identity.matches(g.sender_phone.as_deref(), g.sender_email.as_deref()))
        .map(|g| CashEntry {
            id: g.id,
            amount: g.amount,
            entry_type: CashEntryType::Refund,
            description: REFUND_DESCRIPTION.to_string(),
            related_gift_id: g.id,
            created_at: g.refunded_at.unwrap_or(g.created_at),
        })
        .collect();

    let total = history
        .iter()
        .try_fold(0i64, |acc, e| acc.checked_add(e.amount))
        .ok_or(GiftError::CashOverflow)?;
    Ok(CashLedger { history, total })
}
