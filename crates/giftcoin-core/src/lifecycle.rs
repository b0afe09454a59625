//! Gift state machine.
//!
//! ```text
//!   create ──> pending ──payment──> paid ──redeem──> registered ──thank-you──> registered
//!                 │                   │
//!                 └──── sweep ────────┴──> refunded | expired
//! ```
//!
//! Every function here is pure: it takes the current row and `now`, and either
//! returns the row as it should be persisted or a [`GiftError`]. Persisting the
//! result is the caller's job, through a status compare-and-set.

use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use giftcoin_types::models::{Gift, GiftStatus};

use crate::error::{GiftError, Result};

/// Smallest purchasable amount, in currency units.
pub const MIN_AMOUNT: i64 = 1000;

/// Largest purchasable amount. Keeps refund totals far from `i64` overflow.
pub const MAX_AMOUNT: i64 = 10_000_000;

/// Gifts expire this long after creation.
pub const GIFT_TTL_DAYS: i64 = 30;

pub fn gift_ttl() -> Duration {
    Duration::days(GIFT_TTL_DAYS)
}

/// Unvalidated creation input.
#[derive(Debug, Clone, Default)]
pub struct GiftDraft {
    pub amount: Option<i64>,
    pub sender_name: Option<String>,
    pub sender_phone: Option<String>,
    pub sender_email: Option<String>,
    pub receiver_name: Option<String>,
    pub receiver_phone: Option<String>,
    pub receiver_email: Option<String>,
    pub message: Option<String>,
}

fn trimmed(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Validate a draft and build the `pending` row.
pub fn issue(draft: GiftDraft, id: Uuid, code: String, now: DateTime<Utc>) -> Result<Gift> {
    let amount = draft.amount.ok_or(GiftError::MissingField("amount"))?;
    let sender_name = trimmed(draft.sender_name).ok_or(GiftError::MissingField("senderName"))?;
    let receiver_name =
        trimmed(draft.receiver_name).ok_or(GiftError::MissingField("receiverName"))?;

    if amount < MIN_AMOUNT {
        return Err(GiftError::AmountTooSmall {
            amount,
            min: MIN_AMOUNT,
        });
    }
    if amount > MAX_AMOUNT {
        return Err(GiftError::AmountTooLarge {
            amount,
            max: MAX_AMOUNT,
        });
    }

    Ok(Gift {
        id,
        code,
        amount,
        sender_name,
        sender_phone: trimmed(draft.sender_phone),
        sender_email: trimmed(draft.sender_email),
        receiver_name,
        receiver_phone: trimmed(draft.receiver_phone),
        receiver_email: trimmed(draft.receiver_email),
        message: trimmed(draft.message),
        status: GiftStatus::Pending,
        payment_id: None,
        thank_you_message: None,
        created_at: now,
        expires_at: now + gift_ttl(),
        registered_at: None,
        refunded_at: None,
    })
}

pub fn is_past_expiry(gift: &Gift, now: DateTime<Utc>) -> bool {
    now >= gift.expires_at
}

/// Reason a gift cannot be redeemed right now, checked in the order the
/// receiver should hear about it.
pub fn check_redeemable(gift: &Gift, now: DateTime<Utc>) -> Result<()> {
    match gift.status {
        GiftStatus::Registered => Err(GiftError::AlreadyRegistered),
        GiftStatus::Refunded => Err(GiftError::Refunded),
        GiftStatus::Expired => Err(GiftError::Expired),
        _ if is_past_expiry(gift, now) => Err(GiftError::Expired),
        GiftStatus::Pending => Err(GiftError::NotPaid),
        GiftStatus::Paid => Ok(()),
    }
}

/// `paid` -> `registered`.
pub fn redeem(gift: &Gift, now: DateTime<Utc>) -> Result<Gift> {
    check_redeemable(gift, now)?;
    Ok(Gift {
        status: GiftStatus::Registered,
        registered_at: Some(now),
        ..gift.clone()
    })
}

/// Whether `from -> to` is an edge of the state machine. Only a paid gift
/// can be refunded and only an unpaid one can expire.
pub fn can_transition(from: GiftStatus, to: GiftStatus) -> bool {
    use GiftStatus::*;
    if from.is_terminal() {
        return false;
    }
    matches!(
        (from, to),
        (Pending, Paid) | (Pending, Expired) | (Paid, Registered) | (Paid, Refunded)
    )
}

/// Move to `to` and keep the timestamp columns consistent with the status.
///
/// Refunds and expiries are only reachable once the gift's expiry has passed,
/// whoever asks for them.
pub fn transition(gift: &Gift, to: GiftStatus, now: DateTime<Utc>) -> Result<Gift> {
    if !can_transition(gift.status, to) {
        return Err(GiftError::InvalidTransition {
            from: gift.status,
            to,
        });
    }
    if matches!(to, GiftStatus::Refunded | GiftStatus::Expired) && !is_past_expiry(gift, now) {
        return Err(GiftError::NotYetExpired(to));
    }

    let mut next = gift.clone();
    next.status = to;
    match to {
        GiftStatus::Registered => next.registered_at = Some(now),
        GiftStatus::Refunded => next.refunded_at = Some(now),
        _ => {}
    }
    Ok(next)
}

/// Where the sweep sends a gift, if anywhere. Paid gifts are refunded to the
/// sender; unpaid ones simply expire.
pub fn sweep_target(gift: &Gift, now: DateTime<Utc>) -> Option<GiftStatus> {
    if !is_past_expiry(gift, now) {
        return None;
    }
    match gift.status {
        GiftStatus::Paid => Some(GiftStatus::Refunded),
        GiftStatus::Pending => Some(GiftStatus::Expired),
        _ => None,
    }
}

pub fn attach_thank_you(gift: &Gift, message: Option<String>) -> Result<Gift> {
    if gift.status != GiftStatus::Registered {
        return Err(GiftError::NotRegistered);
    }
    if gift.thank_you_message.is_some() {
        return Err(GiftError::ThankYouAlreadySent);
    }
    let message = trimmed(message).ok_or(GiftError::MissingField("message"))?;
    Ok(Gift {
        thank_you_message: Some(message),
        ..gift.clone()
    })
}

/// Administrative partial update.
#[derive(Debug, Clone, Default)]
pub struct GiftPatch {
    pub status: Option<GiftStatus>,
    pub thank_you_message: Option<String>,
    pub registered_at: Option<DateTime<Utc>>,
    pub payment_id: Option<Uuid>,
}

/// Apply a patch without ever breaking the row invariants: status changes
/// follow [`can_transition`], `registered_at` is only meaningful on a
/// registered gift and a payment id can only be attached while pending.
pub fn apply_patch(gift: &Gift, patch: GiftPatch, now: DateTime<Utc>) -> Result<Gift> {
    let mut next = gift.clone();

    if let Some(payment_id) = patch.payment_id {
        if next.status != GiftStatus::Pending {
            return Err(GiftError::NotPending);
        }
        next.payment_id = Some(payment_id);
    }

    if let Some(to) = patch.status {
        if to != next.status {
            next = transition(&next, to, now)?;
        }
    }

    if let Some(registered_at) = patch.registered_at {
        if next.status != GiftStatus::Registered {
            return Err(GiftError::RegisteredAtWithoutRegistration);
        }
        next.registered_at = Some(registered_at);
    }

    if patch.thank_you_message.is_some() {
        next = attach_thank_you(&next, patch.thank_you_message)?;
    }

    Ok(next)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap()
    }

    fn draft(amount: i64) -> GiftDraft {
        GiftDraft {
            amount: Some(amount),
            sender_name: Some("A".into()),
            receiver_name: Some("B".into()),
            ..Default::default()
        }
    }

    fn gift_in(status: GiftStatus) -> Gift {
        let mut g = issue(draft(10_000), Uuid::new_v4(), "AB3D-EF9H-JK2M".into(), t0()).unwrap();
        g.status = status;
        if status == GiftStatus::Registered {
            g.registered_at = Some(t0());
        }
        g
    }

    #[test]
    fn issue_sets_pending_and_fixed_expiry() {
        let g = issue(draft(10_000), Uuid::new_v4(), "AB3D-EF9H-JK2M".into(), t0()).unwrap();
        assert_eq!(g.status, GiftStatus::Pending);
        assert_eq!(g.expires_at - g.created_at, Duration::days(30));
        assert!(g.registered_at.is_none());
    }

    #[test]
    fn issue_rejects_small_amounts_and_missing_names() {
        assert!(matches!(
            issue(draft(500), Uuid::new_v4(), "X".into(), t0()),
            Err(GiftError::AmountTooSmall { amount: 500, min: 1000 })
        ));
        assert!(issue(draft(MIN_AMOUNT), Uuid::new_v4(), "X".into(), t0()).is_ok());
        assert!(issue(draft(MAX_AMOUNT), Uuid::new_v4(), "X".into(), t0()).is_ok());
        assert!(matches!(
            issue(draft(i64::MAX), Uuid::new_v4(), "X".into(), t0()),
            Err(GiftError::AmountTooLarge { max: MAX_AMOUNT, .. })
        ));

        let mut d = draft(5000);
        d.sender_name = Some("   ".into());
        assert!(matches!(
            issue(d, Uuid::new_v4(), "X".into(), t0()),
            Err(GiftError::MissingField("senderName"))
        ));

        let d = GiftDraft {
            receiver_name: Some("B".into()),
            sender_name: Some("A".into()),
            ..Default::default()
        };
        assert!(matches!(
            issue(d, Uuid::new_v4(), "X".into(), t0()),
            Err(GiftError::MissingField("amount"))
        ));
    }

    #[test]
    fn redeem_paid_gift_before_expiry() {
        let g = gift_in(GiftStatus::Paid);
        let now = t0() + Duration::days(3);
        let r = redeem(&g, now).unwrap();
        assert_eq!(r.status, GiftStatus::Registered);
        assert_eq!(r.registered_at, Some(now));
        assert_eq!(r.expires_at, g.expires_at);
    }

    #[test]
    fn redeem_check_order() {
        let late = t0() + Duration::days(45);

        // registered and refunded win over expiry
        assert!(matches!(redeem(&gift_in(GiftStatus::Registered), late), Err(GiftError::AlreadyRegistered)));
        assert!(matches!(redeem(&gift_in(GiftStatus::Refunded), late), Err(GiftError::Refunded)));
        assert!(matches!(redeem(&gift_in(GiftStatus::Refunded), t0()), Err(GiftError::Refunded)));

        assert!(matches!(redeem(&gift_in(GiftStatus::Expired), t0()), Err(GiftError::Expired)));
        assert!(matches!(redeem(&gift_in(GiftStatus::Paid), late), Err(GiftError::Expired)));
        // expiry is reported before the missing payment
        assert!(matches!(redeem(&gift_in(GiftStatus::Pending), late), Err(GiftError::Expired)));
        assert!(matches!(redeem(&gift_in(GiftStatus::Pending), t0()), Err(GiftError::NotPaid)));
    }

    #[test]
    fn expiry_boundary_is_exclusive_for_redemption() {
        let g = gift_in(GiftStatus::Paid);
        assert!(redeem(&g, g.expires_at - Duration::seconds(1)).is_ok());
        assert!(matches!(redeem(&g, g.expires_at), Err(GiftError::Expired)));
    }

    #[test]
    fn sweep_targets() {
        let late = t0() + Duration::days(30);
        assert_eq!(sweep_target(&gift_in(GiftStatus::Paid), late), Some(GiftStatus::Refunded));
        assert_eq!(sweep_target(&gift_in(GiftStatus::Pending), late), Some(GiftStatus::Expired));
        assert_eq!(sweep_target(&gift_in(GiftStatus::Registered), late), None);
        assert_eq!(sweep_target(&gift_in(GiftStatus::Paid), t0()), None);
    }

    #[test]
    fn terminal_states_have_no_exits() {
        for from in [GiftStatus::Registered, GiftStatus::Refunded, GiftStatus::Expired] {
            for to in GiftStatus::ALL {
                assert!(!can_transition(from, to), "{from} -> {to}");
            }
        }
        assert!(!can_transition(GiftStatus::Pending, GiftStatus::Registered));
    }

    #[test]
    fn unpaid_gifts_never_refund_and_paid_gifts_never_expire() {
        assert!(!can_transition(GiftStatus::Pending, GiftStatus::Refunded));
        assert!(!can_transition(GiftStatus::Paid, GiftStatus::Expired));

        let late = t0() + Duration::days(31);
        assert!(matches!(
            transition(&gift_in(GiftStatus::Pending), GiftStatus::Refunded, late),
            Err(GiftError::InvalidTransition { from: GiftStatus::Pending, to: GiftStatus::Refunded })
        ));
        assert!(matches!(
            transition(&gift_in(GiftStatus::Paid), GiftStatus::Expired, late),
            Err(GiftError::InvalidTransition { .. })
        ));
    }

    #[test]
    fn refund_and_expiry_wait_for_the_deadline() {
        let paid = gift_in(GiftStatus::Paid);
        let early = paid.expires_at - Duration::seconds(1);
        assert!(matches!(
            transition(&paid, GiftStatus::Refunded, early),
            Err(GiftError::NotYetExpired(GiftStatus::Refunded))
        ));
        assert!(transition(&paid, GiftStatus::Refunded, paid.expires_at).is_ok());

        let pending = gift_in(GiftStatus::Pending);
        let patch = GiftPatch {
            status: Some(GiftStatus::Expired),
            ..Default::default()
        };
        assert!(matches!(
            apply_patch(&pending, patch.clone(), t0()),
            Err(GiftError::NotYetExpired(GiftStatus::Expired))
        ));
        let expired = apply_patch(&pending, patch, pending.expires_at).unwrap();
        assert_eq!(expired.status, GiftStatus::Expired);
    }

    #[test]
    fn refund_records_timestamp() {
        let now = t0() + Duration::days(31);
        let r = transition(&gift_in(GiftStatus::Paid), GiftStatus::Refunded, now).unwrap();
        assert_eq!(r.refunded_at, Some(now));
        assert!(r.registered_at.is_none());
    }

    #[test]
    fn thank_you_only_once_and_only_when_registered() {
        assert!(matches!(
            attach_thank_you(&gift_in(GiftStatus::Paid), Some("thanks".into())),
            Err(GiftError::NotRegistered)
        ));

        let g = attach_thank_you(&gift_in(GiftStatus::Registered), Some(" thanks! ".into())).unwrap();
        assert_eq!(g.thank_you_message.as_deref(), Some("thanks!"));
        assert_eq!(g.status, GiftStatus::Registered);

        assert!(matches!(
            attach_thank_you(&g, Some("again".into())),
            Err(GiftError::ThankYouAlreadySent)
        ));
        assert!(matches!(
            attach_thank_you(&gift_in(GiftStatus::Registered), Some("".into())),
            Err(GiftError::MissingField("message"))
        ));
    }

    #[test]
    fn patch_keeps_registered_at_in_step_with_status() {
        let g = gift_in(GiftStatus::Paid);
        let at = t0() + Duration::days(2);
        let now = t0() + Duration::days(3);

        let patched = apply_patch(
            &g,
            GiftPatch {
                status: Some(GiftStatus::Registered),
                registered_at: Some(at),
                ..Default::default()
            },
            now,
        )
        .unwrap();
        assert_eq!(patched.registered_at, Some(at));

        let defaulted = apply_patch(
            &g,
            GiftPatch {
                status: Some(GiftStatus::Registered),
                ..Default::default()
            },
            now,
        )
        .unwrap();
        assert_eq!(defaulted.registered_at, Some(now));

        assert!(matches!(
            apply_patch(
                &g,
                GiftPatch {
                    registered_at: Some(at),
                    ..Default::default()
                },
                now
            ),
            Err(GiftError::RegisteredAtWithoutRegistration)
        ));
    }

    #[test]
    fn patch_rejects_illegal_moves() {
        let g = gift_in(GiftStatus::Registered);
        assert!(matches!(
            apply_patch(
                &g,
                GiftPatch {
                    status: Some(GiftStatus::Paid),
                    ..Default::default()
                },
                t0()
            ),
            Err(GiftError::InvalidTransition { .. })
        ));
        assert!(matches!(
            apply_patch(
                &gift_in(GiftStatus::Paid),
                GiftPatch {
                    payment_id: Some(Uuid::new_v4()),
                    ..Default::default()
                },
                t0()
            ),
            Err(GiftError::NotPending)
        ));
    }
}
