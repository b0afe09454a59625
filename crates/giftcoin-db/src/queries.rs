use anyhow::{Result, anyhow};
use chrono::{DateTime, Utc};
use rusqlite::{Connection, params};
use uuid::Uuid;

use giftcoin_core::store::{ChatStore, GiftQuery, GiftStore};
use giftcoin_types::models::{
    Conversation, ConversationStatus, Gift, Identity, Message, Payment, PaymentStatus,
};

use crate::Database;
use crate::models::{
    CONVERSATION_COLUMNS, ConversationRow, GIFT_COLUMNS, GiftRow, MESSAGE_COLUMNS, MessageRow,
    PAYMENT_COLUMNS, PaymentRow, ts,
};

impl GiftStore for Database {
    fn insert_gift(&self, gift: &Gift) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                &format!(
                    "INSERT INTO gifts ({GIFT_COLUMNS})
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17)"
                ),
                params![
                    gift.id.to_string(),
                    gift.code,
                    gift.amount,
                    gift.sender_name,
                    gift.sender_phone,
                    gift.sender_email,
                    gift.receiver_name,
                    gift.receiver_phone,
                    gift.receiver_email,
                    gift.message,
                    gift.status.as_str(),
                    gift.payment_id.map(|p| p.to_string()),
                    gift.thank_you_message,
                    ts(gift.created_at),
                    ts(gift.expires_at),
                    gift.registered_at.map(ts),
                    gift.refunded_at.map(ts),
                ],
            )?;
            Ok(())
        })
    }

    fn gift_by_id(&self, id: Uuid) -> Result<Option<Gift>> {
        self.with_conn(|conn| query_one_gift(conn, "id = ?1", &id.to_string()))
    }

    fn gift_by_code(&self, code: &str) -> Result<Option<Gift>> {
        self.with_conn(|conn| query_one_gift(conn, "code = ?1", code))
    }

    fn gift_by_payment_id(&self, payment_id: Uuid) -> Result<Option<Gift>> {
        self.with_conn(|conn| query_one_gift(conn, "payment_id = ?1", &payment_id.to_string()))
    }

    fn list_gifts(&self, query: &GiftQuery) -> Result<Vec<Gift>> {
        self.with_conn(|conn| match query {
            GiftQuery::All => query_gifts(conn, "1 = 1", params![]),
            GiftQuery::SentBy(who) => query_gifts(
                conn,
                "sender_phone = ?1 OR sender_email = ?2",
                params![who.phone, who.email],
            ),
            GiftQuery::ReceivedBy(who) => query_gifts(
                conn,
                "receiver_phone = ?1 OR receiver_email = ?2",
                params![who.phone, who.email],
            ),
        })
    }

    fn compare_and_set(&self, current: &Gift, next: &Gift) -> Result<bool> {
        self.with_conn(|conn| swap_gift(conn, current, next))
    }

    fn set_thank_you(&self, id: Uuid, message: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE gifts SET thank_you_message = ?1
                 WHERE id = ?2 AND status = 'registered' AND thank_you_message IS NULL",
                params![message, id.to_string()],
            )?;
            Ok(changed == 1)
        })
    }

    fn gifts_expiring_before(&self, now: DateTime<Utc>) -> Result<Vec<Gift>> {
        self.with_conn(|conn| {
            query_gifts(
                conn,
                "status IN ('pending', 'paid') AND expires_at <= ?1",
                params![ts(now)],
            )
        })
    }

    fn refunded_gifts_sent_by(&self, identity: &Identity) -> Result<Vec<Gift>> {
        self.with_conn(|conn| {
            query_gifts(
                conn,
                "status = 'refunded' AND (sender_phone = ?1 OR sender_email = ?2)",
                params![identity.phone, identity.email],
            )
        })
    }

    fn attach_payment(&self, current: &Gift, stamped: &Gift, payment: &Payment) -> Result<bool> {
        self.with_tx(|tx| {
            if !swap_gift(tx, current, stamped)? {
                return Ok(false);
            }
            insert_payment(tx, payment)?;
            Ok(true)
        })
    }

    fn payment_by_id(&self, id: Uuid) -> Result<Option<Payment>> {
        self.with_conn(|conn| {
            conn.query_row(
                &format!("SELECT {PAYMENT_COLUMNS} FROM payments WHERE id = ?1"),
                [id.to_string()],
                PaymentRow::from_row,
            )
            .optional()?
            .map(PaymentRow::into_payment)
            .transpose()
        })
    }

    fn complete_payment_row(&self, id: Uuid, at: DateTime<Utc>) -> Result<bool> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE payments SET status = ?1, completed_at = ?2 WHERE id = ?3 AND status = ?4",
                params![
                    PaymentStatus::Completed.as_str(),
                    ts(at),
                    id.to_string(),
                    PaymentStatus::Pending.as_str(),
                ],
            )?;
            Ok(changed == 1)
        })
    }
}

impl ChatStore for Database {
    fn insert_conversation(&self, conversation: &Conversation) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                &format!("INSERT INTO conversations ({CONVERSATION_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)"),
                params![
                    conversation.id.to_string(),
                    conversation.user_name,
                    conversation.user_email,
                    conversation.status.as_str(),
                    conversation.last_message,
                    conversation.last_message_at.map(ts),
                    ts(conversation.created_at),
                ],
            )?;
            Ok(())
        })
    }

    fn conversation_by_id(&self, id: Uuid) -> Result<Option<Conversation>> {
        self.with_conn(|conn| {
            conn.query_row(
                &format!("SELECT {CONVERSATION_COLUMNS} FROM conversations WHERE id = ?1"),
                [id.to_string()],
                ConversationRow::from_row,
            )
            .optional()?
            .map(ConversationRow::into_conversation)
            .transpose()
        })
    }

    fn open_conversations(&self) -> Result<Vec<Conversation>> {
        self.with_conn(|conn| query_conversations(conn, Some(ConversationStatus::Open)))
    }

    fn list_conversations(&self) -> Result<Vec<Conversation>> {
        self.with_conn(|conn| query_conversations(conn, None))
    }

    fn set_conversation_status(&self, id: Uuid, status: ConversationStatus) -> Result<bool> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE conversations SET status = ?1 WHERE id = ?2",
                params![status.as_str(), id.to_string()],
            )?;
            Ok(changed == 1)
        })
    }

    fn insert_message(&self, message: &Message, preview: &str) -> Result<()> {
        self.with_tx(|tx| {
            tx.execute(
                &format!("INSERT INTO messages ({MESSAGE_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5)"),
                params![
                    message.id.to_string(),
                    message.conversation_id.to_string(),
                    message.sender_type.as_str(),
                    message.content,
                    ts(message.created_at),
                ],
            )?;
            let changed = tx.execute(
                "UPDATE conversations SET last_message = ?1, last_message_at = ?2 WHERE id = ?3",
                params![preview, ts(message.created_at), message.conversation_id.to_string()],
            )?;
            if changed != 1 {
                return Err(anyhow!("conversation {} not found", message.conversation_id));
            }
            Ok(())
        })
    }

    fn messages_for(&self, conversation_id: Uuid) -> Result<Vec<Message>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {MESSAGE_COLUMNS} FROM messages
                 WHERE conversation_id = ?1
                 ORDER BY created_at ASC, rowid ASC"
            ))?;
            let rows = stmt
                .query_map([conversation_id.to_string()], MessageRow::from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            rows.into_iter().map(MessageRow::into_message).collect()
        })
    }
}

fn query_one_gift(conn: &Connection, predicate: &str, value: &str) -> Result<Option<Gift>> {
    let mut stmt = conn.prepare(&format!("SELECT {GIFT_COLUMNS} FROM gifts WHERE {predicate}"))?;
    stmt.query_row([value], GiftRow::from_row)
        .optional()?
        .map(GiftRow::into_gift)
        .transpose()
}

/// Gifts matching `predicate`, newest first.
fn query_gifts(conn: &Connection, predicate: &str, args: &[&dyn rusqlite::ToSql]) -> Result<Vec<Gift>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {GIFT_COLUMNS} FROM gifts WHERE {predicate} ORDER BY created_at DESC"
    ))?;
    let rows = stmt
        .query_map(args, GiftRow::from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    rows.into_iter().map(GiftRow::into_gift).collect()
}

fn query_conversations(conn: &Connection, status: Option<ConversationStatus>) -> Result<Vec<Conversation>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {CONVERSATION_COLUMNS} FROM conversations
         WHERE ?1 IS NULL OR status = ?1
         ORDER BY COALESCE(last_message_at, created_at) DESC"
    ))?;
    let rows = stmt
        .query_map([status.map(|s| s.as_str())], ConversationRow::from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    rows.into_iter().map(ConversationRow::into_conversation).collect()
}

/// Extension trait for optional query results
trait OptionalExt<T> {
    fn optional(self) -> Result<Option<T>>;
}

/// Conditional update of the mutable columns. `IS` keeps the NULL columns
/// comparable, so a note or payment stamp written since `current` was read
/// makes this a no-op.
fn swap_gift(conn: &Connection, current: &Gift, next: &Gift) -> Result<bool> {
    let changed = conn.execute(
        "UPDATE gifts
         SET status = ?1, payment_id = ?2, thank_you_message = ?3,
             registered_at = ?4, refunded_at = ?5
         WHERE id = ?6 AND status = ?7 AND payment_id IS ?8
           AND thank_you_message IS ?9 AND registered_at IS ?10 AND refunded_at IS ?11",
        params![
            next.status.as_str(),
            next.payment_id.map(|p| p.to_string()),
            next.thank_you_message,
            next.registered_at.map(ts),
            next.refunded_at.map(ts),
            current.id.to_string(),
            current.status.as_str(),
            current.payment_id.map(|p| p.to_string()),
            current.thank_you_message,
            current.registered_at.map(ts),
            current.refunded_at.map(ts),
        ],
    )?;
    Ok(changed == 1)
}

fn insert_payment(conn: &Connection, payment: &Payment) -> Result<()> {
    conn.execute(
        &format!("INSERT INTO payments ({PAYMENT_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)"),
        params![
            payment.id.to_string(),
            payment.gift_id.to_string(),
            payment.amount,
            payment.method,
            payment.status.as_str(),
            ts(payment.created_at),
            payment.completed_at.map(ts),
        ],
    )?;
    Ok(())
}

impl<T> OptionalExt<T> for std::result::Result<T, rusqlite::Error> {
    fn optional(self) -> Result<Option<T>> {
        match self {
            Ok(val) => Ok(Some(val)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use giftcoin_core::lifecycle::{self, GiftDraft};
    use giftcoin_core::service::now;
    use giftcoin_types::models::{GiftStatus, SenderType};

    fn gift(code: &str, phone: &str) -> Gift {
        let draft = GiftDraft {
            amount: Some(10_000),
            sender_name: Some("A".into()),
            sender_phone: Some(phone.into()),
            receiver_name: Some("B".into()),
            receiver_email: Some("b@x.kr".into()),
            ..Default::default()
        };
        lifecycle::issue(draft, Uuid::new_v4(), code.into(), now()).unwrap()
    }

    #[test]
    fn gift_roundtrips_through_sqlite() {
        let db = Database::open_in_memory().unwrap();
        let g = gift("AB3D-EF9H-JK2M", "010-1");
        db.insert_gift(&g).unwrap();

        assert_eq!(db.gift_by_id(g.id).unwrap(), Some(g.clone()));
        assert_eq!(db.gift_by_code("AB3D-EF9H-JK2M").unwrap(), Some(g.clone()));
        assert!(db.gift_by_code("AB3D-EF9H-JK2N").unwrap().is_none());
    }

    #[test]
    fn code_is_unique() {
        let db = Database::open_in_memory().unwrap();
        db.insert_gift(&gift("AB3D-EF9H-JK2M", "010-1")).unwrap();
        assert!(db.insert_gift(&gift("AB3D-EF9H-JK2M", "010-2")).is_err());
    }

    #[test]
    fn compare_and_set_requires_expected_status() {
        let db = Database::open_in_memory().unwrap();
        let mut g = gift("AB3D-EF9H-JK2M", "010-1");
        g.status = GiftStatus::Paid;
        db.insert_gift(&g).unwrap();

        let registered = lifecycle::redeem(&g, now()).unwrap();
        assert!(db.compare_and_set(&g, &registered).unwrap());
        assert!(!db.compare_and_set(&g, &registered).unwrap());
        assert_eq!(db.gift_by_id(g.id).unwrap().unwrap(), registered);
    }

    #[test]
    fn compare_and_set_sees_a_concurrent_thank_you() {
        let db = Database::open_in_memory().unwrap();
        let mut g = gift("AB3D-EF9H-JK2M", "010-1");
        g.status = GiftStatus::Registered;
        g.registered_at = Some(now());
        db.insert_gift(&g).unwrap();

        let stale = db.gift_by_id(g.id).unwrap().unwrap();
        assert!(db.set_thank_you(g.id, "고마워요").unwrap());

        let backdated = Gift {
            registered_at: Some(now() - Duration::days(1)),
            ..stale.clone()
        };
        assert!(!db.compare_and_set(&stale, &backdated).unwrap());
        let row = db.gift_by_id(g.id).unwrap().unwrap();
        assert_eq!(row.thank_you_message.as_deref(), Some("고마워요"));
        assert_eq!(row.registered_at, stale.registered_at);
    }

    #[test]
    fn registered_at_check_constraint_holds() {
        let db = Database::open_in_memory().unwrap();
        let mut g = gift("AB3D-EF9H-JK2M", "010-1");
        g.status = GiftStatus::Paid;
        db.insert_gift(&g).unwrap();

        // registered without a timestamp violates the row invariant
        let broken = Gift {
            status: GiftStatus::Registered,
            ..g.clone()
        };
        assert!(db.compare_and_set(&g, &broken).is_err());
        assert_eq!(db.gift_by_id(g.id).unwrap().unwrap().status, GiftStatus::Paid);
    }

    #[test]
    fn expiry_scan_and_party_filters() {
        let db = Database::open_in_memory().unwrap();
        let g = gift("AB3D-EF9H-JK2M", "010-1");
        db.insert_gift(&g).unwrap();

        assert!(db.gifts_expiring_before(g.expires_at - Duration::seconds(1)).unwrap().is_empty());
        assert_eq!(db.gifts_expiring_before(g.expires_at).unwrap().len(), 1);

        let sender = Identity::new(Some("010-1".into()), None);
        assert_eq!(db.list_gifts(&GiftQuery::SentBy(sender.clone())).unwrap().len(), 1);
        assert!(db.refunded_gifts_sent_by(&sender).unwrap().is_empty());
        let receiver = Identity::new(None, Some("b@x.kr".into()));
        assert_eq!(db.list_gifts(&GiftQuery::ReceivedBy(receiver)).unwrap().len(), 1);
    }

    fn pending_payment(g: &Gift) -> Payment {
        Payment {
            id: Uuid::new_v4(),
            gift_id: g.id,
            amount: g.amount,
            method: "card".into(),
            status: PaymentStatus::Pending,
            created_at: now(),
            completed_at: None,
        }
    }

    #[test]
    fn attach_payment_is_all_or_nothing() {
        let db = Database::open_in_memory().unwrap();
        let g = gift("AB3D-EF9H-JK2M", "010-1");
        db.insert_gift(&g).unwrap();

        let first = pending_payment(&g);
        let stamped = Gift {
            payment_id: Some(first.id),
            ..g.clone()
        };
        assert!(db.attach_payment(&g, &stamped, &first).unwrap());

        // a second request still holding the unstamped row loses
        let second = pending_payment(&g);
        let restamped = Gift {
            payment_id: Some(second.id),
            ..g.clone()
        };
        assert!(!db.attach_payment(&g, &restamped, &second).unwrap());
        assert!(db.payment_by_id(second.id).unwrap().is_none());
        assert_eq!(db.gift_by_id(g.id).unwrap().unwrap().payment_id, Some(first.id));
    }

    #[test]
    fn payment_completes_once() {
        let db = Database::open_in_memory().unwrap();
        let g = gift("AB3D-EF9H-JK2M", "010-1");
        db.insert_gift(&g).unwrap();
        let payment = pending_payment(&g);
        let stamped = Gift {
            payment_id: Some(payment.id),
            ..g.clone()
        };
        assert!(db.attach_payment(&g, &stamped, &payment).unwrap());

        assert!(db.complete_payment_row(payment.id, now()).unwrap());
        assert!(!db.complete_payment_row(payment.id, now()).unwrap());
        let stored = db.payment_by_id(payment.id).unwrap().unwrap();
        assert_eq!(stored.status, PaymentStatus::Completed);
    }

    #[test]
    fn messages_keep_insertion_order_and_update_preview() {
        let db = Database::open_in_memory().unwrap();
        let at = now();
        let conversation = Conversation {
            id: Uuid::new_v4(),
            user_name: "Kim".into(),
            user_email: None,
            status: ConversationStatus::Open,
            last_message: None,
            last_message_at: None,
            created_at: at,
        };
        db.insert_conversation(&conversation).unwrap();

        let mut ids = Vec::new();
        for content in ["first", "second", "third"] {
            let m = Message {
                id: Uuid::new_v4(),
                conversation_id: conversation.id,
                sender_type: SenderType::User,
                content: content.into(),
                created_at: at,
            };
            db.insert_message(&m, content).unwrap();
            ids.push(m.id);
        }

        let listed: Vec<_> = db.messages_for(conversation.id).unwrap().into_iter().map(|m| m.id).collect();
        assert_eq!(listed, ids);

        let c = db.conversation_by_id(conversation.id).unwrap().unwrap();
        assert_eq!(c.last_message.as_deref(), Some("third"));
        assert_eq!(c.last_message_at, Some(at));
    }

    #[test]
    fn message_to_missing_conversation_rolls_back() {
        let db = Database::open_in_memory().unwrap();
        let orphan = Message {
            id: Uuid::new_v4(),
            conversation_id: Uuid::new_v4(),
            sender_type: SenderType::Admin,
            content: "hello".into(),
            created_at: now(),
        };
        assert!(db.insert_message(&orphan, "hello").is_err());
        assert!(db.messages_for(orphan.conversation_id).unwrap().is_empty());
    }
}
