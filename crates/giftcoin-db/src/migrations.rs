use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL);"
    )?;

    let version: i64 = conn
        .query_row("SELECT COALESCE(MAX(version), 0) FROM schema_version", [], |r| r.get(0))?;

    if version < 1 {
        info!("Running migration v1 (gifts, payments, support chat)");
        conn.execute_batch(
            "
            CREATE TABLE gifts (
                id                  TEXT PRIMARY KEY,
                code                TEXT NOT NULL UNIQUE,
                amount              INTEGER NOT NULL CHECK (amount > 0),
                sender_name         TEXT NOT NULL,
                sender_phone        TEXT,
                sender_email        TEXT,
                receiver_name       TEXT NOT NULL,
                receiver_phone      TEXT,
                receiver_email      TEXT,
                message             TEXT,
                status              TEXT NOT NULL DEFAULT 'pending',
                payment_id          TEXT,
                thank_you_message   TEXT,
                created_at          TEXT NOT NULL,
                expires_at          TEXT NOT NULL,
                registered_at       TEXT,
                refunded_at         TEXT,
                CHECK ((status = 'registered') = (registered_at IS NOT NULL))
            );

            CREATE INDEX idx_gifts_payment ON gifts(payment_id);
            CREATE INDEX idx_gifts_sender_phone ON gifts(sender_phone);
            CREATE INDEX idx_gifts_sender_email ON gifts(sender_email);
            CREATE INDEX idx_gifts_receiver_phone ON gifts(receiver_phone);
            CREATE INDEX idx_gifts_receiver_email ON gifts(receiver_email);
            CREATE INDEX idx_gifts_expiry ON gifts(status, expires_at);

            CREATE TABLE payments (
                id              TEXT PRIMARY KEY,
                gift_id         TEXT NOT NULL REFERENCES gifts(id),
                amount          INTEGER NOT NULL,
                method          TEXT NOT NULL,
                status          TEXT NOT NULL DEFAULT 'pending',
                created_at      TEXT NOT NULL,
                completed_at    TEXT
            );

            CREATE TABLE conversations (
                id                  TEXT PRIMARY KEY,
                user_name           TEXT NOT NULL,
                user_email          TEXT,
                status              TEXT NOT NULL DEFAULT 'open',
                last_message        TEXT,
                last_message_at     TEXT,
                created_at          TEXT NOT NULL
            );

            CREATE TABLE messages (
                id                  TEXT PRIMARY KEY,
                conversation_id     TEXT NOT NULL REFERENCES conversations(id),
                sender_type         TEXT NOT NULL,
                content             TEXT NOT NULL,
                created_at          TEXT NOT NULL
            );

            CREATE INDEX idx_messages_conversation
                ON messages(conversation_id, created_at);

            INSERT INTO schema_version (version) VALUES (1);
            "
        )?;
    }

    info!("Database migrations complete");
    Ok(())
}
