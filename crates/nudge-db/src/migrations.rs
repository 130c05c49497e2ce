use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS users (
            id              TEXT PRIMARY KEY,
            username        TEXT NOT NULL UNIQUE COLLATE NOCASE,
            password        TEXT NOT NULL,
            email           TEXT,
            phone           TEXT,
            active          INTEGER NOT NULL DEFAULT 1,
            is_admin        INTEGER NOT NULL DEFAULT 0,
            created_at      TEXT NOT NULL DEFAULT (datetime('now')),
            last_login_at   TEXT
        );

        -- Direct threads are unique per unordered participant pair:
        -- pair_key is the two user ids sorted and joined, and the
        -- UNIQUE constraint is the serialization point for concurrent
        -- first-contact sends.
        CREATE TABLE IF NOT EXISTS threads (
            id          INTEGER PRIMARY KEY AUTOINCREMENT,
            is_group    INTEGER NOT NULL DEFAULT 0,
            created_by  TEXT NOT NULL REFERENCES users(id),
            pair_key    TEXT UNIQUE,
            hidden_for  TEXT NOT NULL DEFAULT '[]',
            created_at  TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE TABLE IF NOT EXISTS thread_participants (
            thread_id               INTEGER NOT NULL REFERENCES threads(id),
            user_id                 TEXT NOT NULL REFERENCES users(id),
            joined_at               TEXT NOT NULL DEFAULT (datetime('now')),
            last_read_message_id    INTEGER,
            PRIMARY KEY (thread_id, user_id)
        );

        CREATE TABLE IF NOT EXISTS messages (
            id                  INTEGER PRIMARY KEY AUTOINCREMENT,
            thread_id           INTEGER NOT NULL REFERENCES threads(id),
            sender_id           TEXT NOT NULL REFERENCES users(id),
            body                TEXT NOT NULL,
            message_index       INTEGER NOT NULL,
            reply_to_message_id INTEGER REFERENCES messages(id),
            deleted_for         TEXT NOT NULL DEFAULT '[]',
            created_at          TEXT NOT NULL DEFAULT (datetime('now')),
            UNIQUE (thread_id, message_index)
        );

        CREATE INDEX IF NOT EXISTS idx_messages_thread
            ON messages(thread_id, message_index);

        CREATE TABLE IF NOT EXISTS friend_requests (
            id              INTEGER PRIMARY KEY AUTOINCREMENT,
            requester_id    TEXT NOT NULL REFERENCES users(id),
            recipient_id    TEXT NOT NULL REFERENCES users(id),
            status          TEXT NOT NULL DEFAULT 'pending',
            created_at      TEXT NOT NULL DEFAULT (datetime('now')),
            responded_at    TEXT
        );

        CREATE INDEX IF NOT EXISTS idx_friend_requests_recipient
            ON friend_requests(recipient_id, status);

        CREATE TABLE IF NOT EXISTS notifications (
            id              INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id         TEXT NOT NULL REFERENCES users(id),
            kind            TEXT NOT NULL,
            from_user_id    TEXT REFERENCES users(id),
            related_id      INTEGER,
            title           TEXT NOT NULL,
            body            TEXT NOT NULL,
            is_read         INTEGER NOT NULL DEFAULT 0,
            created_at      TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE INDEX IF NOT EXISTS idx_notifications_user
            ON notifications(user_id, is_read);

        CREATE TABLE IF NOT EXISTS invite_links (
            id                  INTEGER PRIMARY KEY AUTOINCREMENT,
            code                TEXT NOT NULL UNIQUE,
            recipient1_username TEXT,
            recipient1_email    TEXT,
            recipient1_phone    TEXT,
            recipient1_accepted INTEGER NOT NULL DEFAULT 0,
            recipient2_username TEXT,
            recipient2_email    TEXT,
            recipient2_phone    TEXT,
            recipient2_accepted INTEGER NOT NULL DEFAULT 0,
            thread_id           INTEGER REFERENCES threads(id),
            created_by          TEXT NOT NULL REFERENCES users(id),
            created_at          TEXT NOT NULL DEFAULT (datetime('now')),
            expires_at          TEXT
        );
        ",
    )?;

    info!("Database migrations complete");
    Ok(())
}
