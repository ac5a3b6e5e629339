use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch("CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL);")?;

    let version: i64 = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_version",
        [],
        |r| r.get(0),
    )?;

    if version < 1 {
        info!("Running migration v1 (initial schema)");
        conn.execute_batch(
            "
            CREATE TABLE users (
                id                  INTEGER PRIMARY KEY AUTOINCREMENT,
                username            TEXT NOT NULL UNIQUE,
                email               TEXT NOT NULL UNIQUE,
                password_hash       TEXT NOT NULL,
                full_name           TEXT NOT NULL,
                profile_photo_path  TEXT NOT NULL,
                work_history        TEXT,
                skills              TEXT,
                created_at          TEXT NOT NULL
            );

            CREATE TABLE connections (
                from_id     INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                to_id       INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                created_at  TEXT NOT NULL,
                PRIMARY KEY (from_id, to_id)
            );

            CREATE INDEX idx_connections_to ON connections(to_id);

            CREATE TABLE connection_requests (
                from_id     INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                to_id       INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                created_at  TEXT NOT NULL,
                PRIMARY KEY (from_id, to_id)
            );

            CREATE INDEX idx_connection_requests_to ON connection_requests(to_id, created_at);

            CREATE TABLE feeds (
                id          INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id     INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                content     TEXT NOT NULL,
                created_at  TEXT NOT NULL,
                updated_at  TEXT NOT NULL
            );

            CREATE INDEX idx_feeds_user ON feeds(user_id, id);

            CREATE TABLE chats (
                id          INTEGER PRIMARY KEY AUTOINCREMENT,
                from_id     INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                to_id       INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                message     TEXT NOT NULL,
                timestamp   TEXT NOT NULL
            );

            CREATE INDEX idx_chats_pair ON chats(from_id, to_id, id);

            CREATE TABLE push_subscriptions (
                endpoint    TEXT PRIMARY KEY,
                user_id     INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                keys        TEXT NOT NULL,
                created_at  TEXT NOT NULL
            );

            CREATE INDEX idx_push_subscriptions_user ON push_subscriptions(user_id);

            INSERT INTO schema_version (version) VALUES (1);
            ",
        )?;
    }

    info!("Database migrations complete");
    Ok(())
}
