use anyhow::Result;
use chrono::Utc;
use rusqlite::{Connection, Row};
use weave_types::models::ChatMessage;

use super::OptionalExt;
use crate::Database;

impl Database {
    // -- Chat --

    pub fn insert_chat(&self, from_id: i64, to_id: i64, message: &str) -> Result<ChatMessage> {
        self.with_conn_mut(|conn| {
            let timestamp = Utc::now();
            conn.execute(
                "INSERT INTO chats (from_id, to_id, message, timestamp) VALUES (?1, ?2, ?3, ?4)",
                rusqlite::params![from_id, to_id, message, timestamp],
            )?;
            Ok(ChatMessage {
                id: conn.last_insert_rowid(),
                from_id,
                to_id,
                message: message.to_string(),
                timestamp,
            })
        })
    }

    /// Every message exchanged between `a` and `b`, oldest first.
    pub fn chat_history(&self, a: i64, b: i64) -> Result<Vec<ChatMessage>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, from_id, to_id, message, timestamp FROM chats
                 WHERE (from_id = ?1 AND to_id = ?2) OR (from_id = ?2 AND to_id = ?1)
                 ORDER BY id ASC",
            )?;
            let rows = stmt
                .query_map([a, b], read_chat)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Latest message with each connection of `user_id` that has one,
    /// paired with the other user's id, newest conversation first.
    pub fn recent_chats(&self, user_id: i64) -> Result<Vec<(i64, ChatMessage)>> {
        let partners = self.connected_ids(user_id)?;

        self.with_conn(|conn| {
            let mut recents = Vec::with_capacity(partners.len());
            for partner in partners {
                if let Some(last) = last_message(conn, user_id, partner)? {
                    recents.push((partner, last));
                }
            }
            recents.sort_by(|(_, x), (_, y)| y.id.cmp(&x.id));
            Ok(recents)
        })
    }
}

fn last_message(conn: &Connection, a: i64, b: i64) -> Result<Option<ChatMessage>> {
    conn.query_row(
        "SELECT id, from_id, to_id, message, timestamp FROM chats
         WHERE (from_id = ?1 AND to_id = ?2) OR (from_id = ?2 AND to_id = ?1)
         ORDER BY id DESC
         LIMIT 1",
        [a, b],
        read_chat,
    )
    .optional()
}

fn read_chat(row: &Row<'_>) -> rusqlite::Result<ChatMessage> {
    Ok(ChatMessage {
        id: row.get(0)?,
        from_id: row.get(1)?,
        to_id: row.get(2)?,
        message: row.get(3)?,
        timestamp: row.get(4)?,
    })
}
