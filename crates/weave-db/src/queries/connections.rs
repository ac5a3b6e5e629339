use anyhow::Result;
use chrono::Utc;
use rusqlite::Connection;
use weave_types::models::{ConnectionRequest, PendingRequest, UserSummary};

use super::{OptionalExt, summary_at};
use crate::Database;
use crate::models::RequestOutcome;

impl Database {
    // -- Connections --

    pub fn are_connected(&self, a: i64, b: i64) -> Result<bool> {
        self.with_conn(|conn| find_connection(conn, a, b).map(|c| c.is_some()))
    }

    /// Ids of every user connected to `user_id`, in either direction.
    pub fn connected_ids(&self, user_id: i64) -> Result<Vec<i64>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT to_id FROM connections WHERE from_id = ?1
                 UNION
                 SELECT from_id FROM connections WHERE to_id = ?1",
            )?;
            let ids = stmt
                .query_map([user_id], |r| r.get(0))?
                .collect::<std::result::Result<Vec<i64>, _>>()?;
            Ok(ids)
        })
    }

    pub fn connections_of(&self, user_id: i64) -> Result<Vec<UserSummary>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT u.id, u.full_name, u.profile_photo_path
                 FROM connections c JOIN users u ON u.id = c.to_id
                 WHERE c.from_id = ?1
                 UNION ALL
                 SELECT u.id, u.full_name, u.profile_photo_path
                 FROM connections c JOIN users u ON u.id = c.from_id
                 WHERE c.to_id = ?1",
            )?;
            let rows = stmt
                .query_map([user_id], |row| summary_at(row, 0))?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Validates and stores a connection request from `from_id` to `to_id`.
    pub fn create_connection_request(&self, from_id: i64, to_id: i64) -> Result<RequestOutcome> {
        if from_id == to_id {
            return Ok(RequestOutcome::SelfRequest);
        }

        self.with_conn_mut(|conn| {
            let tx = conn.unchecked_transaction()?;

            let existing: i64 = tx.query_row(
                "SELECT COUNT(*) FROM users WHERE id IN (?1, ?2)",
                [from_id, to_id],
                |r| r.get(0),
            )?;
            if existing != 2 {
                return Ok(RequestOutcome::UserMissing);
            }

            if find_request(&tx, from_id, to_id)?.is_some() {
                return Ok(RequestOutcome::AlreadyRequested);
            }
            if find_connection(&tx, from_id, to_id)?.is_some() {
                return Ok(RequestOutcome::AlreadyConnected);
            }

            let created_at = Utc::now();
            tx.execute(
                "INSERT INTO connection_requests (from_id, to_id, created_at) VALUES (?1, ?2, ?3)",
                rusqlite::params![from_id, to_id, created_at],
            )?;
            tx.commit()?;

            Ok(RequestOutcome::Created(ConnectionRequest {
                from_id,
                to_id,
                created_at,
            }))
        })
    }

    /// Requests addressed to `user_id`, newest first.
    pub fn pending_requests(&self, user_id: i64) -> Result<Vec<PendingRequest>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT r.from_id, r.created_at, u.id, u.full_name, u.profile_photo_path
                 FROM connection_requests r JOIN users u ON u.id = r.from_id
                 WHERE r.to_id = ?1
                 ORDER BY r.created_at DESC, r.rowid DESC",
            )?;
            let rows = stmt
                .query_map([user_id], |row| {
                    Ok(PendingRequest {
                        from_id: row.get(0)?,
                        created_at: row.get(1)?,
                        from_user: summary_at(row, 2)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Consumes the request `from_id -> to_id`, creating the connection when
    /// accepted. Returns false if no such request exists.
    pub fn respond_to_request(&self, from_id: i64, to_id: i64, accept: bool) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let tx = conn.unchecked_transaction()?;

            let removed = tx.execute(
                "DELETE FROM connection_requests WHERE from_id = ?1 AND to_id = ?2",
                [from_id, to_id],
            )?;
            if removed == 0 {
                return Ok(false);
            }

            if accept {
                tx.execute(
                    "INSERT INTO connections (from_id, to_id, created_at) VALUES (?1, ?2, ?3)",
                    rusqlite::params![from_id, to_id, Utc::now()],
                )?;
            }

            tx.commit()?;
            Ok(true)
        })
    }

    /// Deletes the connection and every chat message between the two users.
    /// Returns false if they were not connected.
    pub fn remove_connection(&self, user_id: i64, target_id: i64) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let tx = conn.unchecked_transaction()?;

            let Some((from_id, to_id)) = find_connection(&tx, user_id, target_id)? else {
                return Ok(false);
            };

            let chats = tx.execute(
                "DELETE FROM chats
                 WHERE (from_id = ?1 AND to_id = ?2) OR (from_id = ?2 AND to_id = ?1)",
                [user_id, target_id],
            )?;
            tx.execute(
                "DELETE FROM connections WHERE from_id = ?1 AND to_id = ?2",
                [from_id, to_id],
            )?;
            tx.commit()?;

            tracing::debug!(
                "Removed connection {} <-> {} ({} chat messages)",
                user_id,
                target_id,
                chats
            );
            Ok(true)
        })
    }
}

/// The stored (from_id, to_id) of the connection between `a` and `b`, in
/// whichever direction it was recorded.
pub(crate) fn find_connection(conn: &Connection, a: i64, b: i64) -> Result<Option<(i64, i64)>> {
    conn.query_row(
        "SELECT from_id, to_id FROM connections
         WHERE (from_id = ?1 AND to_id = ?2) OR (from_id = ?2 AND to_id = ?1)
         LIMIT 1",
        [a, b],
        |r| Ok((r.get(0)?, r.get(1)?)),
    )
    .optional()
}

fn find_request(conn: &Connection, a: i64, b: i64) -> Result<Option<(i64, i64)>> {
    conn.query_row(
        "SELECT from_id, to_id FROM connection_requests
         WHERE (from_id = ?1 AND to_id = ?2) OR (from_id = ?2 AND to_id = ?1)
         LIMIT 1",
        [a, b],
        |r| Ok((r.get(0)?, r.get(1)?)),
    )
    .optional()
}
