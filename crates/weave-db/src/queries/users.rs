use anyhow::Result;
use chrono::Utc;
use rusqlite::{Connection, Row};
use weave_types::models::{ConnectionStatus, UserSummary};

use super::{OptionalExt, as_params, placeholders, summary_at};
use crate::Database;
use crate::models::{
    NewUser, ProfileChanges, ProfileUpdate, Registration, UserRow, UserRowData, username_length_ok,
};

const USER_COLUMNS: &str = "id, username, email, password_hash, full_name, profile_photo_path, work_history, skills, created_at";

impl Database {
    // -- Users --

    /// Inserts a new account unless its email or username is already
    /// taken. Checks and insert share one writer transaction, so two
    /// concurrent sign-ups with the same email cannot both pass.
    pub fn register_user(&self, user: &NewUser<'_>) -> Result<Registration> {
        self.with_conn_mut(|conn| {
            let tx = conn.unchecked_transaction()?;

            if query_user(&tx, "email", &user.email)?.is_some() {
                return Ok(Registration::EmailTaken);
            }
            if query_user(&tx, "username", &user.username)?.is_some() {
                return Ok(Registration::UsernameTaken);
            }

            tx.execute(
                "INSERT INTO users (username, email, password_hash, full_name, profile_photo_path, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                rusqlite::params![
                    user.username,
                    user.email,
                    user.password_hash,
                    user.full_name,
                    user.profile_photo_path,
                    Utc::now()
                ],
            )?;
            let id = tx.last_insert_rowid();
            tx.commit()?;
            Ok(Registration::Created(id))
        })
    }

    pub fn get_user_by_id(&self, id: i64) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "id", &id))
    }

    pub fn get_user_by_username(&self, username: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "username", &username))
    }

    /// Login lookup: email takes precedence over username.
    pub fn find_user_by_identifier(&self, identifier: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| match query_user(conn, "email", &identifier)? {
            Some(user) => Ok(Some(user)),
            None => query_user(conn, "username", &identifier),
        })
    }

    pub fn count_existing_users(&self, ids: &[i64]) -> Result<usize> {
        if ids.is_empty() {
            return Ok(0);
        }
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT COUNT(*) FROM users WHERE id IN ({})",
                placeholders(1, ids.len())
            );
            let count: i64 = conn.query_row(&sql, as_params(ids).as_slice(), |r| r.get(0))?;
            Ok(count as usize)
        })
    }

    pub fn get_full_name(&self, id: i64) -> Result<Option<String>> {
        self.with_conn(|conn| {
            conn.query_row("SELECT full_name FROM users WHERE id = ?1", [id], |r| r.get(0))
                .optional()
        })
    }

    /// Case-insensitive substring match on full name. Case folding covers
    /// all of Unicode and the search text is matched literally.
    pub fn search_users(&self, search: &str) -> Result<Vec<UserSummary>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, full_name, profile_photo_path FROM users
                 WHERE instr(casefold(full_name), casefold(?1)) > 0
                 ORDER BY id",
            )?;
            let rows = stmt
                .query_map([search], |row| summary_at(row, 0))?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Up to `take` users, skipping the ids in `exclude`.
    pub fn users_excluding(&self, exclude: &[i64], take: u32) -> Result<Vec<UserSummary>> {
        self.with_conn(|conn| {
            let sql = if exclude.is_empty() {
                "SELECT id, full_name, profile_photo_path FROM users ORDER BY id LIMIT ?1".to_string()
            } else {
                format!(
                    "SELECT id, full_name, profile_photo_path FROM users
                     WHERE id NOT IN ({})
                     ORDER BY id LIMIT ?1",
                    placeholders(2, exclude.len())
                )
            };
            let mut params: Vec<&dyn rusqlite::types::ToSql> = vec![&take];
            params.extend(as_params(exclude));

            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map(params.as_slice(), |row| summary_at(row, 0))?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    // -- Profile --

    pub fn connection_count(&self, user_id: i64) -> Result<i64> {
        self.with_conn(|conn| {
            let count = conn.query_row(
                "SELECT COUNT(*) FROM connections WHERE from_id = ?1 OR to_id = ?1",
                [user_id],
                |r| r.get(0),
            )?;
            Ok(count)
        })
    }

    /// Content of the user's latest posts, newest first.
    pub fn recent_post_contents(&self, user_id: i64, limit: u32) -> Result<Vec<String>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT content FROM feeds WHERE user_id = ?1 ORDER BY id DESC LIMIT ?2",
            )?;
            let rows = stmt
                .query_map(rusqlite::params![user_id, limit], |r| r.get(0))?
                .collect::<std::result::Result<Vec<String>, _>>()?;
            Ok(rows)
        })
    }

    /// Pending-request state as seen by `viewer_id` looking at `user_id`.
    pub fn request_status(&self, viewer_id: i64, user_id: i64) -> Result<ConnectionStatus> {
        self.with_conn(|conn| {
            let direction: Option<i64> = conn
                .query_row(
                    "SELECT from_id FROM connection_requests
                     WHERE (from_id = ?1 AND to_id = ?2) OR (from_id = ?2 AND to_id = ?1)
                     LIMIT 1",
                    [viewer_id, user_id],
                    |r| r.get(0),
                )
                .optional()?;
            Ok(match direction {
                Some(from) if from == viewer_id => ConnectionStatus::Sent,
                Some(_) => ConnectionStatus::Received,
                None => ConnectionStatus::None,
            })
        })
    }

    /// Applies a partial profile update in one transaction.
    pub fn update_profile(&self, user_id: i64, changes: &ProfileChanges) -> Result<ProfileUpdate> {
        self.with_conn_mut(|conn| {
            let tx = conn.unchecked_transaction()?;

            if query_user(&tx, "id", &user_id)?.is_none() {
                return Ok(ProfileUpdate::NotFound);
            }

            if let Some(username) = &changes.username {
                if username.trim().is_empty() {
                    return Ok(ProfileUpdate::EmptyUsername);
                }
                if !username_length_ok(username) {
                    return Ok(ProfileUpdate::UsernameLength);
                }
                if let Some(existing) = query_user(&tx, "username", username)? {
                    if existing.id != user_id {
                        return Ok(ProfileUpdate::UsernameTaken);
                    }
                }
            }

            if changes.full_name.as_deref().is_some_and(|n| n.trim().is_empty()) {
                return Ok(ProfileUpdate::EmptyName);
            }

            tx.execute(
                "UPDATE users SET
                    username     = COALESCE(?2, username),
                    full_name    = COALESCE(?3, full_name),
                    work_history = COALESCE(?4, work_history),
                    skills       = COALESCE(?5, skills)
                 WHERE id = ?1",
                rusqlite::params![
                    user_id,
                    changes.username,
                    changes.full_name,
                    changes.work_history,
                    changes.skills
                ],
            )?;

            let updated = query_user(&tx, "id", &user_id)?
                .ok_or_else(|| anyhow::anyhow!("user {} vanished during update", user_id))?;
            tx.commit()?;

            Ok(ProfileUpdate::Updated(UserRowData {
                id: updated.id,
                username: updated.username,
                full_name: updated.full_name,
                profile_photo_path: updated.profile_photo_path,
                work_history: updated.work_history,
                skills: updated.skills,
            }))
        })
    }
}

/// `column` is always one of a fixed set of literals, never user input.
fn query_user(
    conn: &Connection,
    column: &str,
    value: &dyn rusqlite::types::ToSql,
) -> Result<Option<UserRow>> {
    let sql = format!("SELECT {} FROM users WHERE {} = ?1", USER_COLUMNS, column);
    let mut stmt = conn.prepare(&sql)?;
    stmt.query_row([value], read_user).optional()
}

fn read_user(row: &Row<'_>) -> rusqlite::Result<UserRow> {
    Ok(UserRow {
        id: row.get(0)?,
        username: row.get(1)?,
        email: row.get(2)?,
        password_hash: row.get(3)?,
        full_name: row.get(4)?,
        profile_photo_path: row.get(5)?,
        work_history: row.get(6)?,
        skills: row.get(7)?,
        created_at: row.get(8)?,
    })
}
