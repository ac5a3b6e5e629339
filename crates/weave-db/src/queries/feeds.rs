use anyhow::Result;
use chrono::Utc;
use rusqlite::{Connection, Row};
use weave_types::api::UpdatedFeed;
use weave_types::models::FeedPost;

use super::{OptionalExt, summary_at};
use crate::Database;
use crate::models::FeedMutation;

const POST_SELECT: &str = "SELECT f.id, f.content, f.created_at, f.updated_at,
        u.id, u.full_name, u.profile_photo_path
     FROM feeds f JOIN users u ON u.id = f.user_id";

impl Database {
    // -- Feed --

    pub fn create_feed(&self, user_id: i64, content: &str) -> Result<FeedPost> {
        self.with_conn_mut(|conn| {
            let now = Utc::now();
            conn.execute(
                "INSERT INTO feeds (user_id, content, created_at, updated_at) VALUES (?1, ?2, ?3, ?3)",
                rusqlite::params![user_id, content, now],
            )?;
            let id = conn.last_insert_rowid();
            query_post(conn, id)?.ok_or_else(|| anyhow::anyhow!("feed {} missing after insert", id))
        })
    }

    pub fn get_feed(&self, feed_id: i64) -> Result<Option<FeedPost>> {
        self.with_conn(|conn| query_post(conn, feed_id))
    }

    /// One page of posts by `user_id` and all of their connections, highest
    /// id first. `before` is an exclusive upper bound on the id.
    pub fn list_feeds(&self, user_id: i64, before: Option<i64>, limit: u32) -> Result<Vec<FeedPost>> {
        self.with_conn(|conn| {
            let sql = format!(
                "{}
                 WHERE f.user_id IN (
                     SELECT ?1
                     UNION SELECT to_id FROM connections WHERE from_id = ?1
                     UNION SELECT from_id FROM connections WHERE to_id = ?1
                 )
                 AND (?2 IS NULL OR f.id < ?2)
                 ORDER BY f.id DESC
                 LIMIT ?3",
                POST_SELECT
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map(rusqlite::params![user_id, before, limit], read_post)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn update_feed(&self, feed_id: i64, user_id: i64, content: &str) -> Result<FeedMutation<UpdatedFeed>> {
        self.with_conn_mut(|conn| {
            match feed_owner(conn, feed_id)? {
                None => return Ok(FeedMutation::NotFound),
                Some(owner) if owner != user_id => return Ok(FeedMutation::NotOwner),
                Some(_) => {}
            }

            let updated_at = Utc::now();
            conn.execute(
                "UPDATE feeds SET content = ?2, updated_at = ?3 WHERE id = ?1",
                rusqlite::params![feed_id, content, updated_at],
            )?;

            Ok(FeedMutation::Done(UpdatedFeed {
                id: feed_id,
                content: content.to_string(),
                updated_at,
            }))
        })
    }

    pub fn delete_feed(&self, feed_id: i64, user_id: i64) -> Result<FeedMutation<()>> {
        self.with_conn_mut(|conn| {
            match feed_owner(conn, feed_id)? {
                None => return Ok(FeedMutation::NotFound),
                Some(owner) if owner != user_id => return Ok(FeedMutation::NotOwner),
                Some(_) => {}
            }

            conn.execute("DELETE FROM feeds WHERE id = ?1", [feed_id])?;
            Ok(FeedMutation::Done(()))
        })
    }
}

fn feed_owner(conn: &Connection, feed_id: i64) -> Result<Option<i64>> {
    conn.query_row("SELECT user_id FROM feeds WHERE id = ?1", [feed_id], |r| r.get(0))
        .optional()
}

fn query_post(conn: &Connection, feed_id: i64) -> Result<Option<FeedPost>> {
    let sql = format!("{} WHERE f.id = ?1", POST_SELECT);
    let mut stmt = conn.prepare(&sql)?;
    stmt.query_row([feed_id], read_post).optional()
}

fn read_post(row: &Row<'_>) -> rusqlite::Result<FeedPost> {
    Ok(FeedPost {
        id: row.get(0)?,
        content: row.get(1)?,
        created_at: row.get(2)?,
        updated_at: row.get(3)?,
        author: summary_at(row, 4)?,
    })
}
