use anyhow::Result;
use chrono::Utc;
use rusqlite::Row;
use weave_types::models::PushSubscription;

use super::{OptionalExt, as_params, placeholders};
use crate::Database;

impl Database {
    // -- Push subscriptions --

    /// Inserts or re-binds `endpoint` to `user_id` with fresh keys.
    pub fn save_subscription(
        &self,
        endpoint: &str,
        user_id: i64,
        keys: &serde_json::Value,
    ) -> Result<PushSubscription> {
        let keys_text = serde_json::to_string(keys)?;
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO push_subscriptions (endpoint, user_id, keys, created_at)
                 VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT(endpoint) DO UPDATE SET user_id = excluded.user_id, keys = excluded.keys",
                rusqlite::params![endpoint, user_id, keys_text, Utc::now()],
            )?;
            Ok(PushSubscription {
                endpoint: endpoint.to_string(),
                user_id,
                keys: keys.clone(),
            })
        })
    }

    pub fn subscription_by_endpoint(&self, endpoint: &str) -> Result<Option<PushSubscription>> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT endpoint, user_id, keys FROM push_subscriptions WHERE endpoint = ?1",
                [endpoint],
                read_subscription,
            )
            .optional()
        })
    }

    pub fn subscriptions_for_user(&self, user_id: i64) -> Result<Vec<PushSubscription>> {
        self.subscriptions_for_users(&[user_id])
    }

    pub fn subscriptions_for_users(&self, user_ids: &[i64]) -> Result<Vec<PushSubscription>> {
        if user_ids.is_empty() {
            return Ok(vec![]);
        }
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT endpoint, user_id, keys FROM push_subscriptions
                 WHERE user_id IN ({})
                 ORDER BY created_at",
                placeholders(1, user_ids.len())
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map(as_params(user_ids).as_slice(), read_subscription)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Removes `endpoint` if it belongs to `user_id`.
    pub fn delete_subscription(&self, endpoint: &str, user_id: i64) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let removed = conn.execute(
                "DELETE FROM push_subscriptions WHERE endpoint = ?1 AND user_id = ?2",
                rusqlite::params![endpoint, user_id],
            )?;
            Ok(removed > 0)
        })
    }
}

fn read_subscription(row: &Row<'_>) -> rusqlite::Result<PushSubscription> {
    let keys: String = row.get(2)?;
    let keys = serde_json::from_str(&keys).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(2, rusqlite::types::Type::Text, Box::new(e))
    })?;
    Ok(PushSubscription {
        endpoint: row.get(0)?,
        user_id: row.get(1)?,
        keys,
    })
}
