mod chats;
mod connections;
mod feeds;
mod push;
mod users;

use anyhow::Result;
use rusqlite::Row;
use rusqlite::types::ToSql;
use weave_types::models::UserSummary;

/// Extension trait for optional query results
pub(crate) trait OptionalExt<T> {
    fn optional(self) -> Result<Option<T>>;
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

/// `?1, ?2, ...` for an IN clause of `n` values, numbered from `start`.
pub(crate) fn placeholders(start: usize, n: usize) -> String {
    (start..start + n)
        .map(|i| format!("?{}", i))
        .collect::<Vec<_>>()
        .join(", ")
}

pub(crate) fn as_params(ids: &[i64]) -> Vec<&dyn ToSql> {
    ids.iter().map(|id| id as &dyn ToSql).collect()
}

/// Reads `id, full_name, profile_photo_path` starting at column `at`.
pub(crate) fn summary_at(row: &Row<'_>, at: usize) -> rusqlite::Result<UserSummary> {
    Ok(UserSummary {
        id: row.get(at)?,
        full_name: row.get(at + 1)?,
        profile_photo_path: row.get(at + 2)?,
    })
}
