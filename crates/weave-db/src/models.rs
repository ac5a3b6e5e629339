//! Database row types and query outcomes.
//! API-facing shapes that map one-to-one onto a row live in weave-types.

use std::ops::RangeInclusive;

use chrono::{DateTime, Utc};
use weave_types::models::{ConnectionRequest, UserSummary};

pub struct UserRow {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub full_name: String,
    pub profile_photo_path: String,
    pub work_history: Option<String>,
    pub skills: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl UserRow {
    pub fn summary(&self) -> UserSummary {
        UserSummary {
            id: self.id,
            full_name: self.full_name.clone(),
            profile_photo_path: self.profile_photo_path.clone(),
        }
    }
}

/// Allowed username length in characters, on sign-up and on profile edits.
pub const USERNAME_CHARS: RangeInclusive<usize> = 3..=32;

pub fn username_length_ok(username: &str) -> bool {
    USERNAME_CHARS.contains(&username.chars().count())
}

pub struct NewUser<'a> {
    pub username: &'a str,
    pub email: &'a str,
    pub password_hash: &'a str,
    pub full_name: &'a str,
    pub profile_photo_path: &'a str,
}

#[derive(Debug, PartialEq)]
pub enum Registration {
    Created(i64),
    EmailTaken,
    UsernameTaken,
}

/// Partial profile update. `None` leaves the column unchanged.
#[derive(Debug, Default)]
pub struct ProfileChanges {
    pub username: Option<String>,
    pub full_name: Option<String>,
    pub work_history: Option<String>,
    pub skills: Option<String>,
}

#[derive(Debug)]
pub enum ProfileUpdate {
    Updated(UserRowData),
    NotFound,
    EmptyUsername,
    UsernameLength,
    EmptyName,
    UsernameTaken,
}

/// Owned snapshot of the editable profile columns after an update.
#[derive(Debug)]
pub struct UserRowData {
    pub id: i64,
    pub username: String,
    pub full_name: String,
    pub profile_photo_path: String,
    pub work_history: Option<String>,
    pub skills: Option<String>,
}

#[derive(Debug)]
pub enum RequestOutcome {
    Created(ConnectionRequest),
    SelfRequest,
    UserMissing,
    AlreadyRequested,
    AlreadyConnected,
}

/// Result of an author-only mutation on a feed post.
#[derive(Debug, PartialEq)]
pub enum FeedMutation<T> {
    Done(T),
    NotFound,
    NotOwner,
}
