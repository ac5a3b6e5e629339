use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{ConnectionStatus, Degree, FeedPost, PushPayload, UserSummary};

// -- JWT Claims --

/// JWT claims shared by the REST middleware (weave-api) and the gateway
/// upgrade check (weave-server).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: i64,
    pub email: String,
    pub exp: usize,
}

// -- Envelope --

/// Success envelope wrapping every JSON response body.
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub message: String,
    pub body: T,
}

impl<T> ApiResponse<T> {
    pub fn ok(message: impl Into<String>, body: T) -> Self {
        Self {
            success: true,
            message: message.into(),
            body,
        }
    }
}

/// Failure envelope. `message` is the human-readable reason, `error` the
/// HTTP status name.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub message: String,
    pub error: Option<String>,
}

/// Placeholder body for operations that return nothing.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct Empty {}

// -- Auth --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RegisterRequest {
    pub username: String,
    pub name: String,
    pub email: String,
    pub password: String,
    pub confirm_password: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoginRequest {
    /// Email address or username.
    pub identifier: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AuthResponse {
    pub user_id: i64,
    pub username: String,
    pub token: String,
}

// -- Profile --

#[derive(Debug, Serialize, Deserialize)]
pub struct ProfileResponse {
    pub id: i64,
    pub username: String,
    pub name: String,
    pub profile_photo_path: String,
    pub work_history: Option<String>,
    pub skills: Option<String>,
    pub connection_count: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relevant_posts: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_owner: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_connected: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub connection_status: Option<ConnectionStatus>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateProfileRequest {
    pub name: Option<String>,
    pub username: Option<String>,
    pub work_history: Option<String>,
    pub skills: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UpdatedProfile {
    pub user_id: i64,
    pub username: String,
    pub full_name: String,
    pub profile_photo_path: String,
    pub work_history: Option<String>,
    pub skills: Option<String>,
}

// -- Connections --

#[derive(Debug, Default, Deserialize)]
pub struct UserListQuery {
    pub search: Option<String>,
    pub take: Option<u32>,
    pub target_id: Option<i64>,
}

/// A user summary annotated with its relation to the viewer.
/// Degree flags are only present when the request was authenticated.
#[derive(Debug, Serialize, Deserialize)]
pub struct UserListEntry {
    #[serde(flatten)]
    pub user: UserSummary,
    pub is_connected: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_second_degree: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_third_degree: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_owner: Option<bool>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RespondRequest {
    /// "accept" or "reject"; anything else is rejected by the handler.
    pub action: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DegreeResponse {
    pub degree: Degree,
}

// -- Feed --

#[derive(Debug, Default, Deserialize)]
pub struct FeedQuery {
    pub cursor: Option<i64>,
    pub limit: Option<u32>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct FeedPage {
    pub feeds: Vec<FeedPost>,
    /// Id to pass as `cursor` for the next page; `None` once exhausted.
    pub cursor: Option<i64>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FeedContentRequest {
    pub content: String,
}

#[derive(Debug, PartialEq, Serialize, Deserialize)]
pub struct UpdatedFeed {
    pub id: i64,
    pub content: String,
    pub updated_at: DateTime<Utc>,
}

// -- Chat --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SendChatRequest {
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RecentChat {
    pub user_id: i64,
    pub last_message: crate::models::ChatMessage,
}

// -- Push --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SaveSubscriptionRequest {
    pub endpoint: String,
    pub keys: serde_json::Value,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DeleteSubscriptionRequest {
    pub endpoint: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SendNotificationRequest {
    pub endpoint: String,
    pub data: PushPayload,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SendNotificationToUsersRequest {
    pub user_ids: Vec<i64>,
    pub data: PushPayload,
}
