use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Compact user card used in search results, connection lists and feed authors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserSummary {
    pub id: i64,
    pub full_name: String,
    pub profile_photo_path: String,
}

/// Network distance between two users in the connection graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Degree {
    First,
    Second,
    Third,
    /// Unrelated within three hops, or the same user.
    Outside,
}

impl Degree {
    pub fn from_depth(depth: usize) -> Self {
        match depth {
            1 => Self::First,
            2 => Self::Second,
            3 => Self::Third,
            _ => Self::Outside,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::First => "1st",
            Self::Second => "2nd",
            Self::Third => "3rd",
            Self::Outside => "",
        }
    }
}

impl Serialize for Degree {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Degree {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        match s.as_str() {
            "1st" => Ok(Self::First),
            "2nd" => Ok(Self::Second),
            "3rd" => Ok(Self::Third),
            "" => Ok(Self::Outside),
            other => Err(serde::de::Error::custom(format!("unknown degree '{}'", other))),
        }
    }
}

/// Pending-request state between a profile viewer and the profile owner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionStatus {
    None,
    /// The viewer sent a request to the profile owner.
    Sent,
    /// The profile owner sent a request to the viewer.
    Received,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionRequest {
    pub from_id: i64,
    pub to_id: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PendingRequest {
    pub from_id: i64,
    pub created_at: DateTime<Utc>,
    pub from_user: UserSummary,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedPost {
    pub id: i64,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub author: UserSummary,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: i64,
    pub from_id: i64,
    pub to_id: i64,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PushSubscription {
    pub endpoint: String,
    pub user_id: i64,
    pub keys: serde_json::Value,
}

/// Notification content handed to a push delivery backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PushPayload {
    pub title: String,
    pub body: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
}

impl PushPayload {
    pub fn new(title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            body: body.into(),
            icon: None,
            url: None,
            tag: None,
        }
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }
}

/// Outcome of one delivery attempt in a fan-out.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliveryReport {
    pub endpoint: String,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}
