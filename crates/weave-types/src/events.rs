use serde::{Deserialize, Serialize};

use crate::models::ChatMessage;

/// Events sent over the WebSocket gateway.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum GatewayEvent {
    /// Server confirms the socket is authenticated and joined to its own room
    Ready { user_id: i64 },

    /// A connection started typing to this user
    UserTyping { from_id: i64 },

    /// A connection stopped typing to this user
    UserStopTyping { from_id: i64 },

    /// A direct message was stored and is being delivered to its recipient
    ReceiveMessage(ChatMessage),

    /// A command from this socket was refused
    Error { message: String },
}

/// Commands sent FROM client TO server over WebSocket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum GatewayCommand {
    /// Join a user room. Only the caller's own room may be joined.
    JoinRoom { user_id: i64 },

    /// Start a typing indicator towards a connection
    Typing { to_id: i64 },

    /// Clear the typing indicator towards a connection
    StopTyping { to_id: i64 },

    /// Send a direct message to a connection
    SendMessage { to_id: i64, message: String },
}
