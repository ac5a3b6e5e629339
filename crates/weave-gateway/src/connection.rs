use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use axum::extract::ws::{Message, WebSocket};
use futures_util::{SinkExt, StreamExt};
use tracing::{debug, error, info, warn};

use weave_types::events::{GatewayCommand, GatewayEvent};

use crate::hub::{Hub, MessageError};

/// Heartbeat interval: server sends a Ping every 15 seconds.
/// If 2 consecutive Pongs are missed (~30s), the connection is dropped.
const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(15);
const MAX_MISSED_PONGS: u8 = 2;

const NOT_CONNECTED: &str = "Cannot send message to non-connected user";

/// Missed-pong counter for one socket.
#[derive(Debug, Default)]
struct Heartbeat {
    missed: u8,
}

impl Heartbeat {
    /// Called on every interval tick with whether a Pong arrived since the
    /// previous one. Returns `false` once the peer should be dropped.
    fn tick(&mut self, pong_seen: bool) -> bool {
        if pong_seen {
            self.missed = 0;
        } else {
            self.missed = self.missed.saturating_add(1);
        }
        self.missed < MAX_MISSED_PONGS
    }
}

/// Handle a WebSocket whose token was validated at the HTTP upgrade.
/// The socket joins its own user room, receives `Ready`, then relays room
/// events out and commands in until either side goes away.
pub async fn handle_connection(socket: WebSocket, hub: Hub, user_id: i64) {
    let (mut sender, mut receiver) = socket.split();

    let (conn_id, mut room_rx) = hub.dispatcher.join(user_id).await;
    info!("User {} connected to gateway ({})", user_id, conn_id);

    let ready = GatewayEvent::Ready { user_id };
    if send_event(&mut sender, &ready).await.is_err() {
        hub.dispatcher.leave(user_id, conn_id).await;
        return;
    }

    let pong_received = Arc::new(AtomicBool::new(true));
    let pong_flag_send = pong_received.clone();
    let pong_flag_recv = pong_received.clone();

    // Forward room events -> client, with heartbeat
    let mut send_task = tokio::spawn(async move {
        let mut heartbeat = tokio::time::interval(HEARTBEAT_INTERVAL);
        heartbeat.tick().await;
        let mut pongs = Heartbeat::default();

        loop {
            tokio::select! {
                event = room_rx.recv() => {
                    let Some(event) = event else { break };
                    if send_event(&mut sender, &event).await.is_err() {
                        break;
                    }
                }
                _ = heartbeat.tick() => {
                    if !pongs.tick(pong_flag_send.swap(false, Ordering::Acquire)) {
                        warn!("Heartbeat timeout (missed {} pongs), dropping connection", pongs.missed);
                        break;
                    }
                    if sender.send(Message::Ping(Vec::new().into())).await.is_err() {
                        break;
                    }
                }
            }
        }
    });

    // Read commands from client
    let hub_recv = hub.clone();
    let mut recv_task = tokio::spawn(async move {
        while let Some(Ok(msg)) = receiver.next().await {
            match msg {
                Message::Text(text) => match serde_json::from_str::<GatewayCommand>(&text) {
                    Ok(cmd) => {
                        if let Some(reply) = handle_command(&hub_recv, user_id, cmd).await {
                            hub_recv
                                .dispatcher
                                .send_to_connection(user_id, conn_id, reply)
                                .await;
                        }
                    }
                    Err(e) => {
                        let raw: String = text.chars().take(200).collect();
                        warn!("User {} bad command: {} -- raw: {}", user_id, e, raw);
                    }
                },
                Message::Pong(_) => {
                    pong_flag_recv.store(true, Ordering::Release);
                }
                Message::Close(_) => break,
                _ => {}
            }
        }
    });

    // Wait for either task to finish
    tokio::select! {
        _ = &mut send_task => recv_task.abort(),
        _ = &mut recv_task => send_task.abort(),
    }

    hub.dispatcher.leave(user_id, conn_id).await;
    info!("User {} disconnected from gateway ({})", user_id, conn_id);
}

async fn send_event(
    sender: &mut futures_util::stream::SplitSink<WebSocket, Message>,
    event: &GatewayEvent,
) -> Result<(), ()> {
    let text = serde_json::to_string(event).map_err(|e| {
        error!("Failed to encode gateway event: {}", e);
    })?;
    sender.send(Message::Text(text.into())).await.map_err(|_| ())
}

/// Execute one client command. The returned event, if any, goes back to
/// the issuing socket only.
pub async fn handle_command(hub: &Hub, user_id: i64, cmd: GatewayCommand) -> Option<GatewayEvent> {
    match cmd {
        GatewayCommand::JoinRoom { user_id: room } => {
            if room == user_id {
                debug!("User {} re-joined own room", user_id);
                None
            } else {
                warn!("User {} tried to join room of {}", user_id, room);
                Some(error_event("Cannot join another user's room"))
            }
        }

        GatewayCommand::Typing { to_id } => {
            relay_if_connected(hub, user_id, to_id, GatewayEvent::UserTyping { from_id: user_id }).await
        }

        GatewayCommand::StopTyping { to_id } => {
            relay_if_connected(hub, user_id, to_id, GatewayEvent::UserStopTyping { from_id: user_id }).await
        }

        GatewayCommand::SendMessage { to_id, message } => {
            match hub.send_direct_message(user_id, to_id, message).await {
                Ok(chat) => {
                    debug!("User {} -> {} message {}", user_id, to_id, chat.id);
                    None
                }
                Err(MessageError::Internal(e)) => {
                    error!("User {} -> {} message failed: {}", user_id, to_id, e);
                    Some(error_event("Internal server error"))
                }
                Err(e) => Some(error_event(&e.to_string())),
            }
        }
    }
}

async fn relay_if_connected(
    hub: &Hub,
    user_id: i64,
    to_id: i64,
    event: GatewayEvent,
) -> Option<GatewayEvent> {
    match hub.are_connected(user_id, to_id).await {
        Ok(true) => {
            hub.dispatcher.send_to_room(to_id, event).await;
            None
        }
        Ok(false) => Some(error_event(NOT_CONNECTED)),
        Err(e) => {
            error!("Connection check {} -> {} failed: {}", user_id, to_id, e);
            Some(error_event("Internal server error"))
        }
    }
}

fn error_event(message: &str) -> GatewayEvent {
    GatewayEvent::Error {
        message: message.to_string(),
    }
}
