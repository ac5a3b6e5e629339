use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{RwLock, mpsc};
use uuid::Uuid;

use weave_types::events::GatewayEvent;

type Room = HashMap<Uuid, mpsc::UnboundedSender<GatewayEvent>>;

/// Routes gateway events to per-user rooms. Every socket a user opens is a
/// member of that user's room.
#[derive(Clone, Default)]
pub struct Dispatcher {
    inner: Arc<DispatcherInner>,
}

#[derive(Default)]
struct DispatcherInner {
    /// user_id -> (conn_id -> sender)
    rooms: RwLock<HashMap<i64, Room>>,
}

impl Dispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Join a socket to its user's room. Returns (conn_id, receiver).
    pub async fn join(&self, user_id: i64) -> (Uuid, mpsc::UnboundedReceiver<GatewayEvent>) {
        let conn_id = Uuid::new_v4();
        let (tx, rx) = mpsc::unbounded_channel();
        self.inner
            .rooms
            .write()
            .await
            .entry(user_id)
            .or_default()
            .insert(conn_id, tx);
        (conn_id, rx)
    }

    /// Remove one socket; the room disappears with its last member.
    pub async fn leave(&self, user_id: i64, conn_id: Uuid) {
        let mut rooms = self.inner.rooms.write().await;
        if let Some(room) = rooms.get_mut(&user_id) {
            room.remove(&conn_id);
            if room.is_empty() {
                rooms.remove(&user_id);
            }
        }
    }

    /// Emit to every socket in `user_id`'s room. Returns how many sockets
    /// accepted the event.
    pub async fn send_to_room(&self, user_id: i64, event: GatewayEvent) -> usize {
        let rooms = self.inner.rooms.read().await;
        let Some(room) = rooms.get(&user_id) else {
            return 0;
        };
        room.values()
            .filter(|tx| tx.send(event.clone()).is_ok())
            .count()
    }

    /// Emit to a single socket only.
    pub async fn send_to_connection(&self, user_id: i64, conn_id: Uuid, event: GatewayEvent) {
        let rooms = self.inner.rooms.read().await;
        if let Some(tx) = rooms.get(&user_id).and_then(|room| room.get(&conn_id)) {
            let _ = tx.send(event);
        }
    }

    pub async fn session_count(&self, user_id: i64) -> usize {
        self.inner
            .rooms
            .read()
            .await
            .get(&user_id)
            .map_or(0, |room| room.len())
    }
}
