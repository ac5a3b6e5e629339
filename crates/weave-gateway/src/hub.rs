use std::sync::Arc;

use tracing::{error, warn};
use weave_db::Database;
use weave_push::{SharedSender, send_to_all};
use weave_types::events::GatewayEvent;
use weave_types::models::{ChatMessage, DeliveryReport, PushPayload};

use crate::dispatcher::Dispatcher;

/// Handles shared by the REST handlers and the WebSocket gateway.
#[derive(Clone)]
pub struct Hub {
    pub db: Arc<Database>,
    pub dispatcher: Dispatcher,
    pub push: SharedSender,
}

#[derive(Debug, thiserror::Error)]
pub enum MessageError {
    #[error("Message cannot be empty")]
    Empty,

    #[error("Cannot send message to non-connected user")]
    NotConnected,

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl Hub {
    pub fn new(db: Arc<Database>, push: SharedSender) -> Self {
        Self {
            db,
            dispatcher: Dispatcher::new(),
            push,
        }
    }

    /// Run blocking database work off the async runtime.
    pub async fn db<F, T>(&self, f: F) -> anyhow::Result<T>
    where
        F: FnOnce(&Database) -> anyhow::Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let db = self.db.clone();
        tokio::task::spawn_blocking(move || f(&db))
            .await
            .map_err(|e| {
                error!("spawn_blocking join error: {}", e);
                anyhow::anyhow!("database task failed: {}", e)
            })?
    }

    pub async fn are_connected(&self, a: i64, b: i64) -> anyhow::Result<bool> {
        self.db(move |db| db.are_connected(a, b)).await
    }

    /// Store a direct message between two connections, emit it to the
    /// recipient's room and notify the recipient's push subscriptions.
    pub async fn send_direct_message(
        &self,
        from_id: i64,
        to_id: i64,
        message: String,
    ) -> Result<ChatMessage, MessageError> {
        if message.trim().is_empty() {
            return Err(MessageError::Empty);
        }

        let stored = self
            .db(move |db| {
                if !db.are_connected(from_id, to_id)? {
                    return Ok(None);
                }
                db.insert_chat(from_id, to_id, &message).map(Some)
            })
            .await?;
        let chat = stored.ok_or(MessageError::NotConnected)?;

        self.dispatcher
            .send_to_room(to_id, GatewayEvent::ReceiveMessage(chat.clone()))
            .await;

        let sender_name = self
            .db(move |db| db.get_full_name(from_id))
            .await
            .ok()
            .flatten()
            .unwrap_or_default();
        let payload = PushPayload::new("New message", format!("{}: {}", sender_name, chat.message))
            .with_url(format!("/messaging/{}", from_id));
        if let Err(e) = self.notify(vec![to_id], &payload).await {
            warn!("Message push lookup for user {} failed: {}", to_id, e);
        }

        Ok(chat)
    }

    /// Deliver `payload` to every subscription of `user_ids`.
    pub async fn notify(
        &self,
        user_ids: Vec<i64>,
        payload: &PushPayload,
    ) -> anyhow::Result<Vec<DeliveryReport>> {
        let subscriptions = self
            .db(move |db| db.subscriptions_for_users(&user_ids))
            .await?;
        if subscriptions.is_empty() {
            return Ok(vec![]);
        }
        Ok(send_to_all(self.push.as_ref(), &subscriptions, payload).await)
    }
}
