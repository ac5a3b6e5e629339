use std::sync::Arc;

use futures_util::future::{BoxFuture, join_all};
use tracing::{info, warn};
use weave_types::models::{DeliveryReport, PushPayload, PushSubscription};

#[derive(Debug, thiserror::Error)]
pub enum PushError {
    #[error("subscription keys are missing '{0}'")]
    MissingKey(&'static str),

    /// The push service no longer accepts this endpoint.
    #[error("endpoint gone: {0}")]
    Gone(String),

    #[error("delivery failed: {0}")]
    Delivery(String),
}

/// Delivers one notification to one subscription.
pub trait PushSender: Send + Sync {
    fn send<'a>(
        &'a self,
        subscription: &'a PushSubscription,
        payload: &'a PushPayload,
    ) -> BoxFuture<'a, Result<(), PushError>>;
}

pub type SharedSender = Arc<dyn PushSender>;

/// Sender that records each delivery in the log instead of contacting a
/// push service. Subscriptions still have to carry the keys a real
/// transport would need.
#[derive(Debug, Default, Clone)]
pub struct LogSender;

impl PushSender for LogSender {
    fn send<'a>(
        &'a self,
        subscription: &'a PushSubscription,
        payload: &'a PushPayload,
    ) -> BoxFuture<'a, Result<(), PushError>> {
        Box::pin(async move {
            for key in ["p256dh", "auth"] {
                if subscription.keys.get(key).and_then(|v| v.as_str()).is_none() {
                    return Err(PushError::MissingKey(key));
                }
            }
            info!(
                "push -> user {} [{}]: {} / {}",
                subscription.user_id, subscription.endpoint, payload.title, payload.body
            );
            Ok(())
        })
    }
}

/// Delivers `payload` to every subscription concurrently. Every delivery
/// runs to completion; failures are reported per endpoint.
pub async fn send_to_all(
    sender: &dyn PushSender,
    subscriptions: &[PushSubscription],
    payload: &PushPayload,
) -> Vec<DeliveryReport> {
    let deliveries = subscriptions.iter().map(|sub| async move {
        let result = sender.send(sub, payload).await;
        if let Err(e) = &result {
            warn!("Push to {} failed: {}", sub.endpoint, e);
        }
        DeliveryReport {
            endpoint: sub.endpoint.clone(),
            success: result.is_ok(),
            error: result.err().map(|e| e.to_string()),
        }
    });
    join_all(deliveries).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Mutex;

    fn sub(endpoint: &str, keys: serde_json::Value) -> PushSubscription {
        PushSubscription {
            endpoint: endpoint.into(),
            user_id: 1,
            keys,
        }
    }

    #[derive(Default)]
    struct FlakySender {
        seen: Mutex<Vec<String>>,
    }

    impl PushSender for FlakySender {
        fn send<'a>(
            &'a self,
            subscription: &'a PushSubscription,
            _payload: &'a PushPayload,
        ) -> BoxFuture<'a, Result<(), PushError>> {
            Box::pin(async move {
                self.seen.lock().unwrap().push(subscription.endpoint.clone());
                if subscription.endpoint.ends_with("/dead") {
                    Err(PushError::Gone(subscription.endpoint.clone()))
                } else {
                    Ok(())
                }
            })
        }
    }

    #[tokio::test]
    async fn one_failure_does_not_stop_the_rest() {
        let sender = FlakySender::default();
        let subs = vec![
            sub("https://push/a", json!({})),
            sub("https://push/dead", json!({})),
            sub("https://push/c", json!({})),
        ];

        let reports = send_to_all(&sender, &subs, &PushPayload::new("t", "b")).await;

        assert_eq!(sender.seen.lock().unwrap().len(), 3);
        let ok: Vec<bool> = reports.iter().map(|r| r.success).collect();
        assert_eq!(ok, vec![true, false, true]);
        assert!(reports[1].error.as_deref().unwrap().contains("gone"));
    }

    #[tokio::test]
    async fn log_sender_requires_keys() {
        let payload = PushPayload::new("New message", "hi").with_url("/messaging/1");
        let good = sub("https://push/a", json!({"p256dh": "k", "auth": "a"}));
        let bad = sub("https://push/b", json!({"p256dh": "k"}));

        assert!(LogSender.send(&good, &payload).await.is_ok());
        assert!(matches!(
            LogSender.send(&bad, &payload).await,
            Err(PushError::MissingKey("auth"))
        ));
    }

    #[tokio::test]
    async fn empty_fan_out_is_empty() {
        let reports = send_to_all(&LogSender, &[], &PushPayload::new("t", "b")).await;
        assert!(reports.is_empty());
    }
}
