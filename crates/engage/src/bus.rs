use crate::events::EventPublisher;
use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

const DEFAULT_CAPACITY: usize = 1024;

/// A message as seen by in-process subscribers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PublishedEvent {
    pub channel: String,
    pub key: String,
    pub payload: serde_json::Value,
}

/// In-process [`EventPublisher`] over a broadcast channel.
///
/// Delivery is at-most-once: subscribers that fall more than `capacity`
/// messages behind get `RecvError::Lagged` and lose the skipped events.
/// Publishing with no subscribers succeeds and drops the event.
#[derive(Clone)]
pub struct BroadcastPublisher {
    sender: broadcast::Sender<PublishedEvent>,
}

impl BroadcastPublisher {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<PublishedEvent> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for BroadcastPublisher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EventPublisher for BroadcastPublisher {
    async fn publish(&self, channel: &str, key: &str, payload: serde_json::Value) -> Result<()> {
        let event = PublishedEvent {
            channel: channel.to_string(),
            key: key.to_string(),
            payload,
        };
        // Err only means nobody is listening.
        if self.sender.send(event).is_err() {
            tracing::trace!(channel, key, "no subscribers, event dropped");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn subscribers_receive_published_events() {
        let bus = BroadcastPublisher::new();
        let mut rx = bus.subscribe();

        bus.publish("engagement.vote.cast", "5", json!({"voteId": 5}))
            .await
            .unwrap();

        let got = rx.recv().await.unwrap();
        assert_eq!(got.channel, "engagement.vote.cast");
        assert_eq!(got.key, "5");
        assert_eq!(got.payload["voteId"], 5);
    }

    #[tokio::test]
    async fn publishing_without_subscribers_is_ok() {
        let bus = BroadcastPublisher::new();
        assert_eq!(bus.subscriber_count(), 0);
        assert!(bus.publish("c", "1", json!(null)).await.is_ok());
    }

    #[tokio::test]
    async fn lagging_subscriber_misses_events() {
        let bus = BroadcastPublisher::with_capacity(2);
        let mut rx = bus.subscribe();
        for i in 0..4 {
            bus.publish("c", &i.to_string(), json!(i)).await.unwrap();
        }
        assert!(matches!(
            rx.recv().await,
            Err(broadcast::error::RecvError::Lagged(2))
        ));
        assert_eq!(rx.recv().await.unwrap().key, "2");
    }
}
