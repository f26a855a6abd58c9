use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use log::debug;
use tokio::sync::mpsc;

use super::{BusError, BusEvent, MessageBus};

/// In-process broker: a shared topic -> subscriber map.
///
/// Every node in a simulated cluster (and every test) holds a clone of the
/// same bus. Delivery is deliberately lossy in the same ways a real broker
/// connection is: a full or closed sink simply misses the message.
#[derive(Clone, Default)]
pub struct MemoryBus {
    topics: Arc<Mutex<HashMap<String, Vec<mpsc::Sender<BusEvent>>>>>,
}

impl MemoryBus {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl MessageBus for MemoryBus {
    async fn publish(&self, topic: &str, payload: &str) -> Result<(), BusError> {
        let sinks = {
            let mut topics = self.topics.lock().unwrap();
            match topics.get_mut(topic) {
                Some(sinks) => {
                    sinks.retain(|s| !s.is_closed());
                    sinks.clone()
                }
                None => Vec::new(),
            }
        };

        for sink in sinks {
            let event = BusEvent::Message {
                topic: topic.to_string(),
                payload: payload.to_string(),
            };
            if sink.try_send(event).is_err() {
                debug!("Dropping message on {topic}: subscriber gone or backlogged");
            }
        }

        Ok(())
    }

    async fn subscribe(&self, topic: &str, sink: mpsc::Sender<BusEvent>) -> Result<(), BusError> {
        let mut topics = self.topics.lock().unwrap();
        topics.entry(topic.to_string()).or_default().push(sink);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::time::timeout;

    #[tokio::test]
    async fn delivers_to_matching_subscribers_only() {
        let bus = MemoryBus::new();
        let (tx_a, mut rx_a) = mpsc::channel(8);
        let (tx_b, mut rx_b) = mpsc::channel(8);

        bus.subscribe("alpha", tx_a).await.expect("subscribe");
        bus.subscribe("beta", tx_b).await.expect("subscribe");

        bus.publish("alpha", "hello").await.expect("publish");

        let ev = timeout(Duration::from_secs(1), rx_a.recv())
            .await
            .expect("timely")
            .expect("event");
        assert_eq!(
            ev,
            BusEvent::Message {
                topic: "alpha".to_string(),
                payload: "hello".to_string(),
            }
        );
        assert!(rx_b.try_recv().is_err());
    }

    #[tokio::test]
    async fn delivers_to_every_subscriber_including_publisher() {
        let bus = MemoryBus::new();
        let (tx_a, mut rx_a) = mpsc::channel(8);
        let (tx_b, mut rx_b) = mpsc::channel(8);

        bus.subscribe("alpha", tx_a).await.expect("subscribe");
        bus.subscribe("alpha", tx_b).await.expect("subscribe");

        bus.publish("alpha", "x").await.expect("publish");

        assert!(timeout(Duration::from_secs(1), rx_a.recv())
            .await
            .expect("timely")
            .is_some());
        assert!(timeout(Duration::from_secs(1), rx_b.recv())
            .await
            .expect("timely")
            .is_some());
    }

    #[tokio::test]
    async fn publish_to_topic_without_subscribers_is_a_no_op() {
        let bus = MemoryBus::new();
        bus.publish("void", "anyone there").await.expect("publish");
    }

    #[tokio::test]
    async fn dropped_subscribers_are_pruned() {
        let bus = MemoryBus::new();
        let (tx, rx) = mpsc::channel(8);
        bus.subscribe("alpha", tx).await.expect("subscribe");
        drop(rx);

        bus.publish("alpha", "x").await.expect("publish");
        assert!(bus.topics.lock().unwrap().get("alpha").unwrap().is_empty());
    }
}
