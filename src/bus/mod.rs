//! The broadcast channel boundary.
//!
//! The election core never talks to a broker directly; it sees one
//! [`MessageBus`] capability and a stream of [`BusEvent`]s delivered through
//! an ordinary channel. Connection loss is an event like any other, not a
//! scattered callback.

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::mpsc;

mod memory;

pub use memory::MemoryBus;

#[derive(Error, Debug)]
pub enum BusError {
    #[error("publish failed: {0}")]
    Publish(String),

    #[error("subscribe failed: {0}")]
    Subscribe(String),

    #[error("disconnected from broker")]
    Disconnected,
}

/// Everything a transport can hand to a node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BusEvent {
    Message { topic: String, payload: String },
    ConnectionLost,
}

/// Topic-addressed publish/subscribe with at-least-once, unordered-across-
/// topics delivery.
///
/// `publish` is fire-and-forget: implementations must not wait for delivery
/// acknowledgment, and anything published while the underlying connection is
/// down is dropped. An implementation that can lose its connection must
/// reconnect on its own and re-establish every prior subscription before
/// resuming delivery; it signals the outage by emitting
/// [`BusEvent::ConnectionLost`] to each sink.
#[async_trait]
pub trait MessageBus: Send + Sync + 'static {
    async fn publish(&self, topic: &str, payload: &str) -> Result<(), BusError>;

    /// Deliver every message published on `topic` into `sink`, starting now.
    async fn subscribe(&self, topic: &str, sink: mpsc::Sender<BusEvent>) -> Result<(), BusError>;
}
