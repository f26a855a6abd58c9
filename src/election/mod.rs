mod config;
mod error;
mod node;
mod state;

pub use self::config::ElectionConfig;
pub use self::error::ElectionError;
pub use self::node::ElectionNode;
pub use self::state::NodeRole;

use std::sync::{Arc, Mutex};

use log::error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::sleep;

use crate::bus::{BusEvent, MessageBus};
use crate::identity::NodeId;
use crate::wire::{
    self, ELECTION_TOPIC, HEARTBEAT_TOPIC, MASTER_TOPIC, NODES_TOPIC, RESPONSE_TOPIC,
};

/// Everything the event loop can be woken by: bus traffic and the three
/// kinds of timer.
#[derive(Debug)]
pub enum NodeEvent {
    Bus(BusEvent),
    PollTick,
    HeartbeatTick,
    ElectionTimeout { round: u64 },
}

/// A running node: subscriptions established, presence registered, event
/// loop and liveness monitor spawned.
///
/// Every state transition runs inside the single event loop under the node
/// lock, one event at a time; the accessors below only take the lock for a
/// read.
pub struct Node {
    inner: Arc<Mutex<ElectionNode>>,
    tasks: Vec<JoinHandle<()>>,
}

impl Node {
    pub async fn start(
        config: ElectionConfig,
        id: NodeId,
        bus: Arc<dyn MessageBus>,
    ) -> Result<Self, ElectionError> {
        let (events_tx, mut events_rx) = mpsc::channel::<NodeEvent>(128);
        let (bus_tx, mut bus_rx) = mpsc::channel::<BusEvent>(128);

        // A node with no subscriptions is inert, so these failures are the
        // one class of transport error that aborts startup.
        for topic in [
            ELECTION_TOPIC,
            MASTER_TOPIC,
            NODES_TOPIC,
            HEARTBEAT_TOPIC,
            RESPONSE_TOPIC,
        ] {
            bus.subscribe(topic, bus_tx.clone()).await?;
        }
        bus.subscribe(&wire::command_topic(&id), bus_tx.clone())
            .await?;

        // Presence registration is best-effort, like every later publish.
        if let Err(e) = bus
            .publish(NODES_TOPIC, &wire::encode_register(&id, "FOLLOWER"))
            .await
        {
            error!("Failed to register node {id}: {e}");
        }

        let poll_interval = config.poll_interval();
        let inner = Arc::new(Mutex::new(ElectionNode::new(
            id,
            config,
            bus,
            events_tx.clone(),
        )));

        let mut tasks = Vec::new();

        // Forward bus deliveries into the single event queue.
        let forward_tx = events_tx.clone();
        tasks.push(tokio::spawn(async move {
            while let Some(event) = bus_rx.recv().await {
                if forward_tx.send(NodeEvent::Bus(event)).await.is_err() {
                    break;
                }
            }
        }));

        // The event loop: the only place node state is mutated.
        let loop_inner = Arc::clone(&inner);
        tasks.push(tokio::spawn(async move {
            while let Some(event) = events_rx.recv().await {
                let mut node = loop_inner.lock().unwrap();
                if let Err(e) = node.handle_event(event) {
                    error!("Error handling event: {e}");
                }
            }
        }));

        // Liveness monitor sampling tick.
        tasks.push(tokio::spawn(async move {
            loop {
                sleep(poll_interval).await;
                if events_tx.send(NodeEvent::PollTick).await.is_err() {
                    break;
                }
            }
        }));

        Ok(Self { inner, tasks })
    }

    pub fn node_id(&self) -> NodeId {
        self.inner.lock().unwrap().id().clone()
    }

    pub fn role(&self) -> NodeRole {
        self.inner.lock().unwrap().role()
    }

    pub fn is_master(&self) -> bool {
        self.inner.lock().unwrap().is_master()
    }

    pub fn follower_count(&self) -> usize {
        self.inner.lock().unwrap().follower_count()
    }

    /// Fan a command out to every registered follower. Fails with
    /// [`ElectionError::NotMaster`] unless this node currently holds
    /// leadership.
    pub fn broadcast_command_to_all_followers(
        &self,
        command_name: &str,
    ) -> Result<usize, ElectionError> {
        self.inner
            .lock()
            .unwrap()
            .broadcast_command_to_all_followers(command_name)
    }

    /// Stop the node outright: event loop, timers and any heartbeat emission
    /// all halt. Used to take a node out of a cluster (tests use it to kill
    /// a leader).
    pub fn shutdown(&mut self) {
        for task in self.tasks.drain(..) {
            task.abort();
        }
        self.inner.lock().unwrap().stop_heartbeat();
    }
}

impl Drop for Node {
    fn drop(&mut self) {
        self.shutdown();
    }
}
