use std::sync::Arc;
use std::time::Instant;

use log::{debug, error, info, warn};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::sleep;

use crate::bus::{BusEvent, MessageBus};
use crate::command;
use crate::identity::NodeId;
use crate::registry::FollowerRegistry;
use crate::wire::{
    self, Message, ELECTION_TOPIC, HEARTBEAT_TOPIC, MASTER_TOPIC, RESPONSE_TOPIC,
};

use super::{ElectionConfig, ElectionError, NodeEvent, NodeRole};

/// The per-node election and liveness state machine.
///
/// All mutation happens through [`handle_event`](Self::handle_event), driven
/// by a single event loop, so no two transitions ever interleave. Outbound
/// publishes are fire-and-forget tasks; nothing here waits on the wire.
pub struct ElectionNode {
    id: NodeId,
    config: ElectionConfig,
    bus: Arc<dyn MessageBus>,
    // Feeds timer events (election timeout, heartbeat ticks) back into the
    // same queue the bus events arrive on.
    events: mpsc::Sender<NodeEvent>,

    role: NodeRole,
    election_in_progress: bool,
    // Stamped into each armed timeout so a timer from a conceded round
    // cannot fire into a later one.
    election_round: u64,
    last_heartbeat_seen: Instant,
    suppress_until: Option<Instant>,

    followers: FollowerRegistry,
    heartbeat_task: Option<JoinHandle<()>>,
}

impl ElectionNode {
    pub fn new(
        id: NodeId,
        config: ElectionConfig,
        bus: Arc<dyn MessageBus>,
        events: mpsc::Sender<NodeEvent>,
    ) -> Self {
        Self {
            id,
            config,
            bus,
            events,
            role: NodeRole::Idle,
            election_in_progress: false,
            election_round: 0,
            last_heartbeat_seen: Instant::now(),
            suppress_until: None,
            followers: FollowerRegistry::new(),
            heartbeat_task: None,
        }
    }

    pub fn id(&self) -> &NodeId {
        &self.id
    }

    pub fn role(&self) -> NodeRole {
        self.role.clone()
    }

    pub fn is_master(&self) -> bool {
        self.role.is_leader()
    }

    pub fn follower_count(&self) -> usize {
        self.followers.len()
    }

    pub fn handle_event(&mut self, event: NodeEvent) -> Result<(), ElectionError> {
        match event {
            NodeEvent::Bus(BusEvent::Message { topic, payload }) => {
                match wire::decode(&topic, &payload) {
                    Ok(message) => self.handle_message(message),
                    Err(e) => {
                        warn!("Dropping message: {e}");
                        Ok(())
                    }
                }
            }
            NodeEvent::Bus(BusEvent::ConnectionLost) => {
                // The bus reconnects and restores subscriptions on its own;
                // the state machine just rides it out.
                warn!("Broker connection lost; awaiting transport reconnect");
                Ok(())
            }
            NodeEvent::PollTick => {
                self.check_liveness();
                Ok(())
            }
            NodeEvent::HeartbeatTick => {
                if self.is_master() {
                    self.publish(HEARTBEAT_TOPIC, self.id.to_string());
                }
                Ok(())
            }
            NodeEvent::ElectionTimeout { round } => {
                self.on_election_timeout(round);
                Ok(())
            }
        }
    }

    fn handle_message(&mut self, message: Message) -> Result<(), ElectionError> {
        match message {
            Message::Candidacy { node_id } => self.on_candidacy(node_id),
            Message::MasterAnnouncement { node_id } => self.on_master_announcement(node_id),
            Message::Heartbeat { .. } => self.on_heartbeat(),
            Message::Register { node_id, status } => self.on_register(node_id, status),
            Message::CommandRequest { command } => self.on_command(&command),
            Message::CommandResponse {
                node_id,
                kind,
                data,
            } => {
                if self.is_master() {
                    info!("Response from node {node_id}: {kind}:{data}");
                } else {
                    debug!("Ignoring response from {node_id} (not master)");
                }
            }
        }
        Ok(())
    }

    /// Broadcast our candidacy and arm the single-shot election timeout.
    ///
    /// Refuses while an election is already in progress or inside the
    /// suppression window. Returns whether an election was actually started.
    pub fn start_election(&mut self) -> bool {
        if self.election_in_progress {
            return false;
        }
        let now = Instant::now();
        if self.suppressed(now) {
            return false;
        }

        info!("Starting election...");
        self.election_in_progress = true;
        self.role = NodeRole::Electing;
        self.election_round += 1;

        self.publish(ELECTION_TOPIC, wire::encode_candidacy(&self.id));

        let round = self.election_round;
        let timeout = self.config.election_timeout();
        let events = self.events.clone();
        tokio::spawn(async move {
            sleep(timeout).await;
            let _ = events.send(NodeEvent::ElectionTimeout { round }).await;
        });

        true
    }

    fn on_candidacy(&mut self, candidate: NodeId) {
        match candidate.cmp(&self.id) {
            std::cmp::Ordering::Greater => {
                info!("Node \"{candidate}\" is more eligible. Standing down.");
                self.suppress_until = Some(Instant::now() + self.config.election_cooldown());
                self.election_in_progress = false;
                if self.role == NodeRole::Electing {
                    self.role = NodeRole::Follower { leader: None };
                }
            }
            std::cmp::Ordering::Less => {
                // Out-shout the weaker candidate. The armed timeout, if any,
                // is deliberately not reset.
                info!("More eligible than \"{candidate}\". Sending own ID.");
                self.publish(ELECTION_TOPIC, wire::encode_candidacy(&self.id));
            }
            std::cmp::Ordering::Equal => {
                // Self-echo or duplicate delivery.
            }
        }
    }

    fn on_election_timeout(&mut self, round: u64) {
        if !self.election_in_progress || round != self.election_round {
            debug!("Ignoring stale election timeout (round {round})");
            return;
        }

        info!("Election timed out unopposed. Declaring self as master.");
        self.election_in_progress = false;
        self.become_leader();
        self.publish(MASTER_TOPIC, self.id.to_string());
    }

    fn on_master_announcement(&mut self, leader: NodeId) {
        info!("New master announced: {leader}");
        // Authoritative: overrides any in-progress election.
        self.election_in_progress = false;

        if leader == self.id {
            if !self.is_master() {
                self.become_leader();
            }
        } else {
            if self.is_master() {
                self.stop_heartbeat();
            }
            self.role = NodeRole::Follower {
                leader: Some(leader),
            };
        }
    }

    fn on_heartbeat(&mut self) {
        // Heartbeats prove liveness, not an identity claim: the leader
        // belief only ever changes via an explicit master announcement.
        self.last_heartbeat_seen = Instant::now();
        if self.role == NodeRole::Idle {
            self.role = NodeRole::Follower { leader: None };
        }
    }

    fn on_register(&mut self, node_id: NodeId, status: Option<String>) {
        if node_id == self.id || status.as_deref() == Some("MASTER") {
            return;
        }
        if self.followers.register(node_id.clone()) {
            info!("Registered node: {node_id}");
        }
    }

    fn on_command(&mut self, command_name: &str) {
        match command::dispatch(command_name) {
            Some((kind, data)) => {
                info!("Received command: {command_name}");
                self.publish(RESPONSE_TOPIC, wire::encode_response(&self.id, kind, &data));
            }
            None => debug!("Ignoring unsupported command: {command_name}"),
        }
    }

    /// One liveness-monitor sample: a follower whose master has gone stale
    /// starts an election and re-arms the suppression window, so a dead
    /// leader triggers exactly one candidacy per cooldown.
    fn check_liveness(&mut self) {
        if self.election_in_progress || self.is_master() {
            return;
        }

        let now = Instant::now();
        if now.duration_since(self.last_heartbeat_seen) <= self.config.stale_threshold() {
            return;
        }
        if self.suppressed(now) {
            return;
        }

        warn!("Master seems to have died. Starting new election.");
        if self.start_election() {
            self.suppress_until = Some(now + self.config.election_cooldown());
        }
    }

    pub fn broadcast_command_to_all_followers(
        &self,
        command_name: &str,
    ) -> Result<usize, ElectionError> {
        if !self.is_master() {
            return Err(ElectionError::NotMaster);
        }
        for follower in self.followers.iter() {
            self.publish(&wire::command_topic(follower), command_name.to_string());
        }
        Ok(self.followers.len())
    }

    fn become_leader(&mut self) {
        info!("Node {} is now master", self.id);
        self.role = NodeRole::Leader;
        self.start_heartbeat();
    }

    fn start_heartbeat(&mut self) {
        if self.heartbeat_task.is_some() {
            return;
        }
        let events = self.events.clone();
        let interval = self.config.heartbeat_interval();
        self.heartbeat_task = Some(tokio::spawn(async move {
            loop {
                if events.send(NodeEvent::HeartbeatTick).await.is_err() {
                    break;
                }
                sleep(interval).await;
            }
        }));
    }

    /// Must run the instant leadership is lost.
    pub fn stop_heartbeat(&mut self) {
        if let Some(task) = self.heartbeat_task.take() {
            task.abort();
        }
    }

    fn suppressed(&self, now: Instant) -> bool {
        matches!(self.suppress_until, Some(until) if now < until)
    }

    fn publish(&self, topic: &str, payload: String) {
        let bus = Arc::clone(&self.bus);
        let topic = topic.to_string();
        tokio::spawn(async move {
            if let Err(e) = bus.publish(&topic, &payload).await {
                error!("Publish to {topic} failed: {e}");
            }
        });
    }
}

impl Drop for ElectionNode {
    fn drop(&mut self) {
        self.stop_heartbeat();
    }
}
