use serde::{Deserialize, Serialize};

use crate::identity::NodeId;

/// What a node currently believes about leadership.
///
/// `Idle` only exists between startup and the first observed heartbeat or
/// master announcement; a follower that has seen liveness but no identity
/// claim is `Follower { leader: None }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum NodeRole {
    Idle,
    Electing,
    Follower { leader: Option<NodeId> },
    Leader,
}

impl NodeRole {
    pub fn is_leader(&self) -> bool {
        matches!(self, NodeRole::Leader)
    }
}
