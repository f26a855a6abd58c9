use std::collections::HashSet;

use crate::identity::NodeId;

/// Leader-side bookkeeping of known followers, fed by `REGISTER` messages.
///
/// Best-effort only: nothing is ever pruned, so a follower that crashes stays
/// in the set until this node restarts.
#[derive(Debug, Default)]
pub struct FollowerRegistry {
    followers: HashSet<NodeId>,
}

impl FollowerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true if the node was not already known. Re-registration is a
    /// no-op.
    pub fn register(&mut self, id: NodeId) -> bool {
        self.followers.insert(id)
    }

    pub fn len(&self) -> usize {
        self.followers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.followers.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &NodeId> {
        self.followers.iter()
    }
}
