use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Timing constants for the election and liveness machinery, in milliseconds.
///
/// The stale threshold must exceed the heartbeat interval by a comfortable
/// margin so that one missed delivery does not trigger a false election; the
/// poll interval is only a sampling granularity.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ElectionConfig {
    /// How long a candidacy stays open before self-declaring as master.
    pub election_timeout_ms: u64,
    /// Cadence of the leader's heartbeat emission.
    pub heartbeat_interval_ms: u64,
    /// Maximum tolerated gap since the last observed heartbeat.
    pub stale_threshold_ms: u64,
    /// Sampling interval of the liveness monitor.
    pub poll_interval_ms: u64,
    /// Suppression window after conceding or forcing an election.
    pub election_cooldown_ms: u64,
}

impl Default for ElectionConfig {
    fn default() -> Self {
        Self {
            election_timeout_ms: 5_000,
            heartbeat_interval_ms: 60_000,
            stale_threshold_ms: 90_000,
            poll_interval_ms: 10_000,
            election_cooldown_ms: 600_000,
        }
    }
}

impl ElectionConfig {
    pub fn election_timeout(&self) -> Duration {
        Duration::from_millis(self.election_timeout_ms)
    }

    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_millis(self.heartbeat_interval_ms)
    }

    pub fn stale_threshold(&self) -> Duration {
        Duration::from_millis(self.stale_threshold_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn election_cooldown(&self) -> Duration {
        Duration::from_millis(self.election_cooldown_ms)
    }
}
