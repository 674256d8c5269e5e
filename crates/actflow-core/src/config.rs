//! Engine configuration

use crate::events::DEFAULT_EVENT_HISTORY;
use serde::{Deserialize, Serialize};

fn default_max_sync_steps() -> usize {
    256
}

fn default_event_history() -> usize {
    DEFAULT_EVENT_HISTORY
}

/// Tunables for playback
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Synchronous node advances a player performs before yielding through a
    /// zero-delay timer. Keeps all-scene cycles from starving the host.
    #[serde(default = "default_max_sync_steps")]
    pub max_sync_steps: usize,

    /// Seed for random trackers. `None` seeds from the thread RNG.
    #[serde(default)]
    pub random_seed: Option<u64>,

    /// Number of events kept in the session history
    #[serde(default = "default_event_history")]
    pub event_history: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_sync_steps: default_max_sync_steps(),
            random_seed: None,
            event_history: default_event_history(),
        }
    }
}

impl EngineConfig {
    /// Config with a fixed random seed, for reproducible runs
    pub fn seeded(seed: u64) -> Self {
        Self {
            random_seed: Some(seed),
            ..Self::default()
        }
    }
}
