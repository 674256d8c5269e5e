//! Per-player mutable playback state

use crate::act::NodeId;
use crate::tracker::{TrackerPayload, TrackerPosition};
use std::collections::HashMap;

/// Tracker positions for one playback, keyed by tracker node id.
///
/// Kept outside the [`Act`](crate::act::Act) so the same act can be played
/// by several players at once.
#[derive(Debug, Clone, Default)]
pub struct PlaybackRuntime {
    trackers: HashMap<NodeId, TrackerPosition>,
}

impl PlaybackRuntime {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current position of a tracker, or its authored initial position
    pub fn tracker_position(&self, node: &NodeId, payload: &TrackerPayload) -> TrackerPosition {
        let position = self
            .trackers
            .get(node)
            .copied()
            .unwrap_or(payload.initial);
        let last = payload.children.len().saturating_sub(1);
        TrackerPosition {
            index: position.index.min(last),
            ..position
        }
    }

    /// Stored position, if the tracker has stepped during this playback
    pub fn stored_position(&self, node: &NodeId) -> Option<TrackerPosition> {
        self.trackers.get(node).copied()
    }

    pub fn set_tracker_position(&mut self, node: NodeId, position: TrackerPosition) {
        self.trackers.insert(node, position);
    }

    /// Forget a tracker's position so it restarts from its initial one
    pub fn reset_tracker(&mut self, node: &NodeId) {
        self.trackers.remove(node);
    }

    pub fn clear(&mut self) {
        self.trackers.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tracker::TrackerDirection;

    #[test]
    fn test_falls_back_to_initial_and_clamps() {
        let node = NodeId::from("t");
        let mut payload = TrackerPayload::new(vec![NodeId::from("a"), NodeId::from("b")]);
        payload.initial = TrackerPosition::new(5, TrackerDirection::Backward);

        let mut runtime = PlaybackRuntime::new();
        assert_eq!(
            runtime.tracker_position(&node, &payload),
            TrackerPosition::new(1, TrackerDirection::Backward)
        );

        runtime.set_tracker_position(node.clone(), TrackerPosition::new(0, TrackerDirection::Forward));
        assert_eq!(runtime.tracker_position(&node, &payload).index, 0);

        runtime.reset_tracker(&node);
        assert_eq!(runtime.stored_position(&node), None);
    }
}
