//! Tracker sub-engine
//!
//! A tracker node repeatedly plays one of its child nodes, moving through the
//! child list according to its [`TrackerMode`]. The stepping rule itself is a
//! pure function ([`advance`]); the player owns the position between steps.

use crate::act::NodeId;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// How a tracker moves through its children
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrackerMode {
    /// 0, 1, .., n-1, n-2, .., 0, 1, ..
    #[default]
    Bounce,
    /// Same walk as [`TrackerMode::Bounce`]
    PingPong,
    /// Uniformly random child every step
    Random,
    /// 0, 1, .., n-1, then the tracker completes
    Once,
}

/// Travel direction for the bouncing modes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrackerDirection {
    #[default]
    Forward,
    Backward,
}

/// Index of the child to play next, plus the bounce direction
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TrackerPosition {
    pub index: usize,
    pub direction: TrackerDirection,
}

impl TrackerPosition {
    pub fn new(index: usize, direction: TrackerDirection) -> Self {
        Self { index, direction }
    }
}

fn default_step_delay_ms() -> u64 {
    2000
}

/// Payload of a `tracker` node
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackerPayload {
    /// Children in play order
    pub children: Vec<NodeId>,
    #[serde(default)]
    pub mode: TrackerMode,
    /// Pause between the end of one child and the start of the next step
    #[serde(default = "default_step_delay_ms")]
    pub step_delay_ms: u64,
    /// Where playback starts each time the act is started
    #[serde(default)]
    pub initial: TrackerPosition,
}

impl TrackerPayload {
    pub fn new(children: Vec<NodeId>) -> Self {
        Self {
            children,
            mode: TrackerMode::default(),
            step_delay_ms: default_step_delay_ms(),
            initial: TrackerPosition::default(),
        }
    }

    pub fn with_mode(mut self, mode: TrackerMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_step_delay(mut self, step_delay_ms: u64) -> Self {
        self.step_delay_ms = step_delay_ms;
        self
    }
}

/// Result of stepping a tracker past the child it just played
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackerAdvance {
    /// Play the child at this position after the step delay
    Continue(TrackerPosition),
    /// A `once` tracker played its last child
    Finished,
}

/// Compute the position following `current` for a list of `len` children.
///
/// `len` must be non-zero; the player never steps an empty tracker.
pub fn advance<R: Rng + ?Sized>(
    mode: TrackerMode,
    len: usize,
    current: TrackerPosition,
    rng: &mut R,
) -> TrackerAdvance {
    debug_assert!(len > 0);
    let last = len.saturating_sub(1);
    let index = current.index.min(last);

    match mode {
        TrackerMode::Bounce | TrackerMode::PingPong => {
            TrackerAdvance::Continue(bounce(len, index, current.direction))
        }
        TrackerMode::Random => TrackerAdvance::Continue(TrackerPosition::new(
            rng.random_range(0..len),
            current.direction,
        )),
        TrackerMode::Once => {
            if index >= last {
                TrackerAdvance::Finished
            } else {
                TrackerAdvance::Continue(TrackerPosition::new(index + 1, current.direction))
            }
        }
    }
}

fn bounce(len: usize, index: usize, direction: TrackerDirection) -> TrackerPosition {
    if len == 1 {
        return TrackerPosition::new(0, direction);
    }
    match direction {
        TrackerDirection::Forward if index >= len - 1 => {
            TrackerPosition::new(len - 2, TrackerDirection::Backward)
        }
        TrackerDirection::Forward => TrackerPosition::new(index + 1, TrackerDirection::Forward),
        TrackerDirection::Backward if index == 0 => {
            TrackerPosition::new(1, TrackerDirection::Forward)
        }
        TrackerDirection::Backward => TrackerPosition::new(index - 1, TrackerDirection::Backward),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn walk(mode: TrackerMode, len: usize, steps: usize) -> Vec<usize> {
        let mut rng = StdRng::seed_from_u64(7);
        let mut position = TrackerPosition::default();
        let mut visited = vec![position.index];
        for _ in 0..steps {
            match advance(mode, len, position, &mut rng) {
                TrackerAdvance::Continue(next) => {
                    position = next;
                    visited.push(next.index);
                }
                TrackerAdvance::Finished => break,
            }
        }
        visited
    }

    #[test]
    fn test_bounce_sequence() {
        assert_eq!(
            walk(TrackerMode::Bounce, 3, 8),
            vec![0, 1, 2, 1, 0, 1, 2, 1, 0]
        );
    }

    #[test]
    fn test_pingpong_matches_bounce() {
        assert_eq!(
            walk(TrackerMode::PingPong, 4, 12),
            walk(TrackerMode::Bounce, 4, 12)
        );
    }

    #[test]
    fn test_bounce_two_children_alternates() {
        assert_eq!(walk(TrackerMode::Bounce, 2, 5), vec![0, 1, 0, 1, 0, 1]);
    }

    #[test]
    fn test_bounce_single_child_stays_put() {
        assert_eq!(walk(TrackerMode::Bounce, 1, 4), vec![0, 0, 0, 0, 0]);
    }

    #[test]
    fn test_once_finishes_after_last_child() {
        assert_eq!(walk(TrackerMode::Once, 3, 10), vec![0, 1, 2]);
    }

    #[test]
    fn test_random_single_child() {
        assert_eq!(walk(TrackerMode::Random, 1, 5), vec![0; 6]);
    }

    #[test]
    fn test_out_of_range_index_is_clamped() {
        let mut rng = StdRng::seed_from_u64(1);
        let stale = TrackerPosition::new(9, TrackerDirection::Forward);
        assert_eq!(
            advance(TrackerMode::Bounce, 3, stale, &mut rng),
            TrackerAdvance::Continue(TrackerPosition::new(1, TrackerDirection::Backward))
        );
    }

    proptest! {
        #[test]
        fn bounce_never_leaves_range_or_repeats(len in 2usize..12, steps in 1usize..64) {
            let visited = walk(TrackerMode::Bounce, len, steps);
            for pair in visited.windows(2) {
                prop_assert!(pair[1] < len);
                prop_assert_eq!(pair[0].abs_diff(pair[1]), 1);
            }
        }

        #[test]
        fn random_stays_in_range(len in 1usize..16, seed in any::<u64>()) {
            let mut rng = StdRng::seed_from_u64(seed);
            let mut position = TrackerPosition::default();
            for _ in 0..32 {
                match advance(TrackerMode::Random, len, position, &mut rng) {
                    TrackerAdvance::Continue(next) => {
                        prop_assert!(next.index < len);
                        position = next;
                    }
                    TrackerAdvance::Finished => prop_assert!(false, "random never finishes"),
                }
            }
        }
    }
}
