//! Playback events
//!
//! Players report what they do through an [`EventSink`]. [`EventBus`] keeps
//! a bounded history and forwards every event to crossbeam subscribers, so a
//! UI thread or telemetry task can follow playback without touching the
//! engine.

use crate::act::{ActId, NodeId};
use crate::error::ActError;
use crate::scheduler::PlayerId;
use crossbeam_channel::{unbounded, Receiver, Sender};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Why a player went back to idle
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum StopReason {
    /// The last node had no outgoing edge
    Completed,
    /// `stop()` was called
    StoppedByUser,
    /// Playback could not continue
    Error(ActError),
}

/// Something observable happened during playback
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlaybackEvent {
    NodeEntered {
        player: PlayerId,
        act: ActId,
        node: NodeId,
    },
    PlaybackStopped {
        player: PlayerId,
        act: ActId,
        reason: StopReason,
    },
    /// A recovered problem that did not stop playback
    Warning {
        player: PlayerId,
        act: ActId,
        error: ActError,
    },
}

impl PlaybackEvent {
    pub fn player(&self) -> PlayerId {
        match self {
            PlaybackEvent::NodeEntered { player, .. }
            | PlaybackEvent::PlaybackStopped { player, .. }
            | PlaybackEvent::Warning { player, .. } => *player,
        }
    }
}

/// Receiver of playback events
pub trait EventSink {
    fn emit(&mut self, event: PlaybackEvent);
}

impl EventSink for Vec<PlaybackEvent> {
    fn emit(&mut self, event: PlaybackEvent) {
        self.push(event);
    }
}

impl EventSink for Sender<PlaybackEvent> {
    fn emit(&mut self, event: PlaybackEvent) {
        // a dropped receiver just means nobody is listening
        let _ = self.send(event);
    }
}

/// Default history length kept by [`EventBus`]
pub const DEFAULT_EVENT_HISTORY: usize = 1024;

/// Event history plus fan-out to channel subscribers
#[derive(Debug)]
pub struct EventBus {
    history: VecDeque<PlaybackEvent>,
    capacity: usize,
    subscribers: Vec<Sender<PlaybackEvent>>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_EVENT_HISTORY)
    }
}

impl EventBus {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            history: VecDeque::with_capacity(capacity.min(DEFAULT_EVENT_HISTORY)),
            capacity: capacity.max(1),
            subscribers: Vec::new(),
        }
    }

    /// Open a new subscription; it sees events emitted from now on
    pub fn subscribe(&mut self) -> Receiver<PlaybackEvent> {
        let (tx, rx) = unbounded();
        self.subscribers.push(tx);
        rx
    }

    pub fn history(&self) -> impl Iterator<Item = &PlaybackEvent> {
        self.history.iter()
    }

    /// Take the buffered history, leaving it empty
    pub fn drain(&mut self) -> Vec<PlaybackEvent> {
        self.history.drain(..).collect()
    }
}

impl EventSink for EventBus {
    fn emit(&mut self, event: PlaybackEvent) {
        self.subscribers
            .retain(|tx| tx.send(event.clone()).is_ok());
        if self.history.len() == self.capacity {
            self.history.pop_front();
        }
        self.history.push_back(event);
    }
}
