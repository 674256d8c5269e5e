//! ActFlow Core - Act graph model and playback engine
//!
//! This crate contains everything needed to author and play acts:
//! - Act graph model (nodes, connections, triggers)
//! - Playback controller and tracker sub-engine
//! - Timer scheduling and the playback session
//! - Scene store and DMX output interfaces
//! - Static graph validation

pub mod act;
pub mod condition;
pub mod config;
pub mod error;
pub mod events;
mod handlers;
pub mod logging;
pub mod output;
pub mod player;
pub mod runtime;
pub mod scene;
pub mod scheduler;
pub mod session;
pub mod tracker;
pub mod validate;

// --- Re-exports grouped by category ---

// Act model
pub use act::{
    Act, ActConnection, ActId, ActNode, ActTriggers, ConnectionId, ConnectionKind, FixtureId,
    MidiActTrigger, NodeId, NodeKind, OscActTrigger, PlaybackState, Position, ScenePayload,
    TransitionCurve, TransitionPayload, TransitionShape, WaitPayload,
};
pub use condition::{
    ComparisonOperator, ConditionPayload, ConditionPredicate, SignalRef, BRANCH_FALSE,
    BRANCH_TRUE,
};
pub use tracker::{TrackerDirection, TrackerMode, TrackerPayload, TrackerPosition};

// Playback
pub use config::EngineConfig;
pub use events::{EventBus, EventSink, PlaybackEvent, StopReason};
pub use player::{ActPlayer, PlaybackEnv};
pub use runtime::PlaybackRuntime;
pub use scheduler::{PlayerId, Scheduler, TimerHandle, TimerQueue, TimerToken};
pub use session::PlaybackSession;

// Output & scenes
pub use output::{DmxOutput, SignalBoard, SignalSource};
pub use scene::{Scene, SceneLibrary, SceneStore};

// Errors, validation & logging
pub use error::{ActError, GraphError, SessionError};
pub use logging::LogConfig;
pub use validate::{validate, GraphIssue, Severity};
