//! Error types for act authoring and playback

use crate::act::{ConnectionId, NodeId};
use crate::scheduler::PlayerId;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Conditions raised while an act is playing.
///
/// None of these are fatal to the process. Some of them end the act
/// (reported through `PlaybackStopped`), the rest are reported as warnings
/// while playback carries on.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActError {
    /// The act has no nodes to start from
    #[error("act has no nodes")]
    EmptyGraph,

    /// A connection points at a node that does not exist
    #[error("connection {connection} from {from} references missing node {to}")]
    DanglingEdge {
        /// The offending connection
        connection: ConnectionId,
        /// Node the connection leaves
        from: NodeId,
        /// Missing target id
        to: NodeId,
    },

    /// A condition node found neither a matching conditional edge nor a default edge
    #[error("condition node {node} has no edge for branch '{branch}'")]
    NoMatchingBranch {
        /// The condition node
        node: NodeId,
        /// Branch label the predicate evaluated to
        branch: String,
    },

    /// A scene node names a scene the store does not know
    #[error("scene node {node} references unknown scene '{scene}'")]
    MissingScene {
        /// The scene node
        node: NodeId,
        /// Requested scene name
        scene: String,
    },

    /// A tracker node has nothing to cycle through
    #[error("tracker node {node} has no children")]
    EmptyTrackerList {
        /// The tracker node
        node: NodeId,
    },

    /// A tracker child id does not resolve to a node
    #[error("tracker node {node} references missing child {child}")]
    MissingTrackerChild {
        /// The tracker node
        node: NodeId,
        /// Missing child id
        child: NodeId,
    },

    /// A tracker child is already executing further up the stack
    #[error("tracker node {node} would re-enter {child}, which is already running")]
    TrackerCycle {
        /// The tracker node
        node: NodeId,
        /// Child that is already active
        child: NodeId,
    },
}

impl ActError {
    /// True for conditions that end playback rather than merely warn
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ActError::EmptyGraph | ActError::DanglingEdge { .. } | ActError::NoMatchingBranch { .. }
        )
    }
}

/// Errors raised by a [`PlaybackSession`](crate::session::PlaybackSession)
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// No player with this id is loaded
    #[error("unknown player: {0}")]
    UnknownPlayer(PlayerId),

    /// The act refused to start
    #[error(transparent)]
    Act(#[from] ActError),
}

/// Errors raised by authoring operations on an [`Act`](crate::act::Act)
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GraphError {
    /// Node id not present in the act
    #[error("node not found: {0}")]
    NodeNotFound(NodeId),

    /// Connection id not present in the act
    #[error("connection not found: {0}")]
    ConnectionNotFound(ConnectionId),

    /// A node with this id already exists
    #[error("duplicate node id: {0}")]
    DuplicateNode(NodeId),

    /// Conditional edges need a guard to be selectable
    #[error("conditional connection from {0} is missing a guard")]
    MissingGuard(NodeId),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ActError::MissingScene {
            node: NodeId::from("node_1"),
            scene: "Blue Wash".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "scene node node_1 references unknown scene 'Blue Wash'"
        );
    }

    #[test]
    fn test_terminal_classification() {
        assert!(ActError::EmptyGraph.is_terminal());
        assert!(ActError::NoMatchingBranch {
            node: NodeId::from("c"),
            branch: "true".to_string()
        }
        .is_terminal());
        assert!(!ActError::EmptyTrackerList {
            node: NodeId::from("t")
        }
        .is_terminal());
    }
}
