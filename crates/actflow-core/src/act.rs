//! Act graph model
//!
//! An [`Act`] is a directed graph of timed lighting operations. Nodes carry a
//! closed [`NodeKind`] with the payload for that kind; connections are kept in
//! insertion order, which is also the order the player uses to break ties
//! between several outgoing edges.

use crate::condition::ConditionPayload;
use crate::error::GraphError;
use crate::tracker::TrackerPayload;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident, $prefix:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Generate a fresh random id
            pub fn generate() -> Self {
                Self(format!(concat!($prefix, "_{}"), uuid::Uuid::new_v4().simple()))
            }

            /// Borrow the raw id string
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }
    };
}

string_id!(
    /// Unique id of an act
    ActId,
    "act"
);
string_id!(
    /// Unique id of a node within an act
    NodeId,
    "node"
);
string_id!(
    /// Unique id of a connection within an act
    ConnectionId,
    "conn"
);

/// Identifier of a patched fixture, used by scene mutes
pub type FixtureId = String;

/// Editor position of a node. The engine never reads it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f32,
    pub y: f32,
}

impl Position {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// Payload of a `scene` node
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScenePayload {
    /// Name of the scene in the scene store
    pub scene: String,
    /// Fixtures whose channels are left untouched when the scene plays
    #[serde(default)]
    pub muted_fixtures: BTreeSet<FixtureId>,
}

impl ScenePayload {
    pub fn new(scene: impl Into<String>) -> Self {
        Self {
            scene: scene.into(),
            muted_fixtures: BTreeSet::new(),
        }
    }

    /// Builder-style helper to mute a fixture
    pub fn muting(mut self, fixture: impl Into<FixtureId>) -> Self {
        self.muted_fixtures.insert(fixture.into());
        self
    }
}

fn default_wait_ms() -> i64 {
    3000
}

/// Payload of a `wait` node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WaitPayload {
    /// Delay before completion. Negative values behave as zero.
    #[serde(default = "default_wait_ms")]
    pub duration_ms: i64,
}

impl Default for WaitPayload {
    fn default() -> Self {
        Self {
            duration_ms: default_wait_ms(),
        }
    }
}

/// Easing applied across a transition
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TransitionCurve {
    Linear,
    EaseIn,
    EaseOut,
    #[default]
    EaseInOut,
}

impl TransitionCurve {
    /// Map linear progress `t` in `[0, 1]` onto the curve
    pub fn ease(self, t: f32) -> f32 {
        let t = t.clamp(0.0, 1.0);
        match self {
            TransitionCurve::Linear => t,
            TransitionCurve::EaseIn => t * t,
            TransitionCurve::EaseOut => t * (2.0 - t),
            // smoothstep
            TransitionCurve::EaseInOut => t * t * (3.0 - 2.0 * t),
        }
    }
}

/// Visual shape of a transition. Does not influence control flow.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransitionShape {
    #[default]
    Fade,
    Crossfade,
    Cut,
    Wipe,
}

fn default_transition_ms() -> i64 {
    1000
}

/// Payload of a `transition` node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionPayload {
    #[serde(default = "default_transition_ms")]
    pub duration_ms: i64,
    #[serde(default)]
    pub curve: TransitionCurve,
    #[serde(default)]
    pub shape: TransitionShape,
}

impl Default for TransitionPayload {
    fn default() -> Self {
        Self {
            duration_ms: default_transition_ms(),
            curve: TransitionCurve::default(),
            shape: TransitionShape::default(),
        }
    }
}

/// What a node does, together with its kind-specific data
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    Scene(ScenePayload),
    Transition(TransitionPayload),
    Wait(WaitPayload),
    Condition(ConditionPayload),
    Tracker(TrackerPayload),
}

impl NodeKind {
    /// Lower-case kind label, as shown in logs
    pub fn label(&self) -> &'static str {
        match self {
            NodeKind::Scene(_) => "scene",
            NodeKind::Transition(_) => "transition",
            NodeKind::Wait(_) => "wait",
            NodeKind::Condition(_) => "condition",
            NodeKind::Tracker(_) => "tracker",
        }
    }
}

/// One operation in an act
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActNode {
    pub id: NodeId,
    pub name: String,
    pub kind: NodeKind,
    #[serde(default)]
    pub position: Position,
}

impl ActNode {
    pub fn new(id: impl Into<NodeId>, name: impl Into<String>, kind: NodeKind) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            kind,
            position: Position::default(),
        }
    }
}

/// How a connection is selected
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionKind {
    #[default]
    Default,
    Conditional,
    Timeout,
}

/// Directed edge between two nodes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActConnection {
    pub id: ConnectionId,
    pub from: NodeId,
    pub to: NodeId,
    #[serde(default)]
    pub kind: ConnectionKind,
    /// Branch label a conditional edge is taken on
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guard: Option<String>,
    /// Stored for the editor; playback does not interpret it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,
}

impl ActConnection {
    /// True if this is a conditional edge guarded by `branch`
    pub fn matches_branch(&self, branch: &str) -> bool {
        self.kind == ConnectionKind::Conditional
            && self
                .guard
                .as_deref()
                .is_some_and(|guard| guard.trim().eq_ignore_ascii_case(branch))
    }
}

/// OSC address that starts an act
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OscActTrigger {
    pub address: String,
    pub enabled: bool,
}

/// MIDI note that starts an act
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MidiActTrigger {
    /// MIDI channel (0-15)
    pub channel: u8,
    pub note: u8,
    pub enabled: bool,
}

/// External triggers attached to an act
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActTriggers {
    #[serde(default)]
    pub osc: Option<OscActTrigger>,
    #[serde(default)]
    pub midi: Option<MidiActTrigger>,
}

/// Persisted view of an act's playback
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlaybackState {
    pub is_playing: bool,
    pub current_node_id: Option<NodeId>,
    /// Progress through the current timed node, `0.0..=1.0`
    pub progress: f32,
}

/// A user-authored graph of timed lighting operations
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Act {
    pub id: ActId,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub nodes: Vec<ActNode>,
    pub connections: Vec<ActConnection>,
    #[serde(default)]
    pub start_node_id: Option<NodeId>,
    #[serde(default)]
    pub triggers: ActTriggers,
    #[serde(default)]
    pub playback: PlaybackState,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Act {
    /// Create an empty act
    pub fn new(name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: ActId::generate(),
            name: name.into(),
            description: None,
            nodes: Vec::new(),
            connections: Vec::new(),
            start_node_id: None,
            triggers: ActTriggers::default(),
            playback: PlaybackState::default(),
            created_at: now,
            updated_at: now,
        }
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    // --- Queries ---

    /// Look up a node by id
    pub fn node(&self, id: &NodeId) -> Option<&ActNode> {
        self.nodes.iter().find(|node| &node.id == id)
    }

    /// Mutable node lookup, for editing payloads
    pub fn node_mut(&mut self, id: &NodeId) -> Option<&mut ActNode> {
        self.nodes.iter_mut().find(|node| &node.id == id)
    }

    pub fn contains_node(&self, id: &NodeId) -> bool {
        self.node(id).is_some()
    }

    pub fn connection(&self, id: &ConnectionId) -> Option<&ActConnection> {
        self.connections.iter().find(|conn| &conn.id == id)
    }

    /// Outgoing edges of `node_id`, in insertion order
    pub fn outgoing_edges<'a>(
        &'a self,
        node_id: &'a NodeId,
    ) -> impl Iterator<Item = &'a ActConnection> + 'a {
        self.connections
            .iter()
            .filter(move |conn| &conn.from == node_id)
    }

    /// Ids of the outgoing edges of `node_id`, in insertion order
    pub fn outgoing_connection_ids(&self, node_id: &NodeId) -> Vec<ConnectionId> {
        self.outgoing_edges(node_id)
            .map(|conn| conn.id.clone())
            .collect()
    }

    /// The edge a non-branching node advances along
    pub fn first_outgoing(&self, node_id: &NodeId) -> Option<&ActConnection> {
        self.connections.iter().find(|conn| &conn.from == node_id)
    }

    /// Node a connection points at, if it exists
    pub fn resolve_target(&self, connection: &ActConnection) -> Option<&ActNode> {
        self.node(&connection.to)
    }

    // --- Authoring ---

    /// Add a node with a generated id
    pub fn add_node(&mut self, name: impl Into<String>, kind: NodeKind, position: Position) -> NodeId {
        let id = NodeId::generate();
        self.nodes.push(ActNode {
            id: id.clone(),
            name: name.into(),
            kind,
            position,
        });
        self.touch();
        id
    }

    /// Add a node that already carries an id
    pub fn insert_node(&mut self, node: ActNode) -> Result<(), GraphError> {
        if self.contains_node(&node.id) {
            return Err(GraphError::DuplicateNode(node.id));
        }
        self.nodes.push(node);
        self.touch();
        Ok(())
    }

    /// Remove a node together with every connection, start marker and
    /// tracker entry referring to it
    pub fn remove_node(&mut self, id: &NodeId) -> Result<ActNode, GraphError> {
        let index = self
            .nodes
            .iter()
            .position(|node| &node.id == id)
            .ok_or_else(|| GraphError::NodeNotFound(id.clone()))?;
        let removed = self.nodes.remove(index);

        self.connections
            .retain(|conn| &conn.from != id && &conn.to != id);
        if self.start_node_id.as_ref() == Some(id) {
            self.start_node_id = None;
        }
        for node in &mut self.nodes {
            if let NodeKind::Tracker(tracker) = &mut node.kind {
                tracker.children.retain(|child| child != id);
            }
        }
        self.touch();
        Ok(removed)
    }

    /// Connect two existing nodes with an unguarded edge
    pub fn connect(
        &mut self,
        from: &NodeId,
        to: &NodeId,
        kind: ConnectionKind,
    ) -> Result<ConnectionId, GraphError> {
        if kind == ConnectionKind::Conditional {
            return Err(GraphError::MissingGuard(from.clone()));
        }
        self.push_connection(from, to, kind, None)
    }

    /// Connect two existing nodes with an edge taken on branch `guard`
    pub fn connect_conditional(
        &mut self,
        from: &NodeId,
        to: &NodeId,
        guard: impl Into<String>,
    ) -> Result<ConnectionId, GraphError> {
        self.push_connection(from, to, ConnectionKind::Conditional, Some(guard.into()))
    }

    fn push_connection(
        &mut self,
        from: &NodeId,
        to: &NodeId,
        kind: ConnectionKind,
        guard: Option<String>,
    ) -> Result<ConnectionId, GraphError> {
        for id in [from, to] {
            if !self.contains_node(id) {
                return Err(GraphError::NodeNotFound(id.clone()));
            }
        }
        let id = ConnectionId::generate();
        self.connections.push(ActConnection {
            id: id.clone(),
            from: from.clone(),
            to: to.clone(),
            kind,
            guard,
            timeout_ms: None,
        });
        self.touch();
        Ok(id)
    }

    pub fn disconnect(&mut self, id: &ConnectionId) -> Result<ActConnection, GraphError> {
        let index = self
            .connections
            .iter()
            .position(|conn| &conn.id == id)
            .ok_or_else(|| GraphError::ConnectionNotFound(id.clone()))?;
        self.touch();
        Ok(self.connections.remove(index))
    }

    pub fn set_start_node(&mut self, id: &NodeId) -> Result<(), GraphError> {
        if !self.contains_node(id) {
            return Err(GraphError::NodeNotFound(id.clone()));
        }
        self.start_node_id = Some(id.clone());
        self.touch();
        Ok(())
    }

    /// Drop any persisted playback state, e.g. after loading from disk
    pub fn reset_playback(&mut self) {
        self.playback = PlaybackState::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scene(name: &str) -> NodeKind {
        NodeKind::Scene(ScenePayload::new(name))
    }

    #[test]
    fn test_outgoing_edges_keep_insertion_order() {
        let mut act = Act::new("Order");
        let a = act.add_node("A", scene("a"), Position::default());
        let b = act.add_node("B", scene("b"), Position::default());
        let c = act.add_node("C", scene("c"), Position::default());

        let first = act.connect(&a, &c, ConnectionKind::Default).unwrap();
        let second = act.connect(&a, &b, ConnectionKind::Default).unwrap();

        assert_eq!(act.outgoing_connection_ids(&a), vec![first.clone(), second]);
        assert_eq!(act.first_outgoing(&a).unwrap().id, first);
        assert_eq!(act.resolve_target(act.first_outgoing(&a).unwrap()).unwrap().id, c);
        assert!(act.first_outgoing(&c).is_none());
    }

    #[test]
    fn test_connect_rejects_missing_nodes() {
        let mut act = Act::new("Dangling");
        let a = act.add_node("A", scene("a"), Position::default());
        let ghost = NodeId::from("ghost");

        assert_eq!(
            act.connect(&a, &ghost, ConnectionKind::Default),
            Err(GraphError::NodeNotFound(ghost))
        );
        assert!(act.connections.is_empty());
    }

    #[test]
    fn test_conditional_edges_require_guard() {
        let mut act = Act::new("Guards");
        let a = act.add_node("A", scene("a"), Position::default());
        let b = act.add_node("B", scene("b"), Position::default());

        assert!(act.connect(&a, &b, ConnectionKind::Conditional).is_err());
        let id = act.connect_conditional(&a, &b, " TRUE ").unwrap();
        let conn = act.connection(&id).unwrap();
        assert!(conn.matches_branch("true"));
        assert!(!conn.matches_branch("false"));
    }

    #[test]
    fn test_remove_node_cleans_references() {
        let mut act = Act::new("Cleanup");
        let a = act.add_node("A", scene("a"), Position::default());
        let b = act.add_node("B", scene("b"), Position::default());
        let tracker = act.add_node(
            "T",
            NodeKind::Tracker(TrackerPayload::new(vec![a.clone(), b.clone()])),
            Position::default(),
        );
        act.connect(&a, &b, ConnectionKind::Default).unwrap();
        act.connect(&tracker, &a, ConnectionKind::Default).unwrap();
        act.set_start_node(&a).unwrap();

        act.remove_node(&a).unwrap();

        assert!(act.connections.is_empty());
        assert_eq!(act.start_node_id, None);
        match &act.node(&tracker).unwrap().kind {
            NodeKind::Tracker(payload) => assert_eq!(payload.children, vec![b]),
            other => panic!("unexpected kind {other:?}"),
        }
    }

    #[test]
    fn test_transition_curves() {
        assert_eq!(TransitionCurve::Linear.ease(0.25), 0.25);
        assert_eq!(TransitionCurve::EaseIn.ease(0.5), 0.25);
        assert_eq!(TransitionCurve::EaseOut.ease(0.5), 0.75);
        assert_eq!(TransitionCurve::EaseInOut.ease(0.5), 0.5);
        assert_eq!(TransitionCurve::EaseInOut.ease(2.0), 1.0);
    }

    #[test]
    fn test_payload_defaults_from_json() {
        let wait: WaitPayload = serde_json::from_str("{}").unwrap();
        assert_eq!(wait.duration_ms, 3000);

        let transition: TransitionPayload = serde_json::from_str(r#"{"curve":"ease-in"}"#).unwrap();
        assert_eq!(transition.duration_ms, 1000);
        assert_eq!(transition.curve, TransitionCurve::EaseIn);
        assert_eq!(transition.shape, TransitionShape::Fade);
    }

    #[test]
    fn test_node_kinds_survive_ron() {
        use crate::condition::{ComparisonOperator, ConditionPredicate, SignalRef};
        use crate::tracker::{TrackerMode, TrackerPayload};

        let kinds = [
            NodeKind::Condition(ConditionPayload::new(ConditionPredicate::new(
                SignalRef::Midi {
                    channel: 2,
                    controller: 7,
                },
                ComparisonOperator::Greater,
                64.0,
            ))),
            NodeKind::Tracker(
                TrackerPayload::new(vec![NodeId::from("a"), NodeId::from("b")])
                    .with_mode(TrackerMode::PingPong)
                    .with_step_delay(0),
            ),
            NodeKind::Scene(ScenePayload::new("Wash").muting("spot")),
        ];
        for kind in kinds {
            let text = ron::to_string(&kind).unwrap();
            assert!(text.starts_with(kind.label()), "{text}");
            assert_eq!(ron::from_str::<NodeKind>(&text).unwrap(), kind);
        }
    }
}
