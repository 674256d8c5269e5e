//! Static checks over an act graph
//!
//! Playback never refuses an act; it recovers from every defect at runtime.
//! These checks surface the same defects before a show so an operator can
//! fix them, along with informational findings such as cycles.

use crate::act::{Act, ConnectionId, ConnectionKind, NodeId, NodeKind};
use petgraph::algo::tarjan_scc;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::Dfs;
use std::collections::{HashMap, HashSet};
use std::fmt;

/// How serious a finding is
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Info,
    Warning,
    Error,
}

/// One finding from [`validate`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GraphIssue {
    /// The act has no nodes
    Empty,
    /// A connection points at or leaves a node that does not exist
    DanglingConnection {
        connection: ConnectionId,
        missing: NodeId,
    },
    /// `start_node_id` names a missing node; playback falls back to the first node
    MissingStartNode(NodeId),
    EmptyTracker(NodeId),
    MissingTrackerChild { tracker: NodeId, child: NodeId },
    /// A condition with edges but no default edge can stop with no matching branch
    ConditionWithoutDefault(NodeId),
    /// Only the first outgoing edge of a non-condition node is ever followed
    IgnoredEdges { node: NodeId, ignored: usize },
    /// Not reachable from the start node through edges or tracker children
    Unreachable(NodeId),
    /// Nodes forming a loop; legal, the act runs until stopped
    Cycle(Vec<NodeId>),
}

impl GraphIssue {
    pub fn severity(&self) -> Severity {
        match self {
            GraphIssue::Empty | GraphIssue::DanglingConnection { .. } => Severity::Error,
            GraphIssue::MissingStartNode(_)
            | GraphIssue::EmptyTracker(_)
            | GraphIssue::MissingTrackerChild { .. }
            | GraphIssue::ConditionWithoutDefault(_) => Severity::Warning,
            GraphIssue::IgnoredEdges { .. } | GraphIssue::Unreachable(_) | GraphIssue::Cycle(_) => {
                Severity::Info
            }
        }
    }
}

impl fmt::Display for GraphIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GraphIssue::Empty => write!(f, "act has no nodes"),
            GraphIssue::DanglingConnection { connection, missing } => {
                write!(f, "connection {connection} references missing node {missing}")
            }
            GraphIssue::MissingStartNode(id) => write!(f, "start node {id} does not exist"),
            GraphIssue::EmptyTracker(id) => write!(f, "tracker {id} has no children"),
            GraphIssue::MissingTrackerChild { tracker, child } => {
                write!(f, "tracker {tracker} references missing child {child}")
            }
            GraphIssue::ConditionWithoutDefault(id) => {
                write!(f, "condition {id} has no default edge")
            }
            GraphIssue::IgnoredEdges { node, ignored } => {
                write!(f, "node {node} has {ignored} outgoing edge(s) that are never followed")
            }
            GraphIssue::Unreachable(id) => write!(f, "node {id} is unreachable from the start node"),
            GraphIssue::Cycle(nodes) => {
                let ids: Vec<&str> = nodes.iter().map(NodeId::as_str).collect();
                write!(f, "cycle through {}", ids.join(" -> "))
            }
        }
    }
}

/// Check an act and return every finding, most severe first
pub fn validate(act: &Act) -> Vec<GraphIssue> {
    let mut issues = Vec::new();
    if act.nodes.is_empty() {
        issues.push(GraphIssue::Empty);
        return issues;
    }

    let mut graph: DiGraph<NodeId, ()> = DiGraph::new();
    let mut index: HashMap<&NodeId, NodeIndex> = HashMap::new();
    for node in &act.nodes {
        index.insert(&node.id, graph.add_node(node.id.clone()));
    }

    for conn in &act.connections {
        match (index.get(&conn.from), index.get(&conn.to)) {
            (Some(&from), Some(&to)) => {
                graph.add_edge(from, to, ());
            }
            (None, _) => issues.push(GraphIssue::DanglingConnection {
                connection: conn.id.clone(),
                missing: conn.from.clone(),
            }),
            (_, None) => issues.push(GraphIssue::DanglingConnection {
                connection: conn.id.clone(),
                missing: conn.to.clone(),
            }),
        }
    }

    // cycles only count real edges; tracker children are visited, not walked
    for component in tarjan_scc(&graph) {
        let looped = component.len() > 1
            || component
                .first()
                .is_some_and(|&n| graph.contains_edge(n, n));
        if looped {
            let mut nodes: Vec<NodeId> = component.iter().map(|&n| graph[n].clone()).collect();
            nodes.sort();
            issues.push(GraphIssue::Cycle(nodes));
        }
    }

    for node in &act.nodes {
        let outgoing: Vec<_> = act.outgoing_edges(&node.id).collect();
        match &node.kind {
            NodeKind::Condition(_) => {
                if !outgoing.is_empty()
                    && !outgoing.iter().any(|c| c.kind == ConnectionKind::Default)
                {
                    issues.push(GraphIssue::ConditionWithoutDefault(node.id.clone()));
                }
            }
            NodeKind::Tracker(payload) => {
                if payload.children.is_empty() {
                    issues.push(GraphIssue::EmptyTracker(node.id.clone()));
                }
                let from = index[&node.id];
                for child in &payload.children {
                    match index.get(child) {
                        Some(&to) => {
                            graph.add_edge(from, to, ());
                        }
                        None => issues.push(GraphIssue::MissingTrackerChild {
                            tracker: node.id.clone(),
                            child: child.clone(),
                        }),
                    }
                }
            }
            _ => {}
        }
        if !matches!(node.kind, NodeKind::Condition(_)) && outgoing.len() > 1 {
            issues.push(GraphIssue::IgnoredEdges {
                node: node.id.clone(),
                ignored: outgoing.len() - 1,
            });
        }
    }

    let start = match &act.start_node_id {
        Some(id) if index.contains_key(id) => id,
        Some(id) => {
            issues.push(GraphIssue::MissingStartNode(id.clone()));
            &act.nodes[0].id
        }
        None => &act.nodes[0].id,
    };

    let mut reached = HashSet::new();
    let mut dfs = Dfs::new(&graph, index[start]);
    while let Some(nx) = dfs.next(&graph) {
        reached.insert(nx);
    }
    for node in &act.nodes {
        if !reached.contains(&index[&node.id]) {
            issues.push(GraphIssue::Unreachable(node.id.clone()));
        }
    }

    issues.sort_by_key(|issue| std::cmp::Reverse(issue.severity()));
    issues
}
