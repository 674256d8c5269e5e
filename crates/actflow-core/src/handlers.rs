//! Per-kind node behaviour
//!
//! Handlers only decide *what* a node does. Sequencing, timers and events
//! belong to the player, which matches on [`NodeKind`](crate::act::NodeKind)
//! and calls into the helpers here.

use crate::act::{Act, ConnectionId, ConnectionKind, NodeId, ScenePayload};
use crate::condition::{branch_label, ConditionPredicate, SignalRef};
use crate::error::ActError;
use crate::output::{DmxOutput, SignalSource};
use crate::scene::SceneStore;
use std::time::Duration;

/// Edge a completed node leaves by
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Route {
    /// First outgoing edge in insertion order
    First,
    /// A specific edge picked by a condition
    Edge(ConnectionId),
    /// A condition found nothing to follow
    NoMatch { branch: String },
}

/// Convert a signed millisecond duration, treating negatives as zero
pub(crate) fn delay_from_ms(ms: i64) -> Duration {
    Duration::from_millis(ms.max(0).unsigned_abs())
}

/// Write a scene to the output, skipping channels of muted fixtures.
///
/// Returns the number of channels written.
pub(crate) fn apply_scene(
    node: &NodeId,
    payload: &ScenePayload,
    scenes: &dyn SceneStore,
    output: &mut dyn DmxOutput,
) -> Result<usize, ActError> {
    if payload.scene.is_empty() {
        tracing::debug!(%node, "scene node has no scene assigned");
        return Ok(0);
    }

    let scene = scenes
        .find_scene_by_name(&payload.scene)
        .ok_or_else(|| ActError::MissingScene {
            node: node.clone(),
            scene: payload.scene.clone(),
        })?;

    let mut written = 0;
    for &(channel, value) in &scene.channel_values {
        if !payload.muted_fixtures.is_empty() {
            if let Some(fixture) = output.fixture_for_channel(channel) {
                if payload.muted_fixtures.contains(&fixture) {
                    continue;
                }
            }
        }
        output.set_channel_value(channel, value);
        written += 1;
    }
    tracing::trace!(%node, scene = %scene.name, written, "scene applied");
    Ok(written)
}

/// Sample the value a predicate compares against.
///
/// `elapsed` is the time since playback started and backs [`SignalRef::Time`].
/// DMX signals fall back to the output's own buffer when the signal source
/// has no override.
pub(crate) fn sample_signal(
    signal: &SignalRef,
    elapsed: Duration,
    signals: &dyn SignalSource,
    output: &dyn DmxOutput,
) -> Option<f64> {
    match signal {
        SignalRef::Time => Some(elapsed.as_secs_f64() * 1000.0),
        SignalRef::Dmx { channel } => signals
            .signal_value(signal)
            .or_else(|| output.channel_value(*channel).map(f64::from)),
        SignalRef::Midi { .. } | SignalRef::Osc { .. } => signals.signal_value(signal),
    }
}

/// Evaluate a predicate; an unavailable signal evaluates to false
pub(crate) fn evaluate_predicate(
    node: &NodeId,
    predicate: &ConditionPredicate,
    sample: Option<f64>,
) -> bool {
    match sample {
        Some(value) => predicate.evaluate(value),
        None => {
            tracing::debug!(%node, signal = ?predicate.source, "signal unavailable, predicate is false");
            false
        }
    }
}

/// Pick the edge a condition node leaves by
pub(crate) fn choose_branch(act: &Act, node: &NodeId, result: bool) -> Route {
    let branch = branch_label(result);
    let mut edges = act.outgoing_edges(node).peekable();
    if edges.peek().is_none() {
        // nothing to follow at all: the act simply ends here
        return Route::First;
    }

    let mut fallback = None;
    for edge in edges {
        if edge.matches_branch(branch) {
            return Route::Edge(edge.id.clone());
        }
        if fallback.is_none() && edge.kind == ConnectionKind::Default {
            fallback = Some(edge.id.clone());
        }
    }

    match fallback {
        Some(id) => Route::Edge(id),
        None => Route::NoMatch {
            branch: branch.to_string(),
        },
    }
}
