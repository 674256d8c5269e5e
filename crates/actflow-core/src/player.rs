//! Act playback controller
//!
//! An [`ActPlayer`] walks one act: it enters a node, lets the node's handler
//! write output or arm a timer, and on completion follows the node's outgoing
//! edge. Node execution is strictly sequential and never recursive. Every
//! advance is a [`Step`] processed by a trampoline in [`ActPlayer::drive`], so
//! cyclic acts run for as long as they are allowed to without growing the
//! stack.
//!
//! Tracker nodes push their current child as an extra frame on top of their
//! own. A child frame never advances the graph: when it completes, control
//! returns to the tracker, which either schedules its next step or completes.

use crate::act::{Act, ActId, NodeId, NodeKind, PlaybackState, TransitionCurve};
use crate::config::EngineConfig;
use crate::error::ActError;
use crate::events::{EventSink, PlaybackEvent, StopReason};
use crate::handlers::{self, Route};
use crate::output::{DmxOutput, SignalSource};
use crate::runtime::PlaybackRuntime;
use crate::scene::SceneStore;
use crate::scheduler::{PlayerId, Scheduler, TimerHandle, TimerToken};
use crate::tracker::{self, TrackerAdvance, TrackerPosition};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, trace, warn};

/// Collaborators a player needs while it runs.
///
/// Built fresh for every call so several players can share one output,
/// scheduler and event sink.
pub struct PlaybackEnv<'a> {
    pub scenes: &'a dyn SceneStore,
    pub output: &'a mut dyn DmxOutput,
    pub signals: &'a dyn SignalSource,
    pub scheduler: &'a mut dyn Scheduler,
    pub events: &'a mut dyn EventSink,
}

/// Unit of work for the trampoline
#[derive(Debug, Clone, PartialEq, Eq)]
enum Step {
    Enter(NodeId),
    Complete(Route),
    TrackerStep(NodeId),
}

#[derive(Debug)]
struct PendingTimer {
    handle: TimerHandle,
    resume: Step,
    armed_at: Duration,
    delay: Duration,
    curve: Option<TransitionCurve>,
    yielded: bool,
}

/// Plays one act
pub struct ActPlayer {
    id: PlayerId,
    act: Arc<Act>,
    config: EngineConfig,
    rng: StdRng,
    playing: bool,
    generation: u64,
    /// Bottom frame is the graph-level node, frames above are tracker children
    frames: Vec<NodeId>,
    pending: Option<PendingTimer>,
    runtime: PlaybackRuntime,
    started_at: Duration,
    /// Clock time of the current synchronous burst and the steps spent in it
    burst_at: Duration,
    burst_steps: usize,
    max_depth: usize,
    steps: u64,
}

impl ActPlayer {
    pub fn new(id: PlayerId, act: Arc<Act>, config: EngineConfig) -> Self {
        let rng = match config.random_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_rng(&mut rand::rng()),
        };
        Self {
            id,
            act,
            config,
            rng,
            playing: false,
            generation: 0,
            frames: Vec::new(),
            pending: None,
            runtime: PlaybackRuntime::new(),
            started_at: Duration::ZERO,
            burst_at: Duration::ZERO,
            burst_steps: 0,
            max_depth: 0,
            steps: 0,
        }
    }

    pub fn id(&self) -> PlayerId {
        self.id
    }

    pub fn act(&self) -> &Arc<Act> {
        &self.act
    }

    pub fn act_id(&self) -> &ActId {
        &self.act.id
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    /// Graph-level node currently executing
    pub fn current_node(&self) -> Option<&NodeId> {
        self.frames.first()
    }

    /// Frames on the execution stack: 0 when idle, 1 for a plain node, more
    /// while tracker children run
    pub fn frame_depth(&self) -> usize {
        self.frames.len()
    }

    /// Deepest frame stack seen since the player was created
    pub fn max_frame_depth(&self) -> usize {
        self.max_depth
    }

    /// Number of steps processed since the player was created
    pub fn steps_executed(&self) -> u64 {
        self.steps
    }

    pub fn runtime(&self) -> &PlaybackRuntime {
        &self.runtime
    }

    /// Current generation; bumped on every start and stop
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Playback state at time `now` on the scheduler clock
    pub fn snapshot(&self, now: Duration) -> PlaybackState {
        let progress = match (&self.pending, self.playing) {
            (Some(pending), true) if !pending.delay.is_zero() => {
                let elapsed = now.saturating_sub(pending.armed_at);
                let linear = (elapsed.as_secs_f32() / pending.delay.as_secs_f32()).min(1.0);
                pending.curve.map_or(linear, |curve| curve.ease(linear))
            }
            _ => 0.0,
        };
        PlaybackState {
            is_playing: self.playing,
            current_node_id: self.current_node().cloned(),
            progress,
        }
    }

    /// Start playing from the act's start node.
    ///
    /// A player that is already running is stopped first.
    pub fn start(&mut self, env: &mut PlaybackEnv<'_>) -> Result<(), ActError> {
        if self.playing {
            self.stop(env);
        }

        let act = Arc::clone(&self.act);
        let Some(start) = self.resolve_start(&act) else {
            warn!(act = %act.id, "cannot start act without nodes");
            env.events.emit(PlaybackEvent::PlaybackStopped {
                player: self.id,
                act: act.id.clone(),
                reason: StopReason::Error(ActError::EmptyGraph),
            });
            return Err(ActError::EmptyGraph);
        };

        self.generation += 1;
        self.playing = true;
        self.frames.clear();
        self.runtime.clear();
        self.started_at = env.scheduler.now();
        info!(player = %self.id, act = %act.id, name = %act.name, start = %start, "act playback started");

        self.drive(Step::Enter(start), true, env);
        Ok(())
    }

    /// Stop playback. Safe to call in any state; only a running player
    /// reports `StoppedByUser`.
    pub fn stop(&mut self, env: &mut PlaybackEnv<'_>) {
        if self.playing {
            self.finish(StopReason::StoppedByUser, env);
        } else {
            trace!(player = %self.id, "stop on idle player");
        }
    }

    /// Deliver a fired timer. Tokens from another player or an earlier
    /// generation are ignored.
    pub fn on_timer(&mut self, token: TimerToken, env: &mut PlaybackEnv<'_>) {
        if token.player != self.id || token.generation != self.generation || !self.playing {
            trace!(player = %self.id, ?token, "stale timer ignored");
            return;
        }
        let Some(pending) = self.pending.take() else {
            trace!(player = %self.id, "timer fired with nothing pending");
            return;
        };
        self.drive(pending.resume, pending.yielded, env);
    }

    fn resolve_start(&self, act: &Act) -> Option<NodeId> {
        if let Some(id) = &act.start_node_id {
            if act.contains_node(id) {
                return Some(id.clone());
            }
            warn!(act = %act.id, start = %id, "start node missing, falling back to first node");
        }
        act.nodes.first().map(|node| node.id.clone())
    }

    /// Run steps until one waits on a timer.
    ///
    /// Zero-delay timers fire within the same advance, so steps taken at one
    /// clock instant share a single budget. Once it is spent the player
    /// yields to the next advance; the resumed run starts a `fresh` budget.
    fn drive(&mut self, first: Step, fresh: bool, env: &mut PlaybackEnv<'_>) {
        let now = env.scheduler.now();
        if fresh || now != self.burst_at {
            self.burst_at = now;
            self.burst_steps = 0;
        }
        let budget = self.config.max_sync_steps.max(1);

        let mut step = first;
        loop {
            if !self.playing {
                return;
            }
            if self.burst_steps >= budget {
                trace!(player = %self.id, "yielding after synchronous run");
                self.arm_yield(step, env);
                return;
            }
            self.burst_steps += 1;
            self.steps += 1;

            match self.execute(step, env) {
                Some(next) => step = next,
                None => return,
            }
        }
    }

    fn execute(&mut self, step: Step, env: &mut PlaybackEnv<'_>) -> Option<Step> {
        match step {
            Step::Enter(node) => self.enter(node, env),
            Step::Complete(route) => self.complete(route, env),
            Step::TrackerStep(node) => self.tracker_step(node, env),
        }
    }

    fn enter(&mut self, id: NodeId, env: &mut PlaybackEnv<'_>) -> Option<Step> {
        let act = Arc::clone(&self.act);
        let Some(node) = act.node(&id) else {
            // targets and tracker children are resolved before entering
            warn!(player = %self.id, node = %id, "entered node vanished");
            self.finish(StopReason::Completed, env);
            return None;
        };

        self.frames.push(id.clone());
        self.max_depth = self.max_depth.max(self.frames.len());
        debug!(player = %self.id, node = %id, kind = node.kind.label(), depth = self.frames.len(), "node entered");
        env.events.emit(PlaybackEvent::NodeEntered {
            player: self.id,
            act: act.id.clone(),
            node: id.clone(),
        });

        match &node.kind {
            NodeKind::Scene(payload) => {
                if let Err(err) = handlers::apply_scene(&id, payload, env.scenes, &mut *env.output) {
                    self.warn(err, env);
                }
                Some(Step::Complete(Route::First))
            }
            NodeKind::Wait(payload) => {
                let delay = handlers::delay_from_ms(payload.duration_ms);
                self.arm(delay, Step::Complete(Route::First), None, env);
                None
            }
            NodeKind::Transition(payload) => {
                let delay = handlers::delay_from_ms(payload.duration_ms);
                self.arm(delay, Step::Complete(Route::First), Some(payload.curve), env);
                None
            }
            NodeKind::Condition(payload) => {
                let elapsed = env.scheduler.now().saturating_sub(self.started_at);
                let sample = handlers::sample_signal(
                    &payload.predicate.source,
                    elapsed,
                    env.signals,
                    &*env.output,
                );
                let result = handlers::evaluate_predicate(&id, &payload.predicate, sample);
                let route = handlers::choose_branch(&act, &id, result);
                debug!(player = %self.id, node = %id, result, ?route, "condition evaluated");
                Some(Step::Complete(route))
            }
            NodeKind::Tracker(_) => Some(Step::TrackerStep(id)),
        }
    }

    fn complete(&mut self, route: Route, env: &mut PlaybackEnv<'_>) -> Option<Step> {
        let done = self.frames.pop()?;

        if let Some(tracker) = self.frames.last().cloned() {
            // a tracker child finished; its own route is irrelevant
            return self.tracker_child_done(tracker, env);
        }

        let act = Arc::clone(&self.act);
        let edge = match route {
            Route::First => act.first_outgoing(&done),
            Route::Edge(id) => act.connection(&id),
            Route::NoMatch { branch } => {
                self.finish(
                    StopReason::Error(ActError::NoMatchingBranch { node: done, branch }),
                    env,
                );
                return None;
            }
        };

        let Some(edge) = edge else {
            self.finish(StopReason::Completed, env);
            return None;
        };

        match act.resolve_target(edge) {
            Some(target) => Some(Step::Enter(target.id.clone())),
            None => {
                self.finish(
                    StopReason::Error(ActError::DanglingEdge {
                        connection: edge.id.clone(),
                        from: done,
                        to: edge.to.clone(),
                    }),
                    env,
                );
                None
            }
        }
    }

    fn tracker_step(&mut self, id: NodeId, env: &mut PlaybackEnv<'_>) -> Option<Step> {
        let act = Arc::clone(&self.act);
        let Some(NodeKind::Tracker(payload)) = act.node(&id).map(|node| &node.kind) else {
            return Some(Step::Complete(Route::First));
        };

        if payload.children.is_empty() {
            self.warn(ActError::EmptyTrackerList { node: id }, env);
            return Some(Step::Complete(Route::First));
        }

        let position = self.runtime.tracker_position(&id, payload);
        let child = payload.children[position.index].clone();

        if !act.contains_node(&child) {
            self.runtime.reset_tracker(&id);
            self.warn(ActError::MissingTrackerChild { node: id, child }, env);
            return Some(Step::Complete(Route::First));
        }
        if self.frames.contains(&child) {
            self.warn(ActError::TrackerCycle { node: id, child }, env);
            return Some(Step::Complete(Route::First));
        }

        trace!(player = %self.id, tracker = %id, index = position.index, child = %child, "tracker step");
        Some(Step::Enter(child))
    }

    fn tracker_child_done(&mut self, id: NodeId, env: &mut PlaybackEnv<'_>) -> Option<Step> {
        let act = Arc::clone(&self.act);
        let Some(NodeKind::Tracker(payload)) = act.node(&id).map(|node| &node.kind) else {
            return Some(Step::Complete(Route::First));
        };
        if payload.children.is_empty() {
            return Some(Step::Complete(Route::First));
        }

        let current: TrackerPosition = self.runtime.tracker_position(&id, payload);
        match tracker::advance(payload.mode, payload.children.len(), current, &mut self.rng) {
            TrackerAdvance::Finished => {
                debug!(player = %self.id, tracker = %id, "tracker finished");
                self.runtime.reset_tracker(&id);
                Some(Step::Complete(Route::First))
            }
            TrackerAdvance::Continue(next) => {
                self.runtime.set_tracker_position(id.clone(), next);
                let delay = Duration::from_millis(payload.step_delay_ms);
                self.arm(delay, Step::TrackerStep(id), None, env);
                None
            }
        }
    }

    fn arm(
        &mut self,
        delay: Duration,
        resume: Step,
        curve: Option<TransitionCurve>,
        env: &mut PlaybackEnv<'_>,
    ) {
        let token = self.token();
        let handle = env.scheduler.schedule(delay, token);
        self.set_pending(
            PendingTimer {
                handle,
                resume,
                armed_at: env.scheduler.now(),
                delay,
                curve,
                yielded: false,
            },
            env,
        );
        trace!(player = %self.id, ?delay, "timer armed");
    }

    fn arm_yield(&mut self, resume: Step, env: &mut PlaybackEnv<'_>) {
        let token = self.token();
        let handle = env.scheduler.schedule_yield(token);
        self.set_pending(
            PendingTimer {
                handle,
                resume,
                armed_at: env.scheduler.now(),
                delay: Duration::ZERO,
                curve: None,
                yielded: true,
            },
            env,
        );
    }

    fn token(&self) -> TimerToken {
        TimerToken {
            player: self.id,
            generation: self.generation,
        }
    }

    fn set_pending(&mut self, pending: PendingTimer, env: &mut PlaybackEnv<'_>) {
        if let Some(previous) = self.pending.replace(pending) {
            env.scheduler.cancel(previous.handle);
        }
    }

    fn warn(&self, error: ActError, env: &mut PlaybackEnv<'_>) {
        warn!(player = %self.id, act = %self.act.id, %error, "recovered playback error");
        env.events.emit(PlaybackEvent::Warning {
            player: self.id,
            act: self.act.id.clone(),
            error,
        });
    }

    fn finish(&mut self, reason: StopReason, env: &mut PlaybackEnv<'_>) {
        if !self.playing {
            return;
        }
        self.playing = false;
        self.generation += 1;
        if let Some(pending) = self.pending.take() {
            env.scheduler.cancel(pending.handle);
        }
        self.frames.clear();

        match &reason {
            StopReason::Error(error) => {
                warn!(player = %self.id, act = %self.act.id, %error, "act playback aborted")
            }
            _ => info!(player = %self.id, act = %self.act.id, ?reason, "act playback stopped"),
        }
        env.events.emit(PlaybackEvent::PlaybackStopped {
            player: self.id,
            act: self.act.id.clone(),
            reason,
        });
    }
}
