//! Playback session
//!
//! A [`PlaybackSession`] bundles everything several players share: the timer
//! queue, scene library, signal board, output and event bus. It routes fired
//! timers to their players. The session is single-threaded; hosts drive it by
//! calling [`PlaybackSession::advance`] (tests, offline rendering) or
//! [`PlaybackSession::advance_to`] with wall-clock time (the show runner).

use crate::act::{Act, ActId, PlaybackState};
use crate::config::EngineConfig;
use crate::error::SessionError;
use crate::events::{EventBus, PlaybackEvent};
use crate::output::{DmxOutput, SignalBoard};
use crate::player::{ActPlayer, PlaybackEnv};
use crate::scene::SceneLibrary;
use crate::scheduler::{PlayerId, Scheduler, TimerQueue};
use crossbeam_channel::Receiver;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

/// Players sharing one output, clock and scene library
pub struct PlaybackSession<O> {
    config: EngineConfig,
    clock: TimerQueue,
    scenes: SceneLibrary,
    signals: SignalBoard,
    output: O,
    events: EventBus,
    players: BTreeMap<PlayerId, ActPlayer>,
    next_player: u64,
}

impl<O: DmxOutput> PlaybackSession<O> {
    pub fn new(output: O, scenes: SceneLibrary, config: EngineConfig) -> Self {
        Self {
            events: EventBus::with_capacity(config.event_history),
            config,
            clock: TimerQueue::new(),
            scenes,
            signals: SignalBoard::new(),
            output,
            players: BTreeMap::new(),
            next_player: 1,
        }
    }

    /// Create an idle player for `act`
    pub fn load(&mut self, act: Arc<Act>) -> PlayerId {
        let id = PlayerId(self.next_player);
        self.next_player += 1;
        let mut config = self.config.clone();
        // players of one session must not share a random sequence
        config.random_seed = config.random_seed.map(|seed| seed.wrapping_add(id.0));
        tracing::debug!(player = %id, act = %act.id, "act loaded");
        self.players.insert(id, ActPlayer::new(id, act, config));
        id
    }

    /// Stop and remove a player
    pub fn unload(&mut self, player: PlayerId) -> Result<Arc<Act>, SessionError> {
        self.stop(player)?;
        self.players
            .remove(&player)
            .map(|p| Arc::clone(p.act()))
            .ok_or(SessionError::UnknownPlayer(player))
    }

    /// Load and immediately start an act
    pub fn play(&mut self, act: Arc<Act>) -> Result<PlayerId, SessionError> {
        let id = self.load(act);
        self.start(id)?;
        Ok(id)
    }

    pub fn start(&mut self, player: PlayerId) -> Result<(), SessionError> {
        self.with_player(player, |player, env| player.start(env))?
            .map_err(SessionError::from)
    }

    pub fn stop(&mut self, player: PlayerId) -> Result<(), SessionError> {
        self.with_player(player, |player, env| player.stop(env))
    }

    pub fn stop_all(&mut self) {
        let ids: Vec<PlayerId> = self.players.keys().copied().collect();
        for id in ids {
            let _ = self.stop(id);
        }
    }

    /// Fire every timer due within `by`, moving the clock forward
    pub fn advance(&mut self, by: Duration) {
        let window = self.clock.begin_advance(by);
        self.fire_window(window);
    }

    /// Fire every timer due up to the absolute clock time `until`
    pub fn advance_to(&mut self, until: Duration) {
        let window = self.clock.begin_advance_to(until);
        self.fire_window(window);
    }

    fn fire_window(&mut self, window: crate::scheduler::AdvanceWindow) {
        while let Some(token) = self.clock.pop_due(&window) {
            let delivered = self.with_player(token.player, |player, env| player.on_timer(token, env));
            if delivered.is_err() {
                tracing::trace!(?token, "timer for unloaded player dropped");
            }
        }
        self.clock.end_advance(window);
    }

    /// Keep advancing to the next deadline until no timers remain or `limit`
    /// of clock time has passed. Returns the clock time consumed.
    ///
    /// A graph that never lets time pass (a cycle of scenes, say) yields
    /// through zero-delay timers forever; such runs are cut off after
    /// `MAX_ROUNDS_PER_INSTANT` rounds at the same instant.
    pub fn run_until_idle(&mut self, limit: Duration) -> Duration {
        const MAX_ROUNDS_PER_INSTANT: usize = 4096;

        let start = self.clock.now();
        let end = start + limit;
        let mut rounds = 0;
        while let Some(deadline) = self.clock.next_deadline() {
            if deadline > end {
                break;
            }
            let before = self.clock.now();
            self.advance_to(deadline);
            if self.clock.now() == before {
                rounds += 1;
                if rounds >= MAX_ROUNDS_PER_INSTANT {
                    tracing::warn!("playback is not letting time pass, giving up");
                    break;
                }
            } else {
                rounds = 0;
            }
        }
        self.clock.now() - start
    }

    fn with_player<R>(
        &mut self,
        id: PlayerId,
        f: impl FnOnce(&mut ActPlayer, &mut PlaybackEnv<'_>) -> R,
    ) -> Result<R, SessionError> {
        let Self {
            clock,
            scenes,
            signals,
            output,
            events,
            players,
            ..
        } = self;
        let player = players
            .get_mut(&id)
            .ok_or(SessionError::UnknownPlayer(id))?;
        let mut env = PlaybackEnv {
            scenes: &*scenes,
            output,
            signals: &*signals,
            scheduler: clock,
            events,
        };
        Ok(f(player, &mut env))
    }

    // --- Accessors ---

    pub fn now(&self) -> Duration {
        self.clock.now()
    }

    pub fn next_deadline(&self) -> Option<Duration> {
        self.clock.next_deadline()
    }

    pub fn pending_timers(&self) -> usize {
        self.clock.len()
    }

    pub fn player(&self, id: PlayerId) -> Option<&ActPlayer> {
        self.players.get(&id)
    }

    pub fn players(&self) -> impl Iterator<Item = &ActPlayer> {
        self.players.values()
    }

    /// First loaded player for an act
    pub fn player_for_act(&self, act: &ActId) -> Option<PlayerId> {
        self.players
            .values()
            .find(|player| player.act_id() == act)
            .map(ActPlayer::id)
    }

    pub fn is_any_playing(&self) -> bool {
        self.players.values().any(ActPlayer::is_playing)
    }

    pub fn snapshot(&self, id: PlayerId) -> Option<PlaybackState> {
        self.players
            .get(&id)
            .map(|player| player.snapshot(self.clock.now()))
    }

    pub fn output(&self) -> &O {
        &self.output
    }

    pub fn output_mut(&mut self) -> &mut O {
        &mut self.output
    }

    pub fn scenes(&self) -> &SceneLibrary {
        &self.scenes
    }

    pub fn scenes_mut(&mut self) -> &mut SceneLibrary {
        &mut self.scenes
    }

    pub fn signals_mut(&mut self) -> &mut SignalBoard {
        &mut self.signals
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    pub fn drain_events(&mut self) -> Vec<PlaybackEvent> {
        self.events.drain()
    }

    pub fn subscribe(&mut self) -> Receiver<PlaybackEvent> {
        self.events.subscribe()
    }
}
