//! Show runner
//!
//! Drives a [`PlaybackSession`] from the tokio clock. The runner is an actor:
//! it owns the session and the Art-Net sender, sleeps until the next timer
//! deadline or command, advances the session to wall-clock time and flushes
//! the universe when it changed.

use crate::dmx::{ArtNetSender, DmxUniverse};
use crate::triggers::{self, MidiMessage, OscMessage};
use crate::{error::ControlError, Result};
use actflow_core::{Act, ActId, PlaybackSession, PlayerId};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{sleep_until, Instant};
use tracing::{debug, info, warn};

/// Requests accepted by a running [`ShowRunner`]
#[derive(Debug, Clone)]
pub enum RunnerCommand {
    /// Start (or restart) an act, by id or name
    Start(String),
    /// Stop an act, by id or name
    Stop(String),
    StopAll,
    Midi(MidiMessage),
    Osc(OscMessage),
    Shutdown,
}

/// Cloneable handle for sending commands to a [`ShowRunner`]
#[derive(Debug, Clone)]
pub struct RunnerHandle {
    commands: mpsc::UnboundedSender<RunnerCommand>,
}

impl RunnerHandle {
    pub fn send(&self, command: RunnerCommand) -> Result<()> {
        self.commands
            .send(command)
            .map_err(|_| ControlError::RunnerClosed)
    }

    pub fn start(&self, act: impl Into<String>) -> Result<()> {
        self.send(RunnerCommand::Start(act.into()))
    }

    pub fn stop(&self, act: impl Into<String>) -> Result<()> {
        self.send(RunnerCommand::Stop(act.into()))
    }

    pub fn stop_all(&self) -> Result<()> {
        self.send(RunnerCommand::StopAll)
    }

    pub fn midi(&self, message: MidiMessage) -> Result<()> {
        self.send(RunnerCommand::Midi(message))
    }

    pub fn osc(&self, message: OscMessage) -> Result<()> {
        self.send(RunnerCommand::Osc(message))
    }

    pub fn shutdown(&self) -> Result<()> {
        self.send(RunnerCommand::Shutdown)
    }
}

/// Plays acts against wall-clock time
pub struct ShowRunner {
    session: PlaybackSession<DmxUniverse>,
    acts: Vec<Arc<Act>>,
    artnet: Option<ArtNetSender>,
    commands: mpsc::UnboundedReceiver<RunnerCommand>,
    epoch: Instant,
    exit_when_idle: bool,
    unsent_frame: bool,
}

impl ShowRunner {
    pub fn new(
        session: PlaybackSession<DmxUniverse>,
        acts: Vec<Arc<Act>>,
        artnet: Option<ArtNetSender>,
    ) -> (Self, RunnerHandle) {
        let (tx, rx) = mpsc::unbounded_channel();
        let runner = Self {
            session,
            acts,
            artnet,
            commands: rx,
            epoch: Instant::now(),
            exit_when_idle: false,
            unsent_frame: false,
        };
        (runner, RunnerHandle { commands: tx })
    }

    /// Return from [`ShowRunner::run`] once no act is playing
    pub fn exit_when_idle(mut self, exit: bool) -> Self {
        self.exit_when_idle = exit;
        self
    }

    pub fn session(&self) -> &PlaybackSession<DmxUniverse> {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut PlaybackSession<DmxUniverse> {
        &mut self.session
    }

    pub fn acts(&self) -> &[Arc<Act>] {
        &self.acts
    }

    /// Find an act by id, falling back to its name
    pub fn find_act(&self, key: &str) -> Option<&Arc<Act>> {
        self.acts
            .iter()
            .find(|act| act.id.as_str() == key)
            .or_else(|| self.acts.iter().find(|act| act.name == key))
    }

    /// Start an act, reusing its player when it was played before
    pub fn start_act(&mut self, key: &str) -> Result<PlayerId> {
        self.sync_clock();
        let act = self
            .find_act(key)
            .cloned()
            .ok_or_else(|| ControlError::ActNotFound(key.to_string()))?;
        let player = match self.session.player_for_act(&act.id) {
            Some(player) => {
                self.session.start(player)?;
                player
            }
            None => self.session.play(act)?,
        };
        self.flush();
        Ok(player)
    }

    pub fn stop_act(&mut self, key: &str) -> Result<()> {
        let act = self
            .find_act(key)
            .ok_or_else(|| ControlError::ActNotFound(key.to_string()))?;
        let act_id = act.id.clone();
        if let Some(player) = self.session.player_for_act(&act_id) {
            self.session.stop(player)?;
        }
        Ok(())
    }

    /// Feed a MIDI message: control changes update condition signals, note-ons
    /// start every act they trigger. Returns the acts started.
    pub fn handle_midi(&mut self, message: &MidiMessage) -> Vec<ActId> {
        if let MidiMessage::ControlChange {
            channel,
            controller,
            value,
        } = *message
        {
            self.session
                .signals_mut()
                .set_midi_cc(channel, controller, value);
        }
        let matched: Vec<ActId> = self
            .acts
            .iter()
            .filter(|act| triggers::triggered_by_midi(&act.triggers, message))
            .map(|act| act.id.clone())
            .collect();
        self.start_triggered(matched, "midi")
    }

    /// Feed an OSC message: its value updates condition signals, presses
    /// start every act they trigger. Returns the acts started.
    pub fn handle_osc(&mut self, message: &OscMessage) -> Vec<ActId> {
        if let Some(value) = message.value {
            self.session
                .signals_mut()
                .set_osc(message.address.clone(), f64::from(value));
        }
        let matched: Vec<ActId> = self
            .acts
            .iter()
            .filter(|act| triggers::triggered_by_osc(&act.triggers, message))
            .map(|act| act.id.clone())
            .collect();
        self.start_triggered(matched, "osc")
    }

    fn start_triggered(&mut self, acts: Vec<ActId>, source: &str) -> Vec<ActId> {
        let mut started = Vec::with_capacity(acts.len());
        for id in acts {
            match self.start_act(id.as_str()) {
                Ok(_) => {
                    info!(act = %id, source, "act triggered");
                    started.push(id);
                }
                Err(error) => warn!(act = %id, source, %error, "triggered act failed to start"),
            }
        }
        started
    }

    /// Run until shut down, every handle is dropped, or (with
    /// [`ShowRunner::exit_when_idle`]) playback ends. Returns the session.
    pub async fn run(mut self) -> PlaybackSession<DmxUniverse> {
        info!(acts = self.acts.len(), "show runner started");
        loop {
            if self.exit_when_idle && !self.session.is_any_playing() {
                debug!("no act playing, show runner exiting");
                break;
            }

            let wake = self.next_wake();
            tokio::select! {
                command = self.commands.recv() => match command {
                    Some(RunnerCommand::Shutdown) | None => break,
                    Some(command) => self.apply(command),
                },
                _ = sleep_until_some(wake) => {}
            }
            self.tick();
        }

        self.session.stop_all();
        self.unsent_frame |= self.session.output_mut().take_dirty();
        self.force_flush();
        info!("show runner stopped");
        self.session
    }

    fn apply(&mut self, command: RunnerCommand) {
        let result = match command {
            RunnerCommand::Start(key) => self.start_act(&key).map(|_| ()),
            RunnerCommand::Stop(key) => self.stop_act(&key),
            RunnerCommand::StopAll => {
                self.session.stop_all();
                Ok(())
            }
            RunnerCommand::Midi(message) => {
                self.handle_midi(&message);
                Ok(())
            }
            RunnerCommand::Osc(message) => {
                self.handle_osc(&message);
                Ok(())
            }
            RunnerCommand::Shutdown => Ok(()),
        };
        if let Err(error) = result {
            warn!(%error, "runner command failed");
        }
    }

    /// Earliest of the next timer deadline and a pending Art-Net retry
    fn next_wake(&self) -> Option<Instant> {
        let timer = self
            .session
            .next_deadline()
            .map(|deadline| self.epoch + deadline);
        let retry = match (&self.artnet, self.unsent_frame) {
            (Some(sender), true) => Some(Instant::now() + sender.refresh_interval()),
            _ => None,
        };
        match (timer, retry) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    fn elapsed(&self) -> Duration {
        Instant::now().saturating_duration_since(self.epoch)
    }

    /// Fire everything due by wall-clock time. Also releases zero-delay
    /// yields, which are due at the current instant.
    fn sync_clock(&mut self) {
        let now = self.elapsed();
        self.session.advance_to(now);
    }

    fn tick(&mut self) {
        self.sync_clock();
        self.flush();
    }

    fn flush(&mut self) {
        self.unsent_frame |= self.session.output_mut().take_dirty();
        if !self.unsent_frame {
            return;
        }
        let Some(sender) = self.artnet.as_mut() else {
            self.unsent_frame = false;
            return;
        };
        match sender.send_dmx(self.session.output().channels()) {
            Ok(sent) => self.unsent_frame = !sent,
            Err(error) => {
                warn!(%error, "Art-Net send failed");
                self.unsent_frame = false;
            }
        }
    }

    fn force_flush(&mut self) {
        if let Some(sender) = self.artnet.as_mut() {
            sender.set_refresh_rate(u32::MAX);
        }
        self.flush();
    }
}

async fn sleep_until_some(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}
