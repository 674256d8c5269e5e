//! ActFlow Control - Output and show control
//!
//! This crate connects the playback engine to the outside world:
//! - **DMX**: a universe buffer with fixture patching, sent out over Art-Net
//! - **Triggers**: MIDI and OSC messages that start acts
//! - **Show runner**: a tokio actor that plays acts against wall-clock time
//!
//! ## Modules
//!
//! - [`dmx`] - DMX universe, fixtures and Art-Net
//! - [`triggers`] - MIDI/OSC act triggers
//! - [`runner`] - Show runner and its command handle
//! - [`error`] - Error types

/// Error types
pub mod error;

/// DMX output (universe buffer, fixtures, Art-Net)
pub mod dmx;

/// Show runner
pub mod runner;

/// MIDI/OSC act triggers
pub mod triggers;

// Re-exports
pub use dmx::{ArtNetSender, ChannelType, DmxUniverse, Fixture, FixtureProfile};
pub use error::{ControlError, Result};
pub use runner::{RunnerCommand, RunnerHandle, ShowRunner};
pub use triggers::{MidiMessage, OscMessage};
