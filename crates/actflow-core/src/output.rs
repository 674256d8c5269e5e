//! Output adapter and signal source interfaces
//!
//! The engine never talks to hardware directly. Scene nodes write through a
//! [`DmxOutput`], and condition nodes read their inputs from a
//! [`SignalSource`]. Several players may share one output; writes land in
//! call order, so the last write to a channel wins.

use crate::act::FixtureId;
use crate::condition::SignalRef;
use std::collections::HashMap;

/// Sink for DMX channel writes
pub trait DmxOutput {
    /// Set a 0-based channel to `value`
    fn set_channel_value(&mut self, channel: u16, value: u8);

    /// Fixture whose address range covers `channel`, if any
    fn fixture_for_channel(&self, channel: u16) -> Option<FixtureId>;

    /// Current value of a channel, when the sink keeps one
    fn channel_value(&self, _channel: u16) -> Option<u8> {
        None
    }
}

impl<T: DmxOutput + ?Sized> DmxOutput for &mut T {
    fn set_channel_value(&mut self, channel: u16, value: u8) {
        (**self).set_channel_value(channel, value);
    }

    fn fixture_for_channel(&self, channel: u16) -> Option<FixtureId> {
        (**self).fixture_for_channel(channel)
    }

    fn channel_value(&self, channel: u16) -> Option<u8> {
        (**self).channel_value(channel)
    }
}

/// Source of external values for condition nodes
pub trait SignalSource {
    fn signal_value(&self, signal: &SignalRef) -> Option<f64>;
}

/// Latest known value of each external signal
#[derive(Debug, Clone, Default)]
pub struct SignalBoard {
    values: HashMap<SignalRef, f64>,
}

impl SignalBoard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, signal: SignalRef, value: f64) {
        self.values.insert(signal, value);
    }

    pub fn clear(&mut self, signal: &SignalRef) {
        self.values.remove(signal);
    }

    /// Record a MIDI control change
    pub fn set_midi_cc(&mut self, channel: u8, controller: u8, value: u8) {
        self.set(SignalRef::Midi { channel, controller }, f64::from(value));
    }

    /// Record the float argument of an OSC message
    pub fn set_osc(&mut self, address: impl Into<String>, value: f64) {
        self.set(
            SignalRef::Osc {
                address: address.into(),
            },
            value,
        );
    }
}

impl SignalSource for SignalBoard {
    fn signal_value(&self, signal: &SignalRef) -> Option<f64> {
        self.values.get(signal).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signal_board_roundtrip() {
        let mut board = SignalBoard::new();
        board.set_midi_cc(1, 7, 100);
        board.set_osc("/fader/1", 0.5);

        assert_eq!(
            board.signal_value(&SignalRef::Midi {
                channel: 1,
                controller: 7
            }),
            Some(100.0)
        );
        assert_eq!(
            board.signal_value(&SignalRef::Osc {
                address: "/fader/1".to_string()
            }),
            Some(0.5)
        );

        board.clear(&SignalRef::Osc {
            address: "/fader/1".to_string(),
        });
        assert_eq!(
            board.signal_value(&SignalRef::Osc {
                address: "/fader/1".to_string()
            }),
            None
        );
    }
}
