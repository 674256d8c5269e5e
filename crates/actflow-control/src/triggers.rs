//! Act triggers
//!
//! Incoming MIDI and OSC messages can start acts. Transport is somebody
//! else's job: these types are what a MIDI or OSC listener hands over once
//! it has decoded a message.

use actflow_core::{ActTriggers, MidiActTrigger, OscActTrigger};
use serde::{Deserialize, Serialize};

/// OSC values above this count as a button press
pub const OSC_PRESS_THRESHOLD: f32 = 0.5;

/// A decoded MIDI channel message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MidiMessage {
    NoteOn { channel: u8, note: u8, velocity: u8 },
    NoteOff { channel: u8, note: u8 },
    ControlChange { channel: u8, controller: u8, value: u8 },
}

impl MidiMessage {
    pub fn channel(&self) -> u8 {
        match self {
            MidiMessage::NoteOn { channel, .. }
            | MidiMessage::NoteOff { channel, .. }
            | MidiMessage::ControlChange { channel, .. } => *channel,
        }
    }
}

/// A decoded OSC message with its first numeric argument
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OscMessage {
    pub address: String,
    /// First numeric argument, if the message had one
    pub value: Option<f32>,
}

impl OscMessage {
    pub fn new(address: impl Into<String>, value: f32) -> Self {
        Self {
            address: address.into(),
            value: Some(value),
        }
    }

    /// Message without arguments
    pub fn bare(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            value: None,
        }
    }
}

/// True if `message` is a note-on that fires this trigger.
///
/// A note-on with velocity 0 is a note-off by MIDI convention.
pub fn midi_fires(trigger: &MidiActTrigger, message: &MidiMessage) -> bool {
    match *message {
        MidiMessage::NoteOn {
            channel,
            note,
            velocity,
        } => trigger.enabled && velocity > 0 && channel == trigger.channel && note == trigger.note,
        _ => false,
    }
}

/// True if `message` is a press on this trigger's address
pub fn osc_fires(trigger: &OscActTrigger, message: &OscMessage) -> bool {
    trigger.enabled
        && !trigger.address.is_empty()
        && trigger.address == message.address
        && message.value.is_some_and(|value| value > OSC_PRESS_THRESHOLD)
}

/// Check every trigger an act carries against a MIDI message
pub fn triggered_by_midi(triggers: &ActTriggers, message: &MidiMessage) -> bool {
    triggers
        .midi
        .as_ref()
        .is_some_and(|trigger| midi_fires(trigger, message))
}

/// Check every trigger an act carries against an OSC message
pub fn triggered_by_osc(triggers: &ActTriggers, message: &OscMessage) -> bool {
    triggers
        .osc
        .as_ref()
        .is_some_and(|trigger| osc_fires(trigger, message))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn note_trigger() -> MidiActTrigger {
        MidiActTrigger {
            channel: 0,
            note: 60,
            enabled: true,
        }
    }

    #[test]
    fn test_midi_trigger_matching() {
        let trigger = note_trigger();

        let matching = MidiMessage::NoteOn {
            channel: 0,
            note: 60,
            velocity: 100,
        };
        assert!(midi_fires(&trigger, &matching));

        let other_note = MidiMessage::NoteOn {
            channel: 0,
            note: 61,
            velocity: 100,
        };
        assert!(!midi_fires(&trigger, &other_note));

        let wrong_channel = MidiMessage::NoteOn {
            channel: 1,
            note: 60,
            velocity: 100,
        };
        assert!(!midi_fires(&trigger, &wrong_channel));

        let released = MidiMessage::NoteOn {
            channel: 0,
            note: 60,
            velocity: 0,
        };
        assert!(!midi_fires(&trigger, &released));
        assert!(!midi_fires(
            &trigger,
            &MidiMessage::NoteOff {
                channel: 0,
                note: 60
            }
        ));
    }

    #[test]
    fn test_disabled_trigger_never_fires() {
        let trigger = MidiActTrigger {
            enabled: false,
            ..note_trigger()
        };
        let message = MidiMessage::NoteOn {
            channel: 0,
            note: 60,
            velocity: 127,
        };
        assert!(!midi_fires(&trigger, &message));
    }

    #[test]
    fn test_osc_trigger_needs_press() {
        let trigger = OscActTrigger {
            address: "/act/intro".to_string(),
            enabled: true,
        };

        assert!(osc_fires(&trigger, &OscMessage::new("/act/intro", 1.0)));
        assert!(!osc_fires(&trigger, &OscMessage::new("/act/intro", 0.5)));
        assert!(!osc_fires(&trigger, &OscMessage::bare("/act/intro")));
        assert!(!osc_fires(&trigger, &OscMessage::new("/act/outro", 1.0)));
    }

    #[test]
    fn test_act_triggers() {
        let triggers = ActTriggers {
            osc: None,
            midi: Some(note_trigger()),
        };
        let message = MidiMessage::NoteOn {
            channel: 0,
            note: 60,
            velocity: 90,
        };
        assert!(triggered_by_midi(&triggers, &message));
        assert!(!triggered_by_osc(&triggers, &OscMessage::new("/x", 1.0)));
    }
}
