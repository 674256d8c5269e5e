//! DMX fixture profiles and patching

use actflow_core::FixtureId;
use serde::{Deserialize, Serialize};

/// DMX fixture profile defining channel layout
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FixtureProfile {
    pub name: String,
    pub manufacturer: String,
    pub channels: Vec<FixtureChannel>,
}

/// A channel in a fixture profile
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FixtureChannel {
    pub name: String,
    pub channel_type: ChannelType,
    #[serde(default)]
    pub default_value: u8,
}

/// Type of DMX channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChannelType {
    Dimmer,
    Red,
    Green,
    Blue,
    Amber,
    White,
    Pan,
    Tilt,
    ColorWheel,
    Gobo,
    Shutter,
    Speed,
    Generic,
}

impl ChannelType {
    fn label(self) -> &'static str {
        match self {
            ChannelType::Dimmer => "Dimmer",
            ChannelType::Red => "Red",
            ChannelType::Green => "Green",
            ChannelType::Blue => "Blue",
            ChannelType::Amber => "Amber",
            ChannelType::White => "White",
            ChannelType::Pan => "Pan",
            ChannelType::Tilt => "Tilt",
            ChannelType::ColorWheel => "Color Wheel",
            ChannelType::Gobo => "Gobo",
            ChannelType::Shutter => "Shutter",
            ChannelType::Speed => "Speed",
            ChannelType::Generic => "Generic",
        }
    }
}

impl FixtureProfile {
    /// Build a generic profile from a channel layout
    pub fn from_layout(name: impl Into<String>, layout: &[ChannelType]) -> Self {
        Self {
            name: name.into(),
            manufacturer: "Generic".to_string(),
            channels: layout
                .iter()
                .map(|&channel_type| FixtureChannel {
                    name: channel_type.label().to_string(),
                    channel_type,
                    default_value: 0,
                })
                .collect(),
        }
    }

    /// Single dimmer channel
    pub fn generic_dimmer() -> Self {
        Self::from_layout("Generic Dimmer", &[ChannelType::Dimmer])
    }

    pub fn rgb_par() -> Self {
        Self::from_layout(
            "RGB Par",
            &[ChannelType::Red, ChannelType::Green, ChannelType::Blue],
        )
    }

    pub fn rgbw_par() -> Self {
        Self::from_layout(
            "RGBW Par",
            &[
                ChannelType::Red,
                ChannelType::Green,
                ChannelType::Blue,
                ChannelType::White,
            ],
        )
    }

    /// Get the number of channels this fixture uses
    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }
}

/// A patched fixture with a starting DMX address
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fixture {
    pub id: FixtureId,
    pub name: String,
    pub profile: FixtureProfile,
    pub universe: u16,
    /// First DMX address, 1-512
    pub start_address: u16,
}

impl Fixture {
    pub fn new(
        id: impl Into<FixtureId>,
        name: impl Into<String>,
        profile: FixtureProfile,
        universe: u16,
        start_address: u16,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            profile,
            universe,
            start_address,
        }
    }

    pub fn channel_count(&self) -> u16 {
        u16::try_from(self.profile.channel_count()).unwrap_or(u16::MAX)
    }

    /// Last DMX address used by this fixture (1-based, inclusive)
    pub fn end_address(&self) -> u16 {
        self.start_address
            .saturating_add(self.channel_count())
            .saturating_sub(1)
    }

    /// True if the 0-based buffer index `channel` lies in this fixture's range
    pub fn contains_channel(&self, channel: u16) -> bool {
        let address = u32::from(channel) + 1;
        let start = u32::from(self.start_address);
        start <= address && address < start + u32::from(self.channel_count())
    }

    /// True if the two fixtures share at least one address in the same universe
    pub fn overlaps(&self, other: &Fixture) -> bool {
        self.universe == other.universe
            && self.channel_count() > 0
            && other.channel_count() > 0
            && self.start_address <= other.end_address()
            && other.start_address <= self.end_address()
    }

    /// 0-based buffer index of the first channel of `channel_type`
    pub fn channel_index(&self, channel_type: ChannelType) -> Option<u16> {
        let offset = self
            .profile
            .channels
            .iter()
            .position(|channel| channel.channel_type == channel_type)?;
        let address = usize::from(self.start_address) + offset;
        u16::try_from(address.checked_sub(1)?).ok()
    }
}
