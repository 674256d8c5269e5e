//! DMX universe buffer with a fixture patch

use super::fixtures::Fixture;
use crate::{error::ControlError, Result};
use actflow_core::{DmxOutput, FixtureId};

/// Number of channels in one DMX512 universe
pub const UNIVERSE_SIZE: usize = 512;

/// One universe of DMX channel values.
///
/// Playback writes into the buffer through [`DmxOutput`]; the show runner
/// sends it out whenever it changed.
#[derive(Debug, Clone)]
pub struct DmxUniverse {
    universe: u16,
    channels: [u8; UNIVERSE_SIZE],
    fixtures: Vec<Fixture>,
    dirty: bool,
}

impl DmxUniverse {
    pub fn new(universe: u16) -> Self {
        Self {
            universe,
            channels: [0; UNIVERSE_SIZE],
            fixtures: Vec::new(),
            dirty: false,
        }
    }

    pub fn universe(&self) -> u16 {
        self.universe
    }

    pub fn channels(&self) -> &[u8; UNIVERSE_SIZE] {
        &self.channels
    }

    pub fn fixtures(&self) -> &[Fixture] {
        &self.fixtures
    }

    pub fn fixture(&self, id: &str) -> Option<&Fixture> {
        self.fixtures.iter().find(|fixture| fixture.id == id)
    }

    /// Patch a fixture into this universe
    pub fn patch(&mut self, fixture: Fixture) -> Result<()> {
        if fixture.universe != self.universe {
            return Err(ControlError::InvalidParameter(format!(
                "fixture {} is on universe {}, not {}",
                fixture.id, fixture.universe, self.universe
            )));
        }
        if fixture.start_address == 0 || usize::from(fixture.end_address()) > UNIVERSE_SIZE {
            return Err(ControlError::InvalidParameter(format!(
                "fixture {} does not fit at address {}",
                fixture.id, fixture.start_address
            )));
        }
        if let Some(existing) = self
            .fixtures
            .iter()
            .find(|existing| existing.id == fixture.id || existing.overlaps(&fixture))
        {
            return Err(ControlError::InvalidParameter(format!(
                "fixture {} conflicts with {}",
                fixture.id, existing.id
            )));
        }
        tracing::debug!(fixture = %fixture.id, start = fixture.start_address, end = fixture.end_address(), "fixture patched");
        self.fixtures.push(fixture);
        Ok(())
    }

    pub fn unpatch(&mut self, id: &str) -> Option<Fixture> {
        let index = self.fixtures.iter().position(|fixture| fixture.id == id)?;
        Some(self.fixtures.remove(index))
    }

    /// Zero every channel
    pub fn blackout(&mut self) {
        self.channels = [0; UNIVERSE_SIZE];
        self.dirty = true;
    }

    /// Return whether the buffer changed since the last call, clearing the flag
    pub fn take_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }
}

impl DmxOutput for DmxUniverse {
    fn set_channel_value(&mut self, channel: u16, value: u8) {
        match self.channels.get_mut(usize::from(channel)) {
            Some(slot) => {
                if *slot != value {
                    *slot = value;
                    self.dirty = true;
                }
                tracing::trace!(universe = self.universe, channel, value, "dmx write");
            }
            None => tracing::warn!(universe = self.universe, channel, "dmx channel out of range"),
        }
    }

    fn fixture_for_channel(&self, channel: u16) -> Option<FixtureId> {
        self.fixtures
            .iter()
            .find(|fixture| fixture.contains_channel(channel))
            .map(|fixture| fixture.id.clone())
    }

    fn channel_value(&self, channel: u16) -> Option<u8> {
        self.channels.get(usize::from(channel)).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dmx::FixtureProfile;

    #[test]
    fn test_writes_mark_dirty() {
        let mut universe = DmxUniverse::new(0);
        assert!(!universe.take_dirty());

        universe.set_channel_value(10, 200);
        assert!(universe.take_dirty());
        assert!(!universe.take_dirty());

        // same value again is not a change
        universe.set_channel_value(10, 200);
        assert!(!universe.take_dirty());
        assert_eq!(universe.channel_value(10), Some(200));
    }

    #[test]
    fn test_out_of_range_write_is_ignored() {
        let mut universe = DmxUniverse::new(0);
        universe.set_channel_value(512, 255);
        assert!(!universe.take_dirty());
        assert_eq!(universe.channel_value(512), None);
    }

    #[test]
    fn test_fixture_lookup() {
        let mut universe = DmxUniverse::new(0);
        universe
            .patch(Fixture::new("left", "Left", FixtureProfile::rgb_par(), 0, 1))
            .unwrap();
        universe
            .patch(Fixture::new("right", "Right", FixtureProfile::rgb_par(), 0, 4))
            .unwrap();

        assert_eq!(universe.fixture_for_channel(2).as_deref(), Some("left"));
        assert_eq!(universe.fixture_for_channel(3).as_deref(), Some("right"));
        assert_eq!(universe.fixture_for_channel(6), None);
    }

    #[test]
    fn test_patch_rejects_conflicts() {
        let mut universe = DmxUniverse::new(0);
        universe
            .patch(Fixture::new("a", "A", FixtureProfile::rgb_par(), 0, 1))
            .unwrap();

        let overlapping = Fixture::new("b", "B", FixtureProfile::rgb_par(), 0, 3);
        assert!(universe.patch(overlapping).is_err());
        let duplicate = Fixture::new("a", "A again", FixtureProfile::rgb_par(), 0, 100);
        assert!(universe.patch(duplicate).is_err());
        let too_far = Fixture::new("c", "C", FixtureProfile::rgb_par(), 0, 511);
        assert!(universe.patch(too_far).is_err());
        let other_universe = Fixture::new("d", "D", FixtureProfile::rgb_par(), 2, 1);
        assert!(universe.patch(other_universe).is_err());

        assert!(universe.unpatch("a").is_some());
        assert!(universe.fixtures().is_empty());
    }
}
