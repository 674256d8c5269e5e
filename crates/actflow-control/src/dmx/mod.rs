//! DMX output
//!
//! Playback writes into a [`DmxUniverse`], a 512-channel buffer that also
//! knows which fixture is patched where, so scene nodes can mute fixtures.
//! The buffer goes out over Art-Net through an [`ArtNetSender`].
//!
//! ```rust
//! use actflow_control::dmx::{DmxUniverse, Fixture, FixtureProfile};
//! use actflow_core::DmxOutput;
//!
//! let mut universe = DmxUniverse::new(0);
//! universe
//!     .patch(Fixture::new("front", "Front RGB", FixtureProfile::rgb_par(), 0, 1))
//!     .unwrap();
//!
//! universe.set_channel_value(1, 128);
//! assert_eq!(universe.fixture_for_channel(1).as_deref(), Some("front"));
//! ```

pub mod artnet;
pub mod fixtures;
pub mod universe;

pub use artnet::{build_dmx_packet, ArtNetSender, ARTNET_PORT};
pub use fixtures::{ChannelType, Fixture, FixtureChannel, FixtureProfile};
pub use universe::{DmxUniverse, UNIVERSE_SIZE};
