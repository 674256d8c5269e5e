//! Art-Net protocol implementation (Art-Net 4)
//!
//! Art-Net is a UDP-based protocol for transmitting DMX512 over Ethernet.

use std::net::{SocketAddr, UdpSocket};
use std::time::{Duration, Instant};

use super::universe::UNIVERSE_SIZE;
use crate::{error::ControlError, Result};

/// Default Art-Net UDP port
pub const ARTNET_PORT: u16 = 6454;

const HEADER_LEN: usize = 18;

/// Art-Net sender for one universe
pub struct ArtNetSender {
    socket: UdpSocket,
    target: SocketAddr,
    universe: u16,
    sequence: u8,
    last_send: Option<Instant>,
    min_interval: Duration,
}

impl ArtNetSender {
    /// Create a new Art-Net sender
    ///
    /// # Arguments
    /// * `universe` - Art-Net universe (0-32767)
    /// * `target` - Destination, e.g. "255.255.255.255:6454" for broadcast
    pub fn new(universe: u16, target: &str) -> Result<Self> {
        let target: SocketAddr = target.parse().map_err(|e| {
            ControlError::DmxError(format!("Invalid Art-Net target address: {}", e))
        })?;

        let socket = UdpSocket::bind("0.0.0.0:0")?;
        socket.set_broadcast(true)?;

        tracing::info!(universe, %target, "Art-Net sender created");

        Ok(Self {
            socket,
            target,
            universe,
            sequence: 1,
            last_send: None,
            min_interval: Duration::from_millis(1000 / 30),
        })
    }

    /// Send a frame unless the previous one went out less than one refresh
    /// interval ago. Returns whether a packet was sent.
    pub fn send_dmx(&mut self, channels: &[u8; UNIVERSE_SIZE]) -> Result<bool> {
        let now = Instant::now();
        if let Some(last) = self.last_send {
            if now.duration_since(last) < self.min_interval {
                return Ok(false);
            }
        }

        let packet = build_dmx_packet(self.universe, self.sequence, channels);
        self.socket.send_to(&packet, self.target)?;
        self.sequence = next_sequence(self.sequence);
        self.last_send = Some(now);

        tracing::trace!(universe = self.universe, sequence = self.sequence, "Art-Net frame sent");
        Ok(true)
    }

    pub fn universe(&self) -> u16 {
        self.universe
    }

    pub fn target(&self) -> SocketAddr {
        self.target
    }

    /// Set the maximum frame rate
    pub fn set_refresh_rate(&mut self, hz: u32) {
        self.min_interval = Duration::from_millis(1000 / u64::from(hz.max(1)));
    }

    /// Minimum time between two frames
    pub fn refresh_interval(&self) -> Duration {
        self.min_interval
    }
}

/// Art-Net sequence numbers run 1..=255; 0 disables sequencing on receivers
fn next_sequence(sequence: u8) -> u8 {
    sequence.checked_add(1).unwrap_or(1)
}

/// Build an Art-Net DMX packet (OpDmx)
pub fn build_dmx_packet(universe: u16, sequence: u8, channels: &[u8; UNIVERSE_SIZE]) -> Vec<u8> {
    let mut packet = vec![0u8; HEADER_LEN + UNIVERSE_SIZE];

    packet[0..8].copy_from_slice(b"Art-Net\0");
    // OpDmx, little-endian
    packet[8..10].copy_from_slice(&0x5000u16.to_le_bytes());
    // protocol version 14, big-endian
    packet[10..12].copy_from_slice(&14u16.to_be_bytes());
    packet[12] = sequence;
    // physical port
    packet[13] = 0;
    // port-address, little-endian
    packet[14..16].copy_from_slice(&(universe & 0x7fff).to_le_bytes());
    packet[16..18].copy_from_slice(&(UNIVERSE_SIZE as u16).to_be_bytes());
    packet[HEADER_LEN..].copy_from_slice(channels);

    packet
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_artnet_packet_structure() {
        let mut channels = [0u8; UNIVERSE_SIZE];
        channels[0] = 255;
        channels[511] = 7;
        let packet = build_dmx_packet(3, 9, &channels);

        assert_eq!(&packet[0..8], b"Art-Net\0");
        assert_eq!((packet[8], packet[9]), (0x00, 0x50));
        assert_eq!((packet[10], packet[11]), (0, 14));
        assert_eq!(packet[12], 9);
        assert_eq!((packet[14], packet[15]), (3, 0));
        assert_eq!((packet[16], packet[17]), (0x02, 0x00));
        assert_eq!(packet[18], 255);
        assert_eq!(packet[18 + 511], 7);
        assert_eq!(packet.len(), 18 + 512);
    }

    #[test]
    fn test_invalid_target() {
        assert!(ArtNetSender::new(0, "invalid:address").is_err());
    }

    #[test]
    fn test_sequence_skips_zero() {
        assert_eq!(next_sequence(0), 1);
        assert_eq!(next_sequence(254), 255);
        assert_eq!(next_sequence(255), 1);
    }

    #[test]
    fn test_send_is_rate_limited() {
        let receiver = UdpSocket::bind("127.0.0.1:0").unwrap();
        receiver
            .set_read_timeout(Some(Duration::from_secs(2)))
            .unwrap();
        let target = receiver.local_addr().unwrap().to_string();

        let mut sender = ArtNetSender::new(1, &target).unwrap();
        sender.set_refresh_rate(1);
        let mut channels = [0u8; UNIVERSE_SIZE];
        channels[4] = 128;

        assert!(sender.send_dmx(&channels).unwrap());
        assert!(!sender.send_dmx(&channels).unwrap());

        let mut buf = [0u8; 1024];
        let (len, _) = receiver.recv_from(&mut buf).unwrap();
        assert_eq!(len, 18 + 512);
        assert_eq!(&buf[0..8], b"Art-Net\0");
        assert_eq!(buf[14], 1);
        assert_eq!(buf[18 + 4], 128);
    }
}
