//! Programming packets received from an external programmer
//!
//! Wire format, high byte first:
//!
//! ```text
//! [channel_hi, channel_lo, crc_hi, crc_lo]
//! ```
//!
//! The CRC is the parameter block CRC taken over the two channel bytes in wire
//! order.

use embedded_io::{Read, ReadExactError};

use crate::params::crc16;

pub const PACKET_LEN: usize = 4;

/// Why no packet could be taken from the link
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PacketError {
    /// Link ran dry before four bytes arrived
    Incomplete,
    /// Link reported an error
    Link,
}

/// Result of one programming-mode step
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PacketOutcome {
    /// CRC matched, channel saved
    Accepted(u16),
    /// CRC mismatch, packet dropped
    Rejected,
    /// Nothing complete to process
    Incomplete,
}

#[derive(Copy, Clone, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ProgrammingPacket([u8; PACKET_LEN]);

impl ProgrammingPacket {
    /// Packet carrying `channel` with a matching CRC
    pub fn new(channel: u16) -> Self {
        let [hi, lo] = channel.to_be_bytes();
        let [crc_hi, crc_lo] = crc16(&[hi, lo]).to_be_bytes();
        Self([hi, lo, crc_hi, crc_lo])
    }

    pub const fn from_bytes(bytes: [u8; PACKET_LEN]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; PACKET_LEN] {
        &self.0
    }

    pub fn channel(&self) -> u16 {
        u16::from_be_bytes([self.0[0], self.0[1]])
    }

    pub fn crc(&self) -> u16 {
        u16::from_be_bytes([self.0[2], self.0[3]])
    }

    pub fn is_valid(&self) -> bool {
        crc16(&self.0[..2]) == self.crc()
    }

    /// Block until four bytes have been read from `link`
    pub fn read_from<R: Read>(link: &mut R) -> Result<Self, PacketError> {
        let mut bytes = [0u8; PACKET_LEN];
        match link.read_exact(&mut bytes) {
            Ok(()) => Ok(Self(bytes)),
            Err(ReadExactError::UnexpectedEof) => Err(PacketError::Incomplete),
            Err(ReadExactError::Other(_)) => Err(PacketError::Link),
        }
    }
}
