//! Frame checksums.
use crc::{Crc, CRC_16_XMODEM};

/// Checksum stored in a frame alongside the value computed over its bytes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Checksum {
    pub expected: u32,
    pub actual: u32,
}

impl Checksum {
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.expected == self.actual
    }
}

pub trait ChecksumVerifier: Send + Sync {
    /// Compute the checksum for a complete frame, or `None` if `frame` is too short to
    /// contain one.
    fn compute(&self, frame: &[u8]) -> Option<Checksum>;

    fn verify(&self, frame: &[u8]) -> bool {
        self.compute(frame).is_some_and(|c| c.is_valid())
    }
}

/// PD0: 16-bit wrapping sum of every byte before the trailing little-endian u16.
pub struct Pd0Checksum;

impl Pd0Checksum {
    pub const LEN: usize = 2;
}

impl ChecksumVerifier for Pd0Checksum {
    fn compute(&self, frame: &[u8]) -> Option<Checksum> {
        if frame.len() < Self::LEN {
            return None;
        }
        let (body, tail) = frame.split_at(frame.len() - Self::LEN);
        let actual = body
            .iter()
            .fold(0u16, |sum, b| sum.wrapping_add(u16::from(*b)));
        Some(Checksum {
            expected: u32::from(u16::from_le_bytes([tail[0], tail[1]])),
            actual: u32::from(actual),
        })
    }
}

const XMODEM: Crc<u16> = Crc::<u16>::new(&CRC_16_XMODEM);

/// RTB: CRC-16/XMODEM over the payload between the 32-byte header and the trailing
/// little-endian u32.
pub struct RtbChecksum;

impl RtbChecksum {
    pub const HEADER_LEN: usize = 32;
    pub const LEN: usize = 4;
}

impl ChecksumVerifier for RtbChecksum {
    fn compute(&self, frame: &[u8]) -> Option<Checksum> {
        if frame.len() < Self::HEADER_LEN + Self::LEN {
            return None;
        }
        let (body, tail) = frame.split_at(frame.len() - Self::LEN);
        Some(Checksum {
            expected: u32::from_le_bytes([tail[0], tail[1], tail[2], tail[3]]),
            actual: u32::from(XMODEM.checksum(&body[Self::HEADER_LEN..])),
        })
    }
}

/// Compute the RTB payload checksum, used when building frames.
#[must_use]
pub fn rtb_crc(payload: &[u8]) -> u16 {
    XMODEM.checksum(payload)
}
