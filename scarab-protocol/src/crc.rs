//! Incremental CRC-32 for image uploads.
//!
//! Standard reflected CRC-32 (polynomial 0xEDB88320, initial and final
//! complement), computed bitwise so it costs no table RAM. Must stay
//! bit-for-bit compatible with the host side, which uses zlib's crc32.

const POLY: u32 = 0xEDB8_8320;

/// Running CRC-32 over a stream of chunks
#[derive(Debug, Clone)]
pub struct Crc32 {
    state: u32,
}

impl Default for Crc32 {
    fn default() -> Self {
        Self::new()
    }
}

impl Crc32 {
    /// Start a new checksum
    pub const fn new() -> Self {
        Self { state: 0xFFFF_FFFF }
    }

    /// Fold a chunk into the running checksum
    pub fn update(&mut self, data: &[u8]) {
        for &byte in data {
            self.state ^= byte as u32;
            for _ in 0..8 {
                let mask = (self.state & 1).wrapping_neg();
                self.state = (self.state >> 1) ^ (POLY & mask);
            }
        }
    }

    /// Final checksum value
    pub fn finalize(&self) -> u32 {
        !self.state
    }
}

/// One-shot CRC-32 of a buffer
pub fn crc32(data: &[u8]) -> u32 {
    let mut crc = Crc32::new();
    crc.update(data);
    crc.finalize()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_value() {
        // Standard CRC-32 check value
        assert_eq!(crc32(b"123456789"), 0xCBF4_3926);
    }

    #[test]
    fn test_empty() {
        assert_eq!(crc32(b""), 0);
    }

    #[test]
    fn test_incremental_matches_oneshot() {
        let data = b"the quick brown fox jumps over the lazy dog";
        let mut crc = Crc32::new();
        for chunk in data.chunks(7) {
            crc.update(chunk);
        }
        assert_eq!(crc.finalize(), crc32(data));
    }

    #[test]
    fn test_bit_flip_changes_checksum() {
        let mut data = [0x55u8; 64];
        let clean = crc32(&data);
        data[40] ^= 0x01;
        assert_ne!(crc32(&data), clean);
    }
}
