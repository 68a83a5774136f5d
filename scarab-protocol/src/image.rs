//! Screensaver image format.
//!
//! Uploaded assets are stored as a 16-byte little-endian header followed by
//! raw pixel data:
//!
//! ```text
//! ┌────────┬───────┬────────┬────────┬─────────┬──────────┬───────────┐
//! │ MAGIC  │ WIDTH │ HEIGHT │ FORMAT │ VERSION │ RESERVED │ DATA_SIZE │
//! │ 4B     │ u16   │ u16    │ u8     │ u8      │ u16      │ u32       │
//! └────────┴───────┴────────┴────────┴─────────┴──────────┴───────────┘
//! ```
//!
//! Dimensions are fixed at 240x240 (the round panels); pixel data is
//! RGB565, optionally followed by an 8-bit alpha plane.

/// "SCAR" in little-endian
pub const IMG_MAGIC: u32 = 0x5343_4152;

/// Fixed image dimensions (one full round panel)
pub const IMG_WIDTH: u16 = 240;
/// Fixed image dimensions (one full round panel)
pub const IMG_HEIGHT: u16 = 240;

/// Current header version
pub const IMG_VERSION: u8 = 1;

/// Serialized header size in bytes
pub const HEADER_SIZE: usize = 16;

/// Largest pixel payload (RGB565 + alpha plane)
pub const MAX_PIXEL_BYTES: usize = IMG_WIDTH as usize * IMG_HEIGHT as usize * 3;

/// Largest accepted upload (header + pixels)
pub const MAX_IMAGE_SIZE: usize = HEADER_SIZE + MAX_PIXEL_BYTES;

/// One of the four named destinations for an uploaded image, matching the
/// four metric displays.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Slot {
    Cpu = 0,
    Gpu = 1,
    Ram = 2,
    Net = 3,
}

impl Slot {
    /// Number of slots
    pub const COUNT: usize = 4;

    /// All slots in index order
    pub const ALL: [Slot; Self::COUNT] = [Slot::Cpu, Slot::Gpu, Slot::Ram, Slot::Net];

    /// Slot for a wire-protocol index
    pub fn from_index(index: u32) -> Option<Self> {
        match index {
            0 => Some(Slot::Cpu),
            1 => Some(Slot::Gpu),
            2 => Some(Slot::Ram),
            3 => Some(Slot::Net),
            _ => None,
        }
    }

    /// Wire-protocol index
    pub fn index(self) -> usize {
        self as usize
    }
}

/// Pixel encoding of the stored data
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PixelFormat {
    /// 16-bit color, 2 bytes/pixel
    Rgb565 = 0,
    /// 16-bit color + 8-bit alpha plane, 3 bytes/pixel
    Rgb565A8 = 1,
}

impl PixelFormat {
    fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(PixelFormat::Rgb565),
            1 => Some(PixelFormat::Rgb565A8),
            _ => None,
        }
    }

    /// Bytes per pixel for this format
    pub fn bytes_per_pixel(self) -> usize {
        match self {
            PixelFormat::Rgb565 => 2,
            PixelFormat::Rgb565A8 => 3,
        }
    }
}

/// Errors from validating an image blob
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum HeaderError {
    /// Blob shorter than the fixed header
    Truncated,
    /// Magic bytes do not match
    BadMagic,
    /// Dimensions differ from the fixed panel size
    BadDimensions,
    /// Unknown pixel format byte
    BadFormat,
    /// data_size inconsistent with the blob length or the pixel format
    SizeMismatch,
}

/// Validated image header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ImageHeader {
    pub width: u16,
    pub height: u16,
    pub format: PixelFormat,
    pub version: u8,
    pub data_size: u32,
}

impl ImageHeader {
    /// Parse and validate the header of a complete image blob.
    ///
    /// Checks magic, the fixed dimensions, the pixel format, and that
    /// `data_size` matches both the blob length and `width*height*bpp`.
    pub fn parse(blob: &[u8]) -> Result<Self, HeaderError> {
        if blob.len() < HEADER_SIZE {
            return Err(HeaderError::Truncated);
        }

        let magic = u32::from_le_bytes([blob[0], blob[1], blob[2], blob[3]]);
        if magic != IMG_MAGIC {
            return Err(HeaderError::BadMagic);
        }

        let width = u16::from_le_bytes([blob[4], blob[5]]);
        let height = u16::from_le_bytes([blob[6], blob[7]]);
        if width != IMG_WIDTH || height != IMG_HEIGHT {
            return Err(HeaderError::BadDimensions);
        }

        let format = PixelFormat::from_u8(blob[8]).ok_or(HeaderError::BadFormat)?;
        let version = blob[9];
        // blob[10..12] reserved
        let data_size = u32::from_le_bytes([blob[12], blob[13], blob[14], blob[15]]);

        let expected = width as usize * height as usize * format.bytes_per_pixel();
        if data_size as usize != expected || blob.len() != HEADER_SIZE + data_size as usize {
            return Err(HeaderError::SizeMismatch);
        }

        Ok(Self {
            width,
            height,
            format,
            version,
            data_size,
        })
    }

    /// Serialize the header (host tooling and tests)
    pub fn encode(&self) -> [u8; HEADER_SIZE] {
        let mut out = [0u8; HEADER_SIZE];
        out[0..4].copy_from_slice(&IMG_MAGIC.to_le_bytes());
        out[4..6].copy_from_slice(&self.width.to_le_bytes());
        out[6..8].copy_from_slice(&self.height.to_le_bytes());
        out[8] = self.format as u8;
        out[9] = self.version;
        // out[10..12] reserved
        out[12..16].copy_from_slice(&self.data_size.to_le_bytes());
        out
    }
}

/// Hex payload decoding errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum HexError {
    /// Payload has an odd number of digits
    OddLength,
    /// Non-hex character in the payload
    InvalidDigit,
    /// Destination slice too small
    BufferTooSmall,
}

/// Decode an even-length hex string into `dst`, returning the byte count
pub fn decode_hex(src: &str, dst: &mut [u8]) -> Result<usize, HexError> {
    let src = src.as_bytes();
    if src.len() % 2 != 0 {
        return Err(HexError::OddLength);
    }
    let len = src.len() / 2;
    if dst.len() < len {
        return Err(HexError::BufferTooSmall);
    }

    for (i, pair) in src.chunks_exact(2).enumerate() {
        let hi = hex_digit(pair[0]).ok_or(HexError::InvalidDigit)?;
        let lo = hex_digit(pair[1]).ok_or(HexError::InvalidDigit)?;
        dst[i] = (hi << 4) | lo;
    }

    Ok(len)
}

fn hex_digit(c: u8) -> Option<u8> {
    match c {
        b'0'..=b'9' => Some(c - b'0'),
        b'a'..=b'f' => Some(c - b'a' + 10),
        b'A'..=b'F' => Some(c - b'A' + 10),
        _ => None,
    }
}
