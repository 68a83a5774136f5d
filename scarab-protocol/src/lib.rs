//! Scarab host-link protocol
//!
//! This crate defines the serial protocol between the PC client and the
//! Scarab monitor (four round displays showing live hardware metrics).
//! The protocol is line-based ASCII, one command per line:
//!
//! ```text
//! WHO_ARE_YOU?                          handshake
//! CPU:42,CPUT:55.5,GPU:31,...           telemetry frame (fire-and-forget)
//! IMG_BEGIN / IMG_DATA / IMG_END        chunked image upload, CRC32-checked
//! ```
//!
//! Everything here is pure byte/string manipulation with no I/O, so the
//! whole crate runs on the host for testing.

#![no_std]
#![deny(unsafe_code)]

#[cfg(test)]
extern crate std;

pub mod crc;
pub mod framer;
pub mod image;
pub mod telemetry;

pub use crc::{crc32, Crc32};
pub use framer::{LineFramer, MAX_LINE_LEN};
pub use image::{ImageHeader, PixelFormat, Slot, IMG_MAGIC};
pub use telemetry::{TelemetryFrame, TelemetryError};
