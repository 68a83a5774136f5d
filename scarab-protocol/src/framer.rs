//! Line framing for the raw host byte stream.
//!
//! The host link delivers bytes in arbitrary chunks. The framer accumulates
//! them into newline-terminated command lines:
//! - `'\n'` and `'\r'` both terminate a line; consecutive delimiters (e.g.
//!   `\r\n`) produce no empty lines.
//! - A line longer than the buffer capacity puts the framer into discard
//!   mode: the rest of the oversized line is dropped and the framer resyncs
//!   at the next delimiter.

use heapless::Vec;

/// Maximum accepted line length (must fit hex-encoded IMG_DATA chunks)
pub const MAX_LINE_LEN: usize = 2048;

/// Accumulates raw bytes into complete command lines.
#[derive(Debug, Clone)]
pub struct LineFramer<const N: usize = MAX_LINE_LEN> {
    buf: Vec<u8, N>,
    discarding: bool,
    overflows: u32,
    bad_encoding: u32,
}

impl<const N: usize> Default for LineFramer<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> LineFramer<N> {
    /// Create a new framer with an empty buffer
    pub const fn new() -> Self {
        Self {
            buf: Vec::new(),
            discarding: false,
            overflows: 0,
            bad_encoding: 0,
        }
    }

    /// Feed a chunk of raw bytes, invoking `emit` once per complete line.
    ///
    /// Each emitted line is the accumulated content between delimiters,
    /// without the delimiter itself. No line is ever delivered twice and
    /// no byte ends up in two different lines, regardless of how the input
    /// is chunked across calls.
    pub fn feed<F: FnMut(&str)>(&mut self, bytes: &[u8], mut emit: F) {
        for &byte in bytes {
            if byte == b'\n' || byte == b'\r' {
                if self.discarding {
                    // Delimiter ends discard mode; the oversized line is lost
                    self.discarding = false;
                } else if !self.buf.is_empty() {
                    match core::str::from_utf8(&self.buf) {
                        Ok(line) => emit(line),
                        Err(_) => self.bad_encoding = self.bad_encoding.wrapping_add(1),
                    }
                }
                self.buf.clear();
            } else if self.discarding {
                // Drop everything until the next delimiter
            } else if self.buf.push(byte).is_err() {
                self.overflows = self.overflows.wrapping_add(1);
                self.buf.clear();
                self.discarding = true;
            }
        }
    }

    /// Number of oversized lines dropped so far
    pub fn overflow_count(&self) -> u32 {
        self.overflows
    }

    /// Number of non-UTF-8 lines dropped so far
    pub fn bad_encoding_count(&self) -> u32 {
        self.bad_encoding
    }

    /// True while the framer is skipping the remainder of an oversized line
    pub fn is_discarding(&self) -> bool {
        self.discarding
    }
}
