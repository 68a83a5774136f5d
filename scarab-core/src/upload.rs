//! Chunked image upload protocol
//!
//! The host pushes a complete image blob in hex-encoded chunks:
//!
//! ```text
//! IMG_BEGIN:<slot>:<total_size>      -> IMG_OK:BEGIN
//! IMG_DATA:<offset>:<hex bytes>      -> IMG_OK:DATA:<received>
//! IMG_END:<crc32 hex>                -> IMG_OK:COMPLETE:<slot>
//! ```
//!
//! [`UploadSession`] is the state machine; it owns the scratch buffer and
//! frees it by dropping it on every exit path (abort, any IMG_END failure,
//! a fresh IMG_BEGIN). The buffer only survives a session by being moved
//! out in a [`FinishedUpload`]. [`ImageUploadHandler`] wraps the session
//! in the wire protocol.

use alloc::vec::Vec;

use scarab_protocol::crc::Crc32;
use scarab_protocol::image::{
    decode_hex, HeaderError, ImageHeader, Slot, HEADER_SIZE, MAX_IMAGE_SIZE,
};

use crate::assets::LoadedImage;
use crate::dispatch::{CommandHandler, Context, Outcome, UiIntent};

/// IMG_BEGIN failures
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BeginError {
    /// total_size outside [header size, max image size]
    Size,
    /// Scratch buffer allocation failed
    NoMem,
}

/// IMG_DATA failures. The offending chunk is never partially consumed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DataError {
    /// No session in progress
    NoBegin,
    /// Chunk offset does not continue the stream
    Offset { expected: u32 },
    /// Odd number of hex digits
    HexLen,
    /// Chunk would run past the announced total size
    Overflow,
    /// Non-hex character in the payload
    Hex,
}

/// IMG_END failures. All of them terminate the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum EndError {
    /// No session in progress
    NoBegin,
    /// Fewer bytes received than announced
    Incomplete { received: u32 },
    /// Checksum over the received bytes disagrees with the host's
    Crc { computed: u32 },
    /// The assembled blob is not a valid image
    Header(HeaderError),
}

/// A fully received, checksum-verified, header-validated image.
///
/// Owns the blob; converting or dropping it is the one remaining free.
#[derive(Debug)]
pub struct FinishedUpload {
    pub slot: Slot,
    pub header: ImageHeader,
    pub blob: Vec<u8>,
}

struct ActiveUpload {
    slot: Slot,
    expected_size: u32,
    received: u32,
    crc: Crc32,
    buf: Vec<u8>,
}

/// Upload session state machine.
///
/// At most one upload is in flight; a new Begin silently discards the
/// previous one.
pub struct UploadSession {
    active: Option<ActiveUpload>,
}

impl UploadSession {
    pub const fn new() -> Self {
        Self { active: None }
    }

    /// Start a session for `slot`, allocating the whole scratch buffer up
    /// front so a mid-transfer allocation failure is impossible
    pub fn begin(&mut self, slot: Slot, total_size: u32) -> Result<(), BeginError> {
        let size = total_size as usize;
        if size < HEADER_SIZE || size > MAX_IMAGE_SIZE {
            return Err(BeginError::Size);
        }

        // Discard any in-flight session first
        self.active = None;

        let mut buf = Vec::new();
        buf.try_reserve_exact(size).map_err(|_| BeginError::NoMem)?;

        self.active = Some(ActiveUpload {
            slot,
            expected_size: total_size,
            received: 0,
            crc: Crc32::new(),
            buf,
        });
        Ok(())
    }

    /// Append one hex-encoded chunk at `offset`; returns total received.
    ///
    /// Chunks are strictly in-order: `offset` must equal the byte count
    /// received so far. On any error the buffer and checksum are exactly
    /// as they were before the call.
    pub fn data(&mut self, offset: u32, hex: &str) -> Result<u32, DataError> {
        let up = self.active.as_mut().ok_or(DataError::NoBegin)?;

        if offset != up.received {
            return Err(DataError::Offset {
                expected: up.received,
            });
        }

        if hex.len() % 2 != 0 {
            return Err(DataError::HexLen);
        }
        let len = hex.len() / 2;

        if up.received as usize + len > up.expected_size as usize {
            return Err(DataError::Overflow);
        }

        // Decode into the pre-reserved buffer; capacity was fixed at begin
        // so this never reallocates
        let start = up.buf.len();
        up.buf.resize(start + len, 0);
        if decode_hex(hex, &mut up.buf[start..]).is_err() {
            up.buf.truncate(start);
            return Err(DataError::Hex);
        }

        up.crc.update(&up.buf[start..]);
        up.received += len as u32;
        Ok(up.received)
    }

    /// Verify and close the session.
    ///
    /// The session ends here no matter what: on failure the scratch buffer
    /// is dropped, on success it moves into the returned value.
    pub fn end(&mut self, expected_crc: u32) -> Result<FinishedUpload, EndError> {
        let up = self.active.take().ok_or(EndError::NoBegin)?;

        if up.received != up.expected_size {
            return Err(EndError::Incomplete {
                received: up.received,
            });
        }

        let computed = up.crc.finalize();
        if computed != expected_crc {
            return Err(EndError::Crc { computed });
        }

        let header = ImageHeader::parse(&up.buf).map_err(EndError::Header)?;

        Ok(FinishedUpload {
            slot: up.slot,
            header,
            blob: up.buf,
        })
    }

    /// Drop any in-flight session; true if there was one
    pub fn abort(&mut self) -> bool {
        self.active.take().is_some()
    }

    pub fn is_receiving(&self) -> bool {
        self.active.is_some()
    }

    /// (state code, received, expected) for the status report
    pub fn progress(&self) -> (u8, u32, u32) {
        match &self.active {
            Some(up) => (1, up.received, up.expected_size),
            None => (0, 0, 0),
        }
    }
}

impl Default for UploadSession {
    fn default() -> Self {
        Self::new()
    }
}

/// Handles the `IMG_*` command family.
///
/// Keeps a size mirror of what each slot holds so IMG_STATUS can answer
/// without reaching into the render-side image table.
pub struct ImageUploadHandler {
    session: UploadSession,
    slot_sizes: [Option<u32>; Slot::COUNT],
}

impl ImageUploadHandler {
    /// `slot_sizes` seeds the status mirror from what storage held at boot
    pub fn new(slot_sizes: [Option<u32>; Slot::COUNT]) -> Self {
        Self {
            session: UploadSession::new(),
            slot_sizes,
        }
    }

    fn cmd_begin(&mut self, args: &str, ctx: &mut Context<'_>) {
        let parsed = args
            .split_once(':')
            .and_then(|(slot, size)| Some((slot.parse::<i32>().ok()?, size.parse::<u32>().ok()?)));
        let Some((slot_idx, size)) = parsed else {
            ctx.reply(format_args!("IMG_ERR:PARSE"));
            return;
        };

        let Some(slot) = u32::try_from(slot_idx).ok().and_then(Slot::from_index) else {
            ctx.reply(format_args!("IMG_ERR:SLOT"));
            return;
        };

        match self.session.begin(slot, size) {
            Ok(()) => ctx.reply(format_args!("IMG_OK:BEGIN")),
            Err(BeginError::Size) => ctx.reply(format_args!("IMG_ERR:SIZE")),
            Err(BeginError::NoMem) => ctx.reply(format_args!("IMG_ERR:NOMEM")),
        }
    }

    fn cmd_data(&mut self, args: &str, ctx: &mut Context<'_>) {
        if !self.session.is_receiving() {
            ctx.reply(format_args!("IMG_ERR:NOBEGIN"));
            return;
        }

        let parsed = args
            .split_once(':')
            .and_then(|(offset, hex)| Some((offset.parse::<u32>().ok()?, hex)));
        let Some((offset, hex)) = parsed else {
            ctx.reply(format_args!("IMG_ERR:PARSE"));
            return;
        };

        match self.session.data(offset, hex) {
            Ok(received) => ctx.reply(format_args!("IMG_OK:DATA:{received}")),
            Err(DataError::NoBegin) => ctx.reply(format_args!("IMG_ERR:NOBEGIN")),
            Err(DataError::Offset { expected }) => {
                ctx.reply(format_args!("IMG_ERR:OFFSET:{expected}"))
            }
            Err(DataError::HexLen) => ctx.reply(format_args!("IMG_ERR:HEXLEN")),
            Err(DataError::Overflow) => ctx.reply(format_args!("IMG_ERR:OVERFLOW")),
            Err(DataError::Hex) => ctx.reply(format_args!("IMG_ERR:PARSE")),
        }
    }

    fn cmd_end(&mut self, args: &str, ctx: &mut Context<'_>) {
        if !self.session.is_receiving() {
            ctx.reply(format_args!("IMG_ERR:NOBEGIN"));
            return;
        }

        let Ok(expected_crc) = u32::from_str_radix(args, 16) else {
            ctx.reply(format_args!("IMG_ERR:PARSE"));
            return;
        };

        let finished = match self.session.end(expected_crc) {
            Ok(finished) => finished,
            Err(EndError::NoBegin) => {
                ctx.reply(format_args!("IMG_ERR:NOBEGIN"));
                return;
            }
            Err(EndError::Incomplete { received }) => {
                ctx.reply(format_args!("IMG_ERR:INCOMPLETE:{received}"));
                return;
            }
            Err(EndError::Crc { computed }) => {
                ctx.reply(format_args!("IMG_ERR:CRC:{computed:08X}"));
                return;
            }
            Err(EndError::Header(_)) => {
                ctx.reply(format_args!("IMG_ERR:MAGIC"));
                return;
            }
        };

        let slot = finished.slot;
        if ctx.store.save(slot, &finished.blob).is_err() {
            ctx.reply(format_args!("IMG_ERR:SAVE"));
            return;
        }

        // Read back from storage so what the panels show is what a reboot
        // would load
        let image = match ctx.store.load(slot) {
            Ok(Some(blob)) => LoadedImage::from_blob(blob).ok(),
            _ => None,
        };
        let Some(image) = image else {
            ctx.reply(format_args!("IMG_ERR:LOAD"));
            return;
        };

        self.slot_sizes[slot.index()] = Some(image.header().data_size);
        ctx.intents.publish(UiIntent::SlotLoaded { slot, image });
        ctx.reply(format_args!("IMG_OK:COMPLETE:{}", slot.index()));
    }

    fn cmd_abort(&mut self, ctx: &mut Context<'_>) {
        self.session.abort();
        ctx.reply(format_args!("IMG_OK:ABORT"));
    }

    fn cmd_delete(&mut self, args: &str, ctx: &mut Context<'_>) {
        let Ok(slot_idx) = args.parse::<i32>() else {
            ctx.reply(format_args!("IMG_ERR:PARSE"));
            return;
        };
        let Some(slot) = u32::try_from(slot_idx).ok().and_then(Slot::from_index) else {
            ctx.reply(format_args!("IMG_ERR:SLOT"));
            return;
        };

        // Deleting a slot that was never written is fine
        let _ = ctx.store.delete(slot);
        self.slot_sizes[slot.index()] = None;
        ctx.intents.publish(UiIntent::SlotCleared(slot));
        ctx.reply(format_args!("IMG_OK:DELETE:{}", slot.index()));
    }

    fn cmd_status(&mut self, ctx: &mut Context<'_>) {
        let (state, received, expected) = self.session.progress();
        ctx.reply(format_args!(
            "IMG_STATUS:UPLOAD:{state}:{received}:{expected}"
        ));

        for slot in Slot::ALL {
            let size = self.slot_sizes[slot.index()];
            ctx.reply(format_args!(
                "IMG_STATUS:SLOT:{}:{}:{}",
                slot.index(),
                if size.is_some() { 1 } else { 0 },
                size.unwrap_or(0)
            ));
        }
    }
}

impl CommandHandler for ImageUploadHandler {
    fn handle(&mut self, line: &str, ctx: &mut Context<'_>) -> Outcome {
        if !line.starts_with("IMG_") {
            return Outcome::NotClaimed;
        }

        if let Some(args) = line.strip_prefix("IMG_BEGIN:") {
            self.cmd_begin(args, ctx);
        } else if let Some(args) = line.strip_prefix("IMG_DATA:") {
            self.cmd_data(args, ctx);
        } else if let Some(args) = line.strip_prefix("IMG_END:") {
            self.cmd_end(args, ctx);
        } else if line == "IMG_ABORT" {
            self.cmd_abort(ctx);
        } else if let Some(args) = line.strip_prefix("IMG_DELETE:") {
            self.cmd_delete(args, ctx);
        } else if line == "IMG_STATUS" {
            self.cmd_status(ctx);
        } else {
            return Outcome::NotClaimed;
        }

        Outcome::Claimed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::Harness;
    use core::fmt::Write as _;
    use scarab_protocol::crc::crc32;
    use scarab_protocol::image::{PixelFormat, IMG_HEIGHT, IMG_VERSION, IMG_WIDTH};
    use std::string::String;
    use std::vec::Vec;

    fn test_blob() -> Vec<u8> {
        let data_size = IMG_WIDTH as usize * IMG_HEIGHT as usize * 2;
        let header = ImageHeader {
            width: IMG_WIDTH,
            height: IMG_HEIGHT,
            format: PixelFormat::Rgb565,
            version: IMG_VERSION,
            data_size: data_size as u32,
        };
        let mut blob = Vec::from(header.encode());
        blob.resize(HEADER_SIZE + data_size, 0x5A);
        blob
    }

    fn hex(bytes: &[u8]) -> String {
        let mut out = String::new();
        for b in bytes {
            write!(out, "{b:02x}").unwrap();
        }
        out
    }

    fn run(handler: &mut ImageUploadHandler, h: &mut Harness, line: &str) -> Outcome {
        let mut ctx = h.ctx();
        handler.handle(line, &mut ctx)
    }

    /// Drive a complete upload through the wire protocol
    fn upload(handler: &mut ImageUploadHandler, h: &mut Harness, blob: &[u8], chunk: usize) {
        run(
            handler,
            h,
            &std::format!("IMG_BEGIN:0:{}", blob.len()),
        );
        let mut offset = 0;
        for part in blob.chunks(chunk) {
            run(
                handler,
                h,
                &std::format!("IMG_DATA:{}:{}", offset, hex(part)),
            );
            offset += part.len();
        }
        run(handler, h, &std::format!("IMG_END:{:08x}", crc32(blob)));
    }

    #[test]
    fn test_happy_path_upload() {
        let mut handler = ImageUploadHandler::new([None; Slot::COUNT]);
        let mut h = Harness::new();
        let blob = test_blob();

        upload(&mut handler, &mut h, &blob, 512);

        assert_eq!(h.responses.lines[0], "IMG_OK:BEGIN");
        assert!(h.responses.lines[1].starts_with("IMG_OK:DATA:"));
        assert_eq!(h.responses.lines.last().unwrap(), "IMG_OK:COMPLETE:0");
        assert_eq!(h.store.slots[0].as_ref().unwrap(), &blob);
        match h.intents.intents.last().unwrap() {
            UiIntent::SlotLoaded { slot, image } => {
                assert_eq!(*slot, Slot::Cpu);
                assert_eq!(image.byte_size(), blob.len());
            }
            other => panic!("unexpected intent: {other:?}"),
        }
        assert!(!handler.session.is_receiving());
    }

    #[test]
    fn test_crc_mismatch_tears_down_session() {
        let mut handler = ImageUploadHandler::new([None; Slot::COUNT]);
        let mut h = Harness::new();
        let blob = test_blob();

        run(&mut handler, &mut h, &std::format!("IMG_BEGIN:1:{}", blob.len()));
        run(
            &mut handler,
            &mut h,
            &std::format!("IMG_DATA:0:{}", hex(&blob)),
        );
        run(&mut handler, &mut h, "IMG_END:deadbeef");

        let last = h.responses.lines.last().unwrap();
        assert!(last.starts_with("IMG_ERR:CRC:"), "got {last}");
        assert!(!handler.session.is_receiving());
        assert!(h.store.slots[1].is_none());

        // Session is gone; further data is NOBEGIN
        run(&mut handler, &mut h, "IMG_DATA:0:aa");
        assert_eq!(h.responses.lines.last().unwrap(), "IMG_ERR:NOBEGIN");
    }

    #[test]
    fn test_offset_mismatch_rejected_without_consuming() {
        let mut handler = ImageUploadHandler::new([None; Slot::COUNT]);
        let mut h = Harness::new();
        let blob = test_blob();

        run(&mut handler, &mut h, &std::format!("IMG_BEGIN:0:{}", blob.len()));
        run(
            &mut handler,
            &mut h,
            &std::format!("IMG_DATA:0:{}", hex(&blob[..64])),
        );
        // Stale retransmit of the first chunk
        run(
            &mut handler,
            &mut h,
            &std::format!("IMG_DATA:0:{}", hex(&blob[..64])),
        );
        assert_eq!(h.responses.lines.last().unwrap(), "IMG_ERR:OFFSET:64");

        // Correct continuation still works
        run(
            &mut handler,
            &mut h,
            &std::format!("IMG_DATA:64:{}", hex(&blob[64..128])),
        );
        assert_eq!(h.responses.lines.last().unwrap(), "IMG_OK:DATA:128");
    }

    #[test]
    fn test_chunk_errors() {
        let mut handler = ImageUploadHandler::new([None; Slot::COUNT]);
        let mut h = Harness::new();

        run(&mut handler, &mut h, "IMG_BEGIN:0:100");
        run(&mut handler, &mut h, "IMG_DATA:0:abc");
        assert_eq!(h.responses.lines.last().unwrap(), "IMG_ERR:HEXLEN");

        run(&mut handler, &mut h, "IMG_DATA:0:zz");
        assert_eq!(h.responses.lines.last().unwrap(), "IMG_ERR:PARSE");

        let too_much = hex(&std::vec![0u8; 101]);
        run(&mut handler, &mut h, &std::format!("IMG_DATA:0:{too_much}"));
        assert_eq!(h.responses.lines.last().unwrap(), "IMG_ERR:OVERFLOW");

        // None of the failed chunks advanced the stream
        run(&mut handler, &mut h, "IMG_DATA:0:aabb");
        assert_eq!(h.responses.lines.last().unwrap(), "IMG_OK:DATA:2");
    }

    #[test]
    fn test_begin_validation() {
        let mut handler = ImageUploadHandler::new([None; Slot::COUNT]);
        let mut h = Harness::new();

        run(&mut handler, &mut h, "IMG_BEGIN:9:100");
        assert_eq!(h.responses.lines.last().unwrap(), "IMG_ERR:SLOT");

        run(&mut handler, &mut h, "IMG_BEGIN:-1:100");
        assert_eq!(h.responses.lines.last().unwrap(), "IMG_ERR:SLOT");

        run(&mut handler, &mut h, "IMG_BEGIN:0:4");
        assert_eq!(h.responses.lines.last().unwrap(), "IMG_ERR:SIZE");

        run(
            &mut handler,
            &mut h,
            &std::format!("IMG_BEGIN:0:{}", MAX_IMAGE_SIZE + 1),
        );
        assert_eq!(h.responses.lines.last().unwrap(), "IMG_ERR:SIZE");

        run(&mut handler, &mut h, "IMG_BEGIN:junk");
        assert_eq!(h.responses.lines.last().unwrap(), "IMG_ERR:PARSE");
    }

    #[test]
    fn test_abort_frees_session() {
        let mut handler = ImageUploadHandler::new([None; Slot::COUNT]);
        let mut h = Harness::new();

        run(&mut handler, &mut h, "IMG_BEGIN:2:100");
        run(&mut handler, &mut h, "IMG_DATA:0:aabbcc");
        run(&mut handler, &mut h, "IMG_ABORT");
        assert_eq!(h.responses.lines.last().unwrap(), "IMG_OK:ABORT");
        assert!(!handler.session.is_receiving());

        // Abort with nothing in flight is still OK
        run(&mut handler, &mut h, "IMG_ABORT");
        assert_eq!(h.responses.lines.last().unwrap(), "IMG_OK:ABORT");
    }

    #[test]
    fn test_restart_replaces_session() {
        let mut handler = ImageUploadHandler::new([None; Slot::COUNT]);
        let mut h = Harness::new();

        run(&mut handler, &mut h, "IMG_BEGIN:0:100");
        run(&mut handler, &mut h, "IMG_DATA:0:aabb");
        run(&mut handler, &mut h, "IMG_BEGIN:0:200");
        // Fresh session: received reset to zero
        run(&mut handler, &mut h, "IMG_DATA:0:ccdd");
        assert_eq!(h.responses.lines.last().unwrap(), "IMG_OK:DATA:2");
    }

    #[test]
    fn test_incomplete_end_terminates_session() {
        let mut handler = ImageUploadHandler::new([None; Slot::COUNT]);
        let mut h = Harness::new();

        run(&mut handler, &mut h, "IMG_BEGIN:0:100");
        run(&mut handler, &mut h, "IMG_DATA:0:aabb");
        run(&mut handler, &mut h, "IMG_END:00000000");
        assert_eq!(h.responses.lines.last().unwrap(), "IMG_ERR:INCOMPLETE:2");
        assert!(!handler.session.is_receiving());
    }

    #[test]
    fn test_bad_header_rejected_after_good_crc() {
        let mut handler = ImageUploadHandler::new([None; Slot::COUNT]);
        let mut h = Harness::new();
        let blob = std::vec![0xEEu8; 64];

        run(&mut handler, &mut h, "IMG_BEGIN:0:64");
        run(
            &mut handler,
            &mut h,
            &std::format!("IMG_DATA:0:{}", hex(&blob)),
        );
        run(
            &mut handler,
            &mut h,
            &std::format!("IMG_END:{:08x}", crc32(&blob)),
        );
        assert_eq!(h.responses.lines.last().unwrap(), "IMG_ERR:MAGIC");
        assert!(h.store.slots[0].is_none());
    }

    #[test]
    fn test_save_failure_reported() {
        let mut handler = ImageUploadHandler::new([None; Slot::COUNT]);
        let mut h = Harness::new();
        h.store.fail_saves = true;
        let blob = test_blob();

        upload(&mut handler, &mut h, &blob, 1024);
        assert_eq!(h.responses.lines.last().unwrap(), "IMG_ERR:SAVE");
        assert!(!handler.session.is_receiving());
    }

    #[test]
    fn test_delete_clears_slot() {
        let mut handler = ImageUploadHandler::new([None, Some(42), None, None]);
        let mut h = Harness::new();
        h.store.slots[1] = Some(test_blob());

        run(&mut handler, &mut h, "IMG_DELETE:1");
        assert_eq!(h.responses.lines.last().unwrap(), "IMG_OK:DELETE:1");
        assert!(h.store.slots[1].is_none());
        assert_eq!(
            h.intents.intents.last().unwrap(),
            &UiIntent::SlotCleared(Slot::Gpu)
        );

        run(&mut handler, &mut h, "IMG_DELETE:7");
        assert_eq!(h.responses.lines.last().unwrap(), "IMG_ERR:SLOT");
    }

    #[test]
    fn test_status_report() {
        let mut handler = ImageUploadHandler::new([None, Some(1234), None, None]);
        let mut h = Harness::new();

        run(&mut handler, &mut h, "IMG_BEGIN:0:100");
        run(&mut handler, &mut h, "IMG_DATA:0:aabb");
        h.responses.lines.clear();

        run(&mut handler, &mut h, "IMG_STATUS");
        assert_eq!(
            h.responses.lines,
            [
                "IMG_STATUS:UPLOAD:1:2:100",
                "IMG_STATUS:SLOT:0:0:0",
                "IMG_STATUS:SLOT:1:1:1234",
                "IMG_STATUS:SLOT:2:0:0",
                "IMG_STATUS:SLOT:3:0:0",
            ]
        );
    }

    #[test]
    fn test_unknown_img_command_not_claimed() {
        let mut handler = ImageUploadHandler::new([None; Slot::COUNT]);
        let mut h = Harness::new();
        let outcome = run(&mut handler, &mut h, "IMG_FROB:1");
        assert_eq!(outcome, Outcome::NotClaimed);
        assert!(h.responses.lines.is_empty());
    }
}
