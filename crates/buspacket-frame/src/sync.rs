//! Frame synchronization on a raw byte stream.
//!
//! On the physical bus every frame is preceded by the CCSDS attached sync
//! marker `1A CF FC 1D`. The receiver hunts for the marker, then uses the
//! length announced in the header to know where the frame ends.

use bytes::{Buf, BytesMut};
use tracing::debug;

use crate::codec::{decode, frame_size, Packet, MIN_FRAME_SIZE};
use crate::error::Result;

/// Size of the sync marker.
pub const FRAME_SYNC_SIZE: usize = 4;

/// Attached sync marker preceding each frame on the wire.
pub const FRAME_SYNC: [u8; FRAME_SYNC_SIZE] = [0x1A, 0xCF, 0xFC, 0x1D];

/// Byte-at-a-time sync marker detector.
///
/// Feed received bytes through [`SyncState::advance`] until
/// [`SyncState::is_complete`]; the next byte is the first header byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SyncState {
    /// Looking for the first marker byte.
    #[default]
    Find,
    Sync2,
    Sync3,
    Sync4,
    /// All four marker bytes seen.
    Completed,
}

impl SyncState {
    pub fn advance(self, byte: u8) -> SyncState {
        let matched = self.matched();
        if byte == FRAME_SYNC[matched] {
            Self::from_matched(matched + 1)
        } else if byte == FRAME_SYNC[0] {
            SyncState::Sync2
        } else {
            SyncState::Find
        }
    }

    /// Number of marker bytes matched so far; a completed state starts over.
    pub fn matched(self) -> usize {
        match self {
            SyncState::Find | SyncState::Completed => 0,
            SyncState::Sync2 => 1,
            SyncState::Sync3 => 2,
            SyncState::Sync4 => 3,
        }
    }

    pub fn is_complete(self) -> bool {
        self == SyncState::Completed
    }

    fn from_matched(matched: usize) -> SyncState {
        match matched {
            0 => SyncState::Find,
            1 => SyncState::Sync2,
            2 => SyncState::Sync3,
            3 => SyncState::Sync4,
            _ => SyncState::Completed,
        }
    }
}

/// Offset of the first complete sync marker in `buf`.
pub fn find_sync(buf: &[u8]) -> Option<usize> {
    scan(buf).0
}

// (marker offset, trailing bytes that may start a marker)
fn scan(buf: &[u8]) -> (Option<usize>, usize) {
    let mut state = SyncState::Find;
    for (i, byte) in buf.iter().enumerate() {
        state = state.advance(*byte);
        if state.is_complete() {
            return (Some(i + 1 - FRAME_SYNC_SIZE), 0);
        }
    }
    (None, state.matched())
}

/// Configuration for stream framing.
#[derive(Debug, Clone)]
pub struct FrameConfig {
    /// Frames are preceded by [`FRAME_SYNC`]. Default: true.
    pub frame_sync: bool,
    /// Log and drop frames that fail to decode instead of returning the
    /// error. Default: false.
    pub skip_invalid: bool,
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            frame_sync: true,
            skip_invalid: false,
        }
    }
}

/// Decode the next frame from a stream buffer.
///
/// Returns `Ok(None)` if the buffer doesn't contain a complete frame yet.
/// Consumed bytes are removed from `src`: noise before a sync marker, and the
/// frame itself once complete (even if it then fails its ECF check). A header
/// announcing an impossible length consumes only the marker (or one byte when
/// running without sync) so the next call can resynchronize.
pub fn decode_stream(src: &mut BytesMut, config: &FrameConfig) -> Result<Option<Packet>> {
    let preamble = if config.frame_sync {
        let (offset, partial) = scan(src);
        match offset {
            Some(0) => {}
            Some(offset) => {
                debug!(discarded = offset, "resynchronized on frame sync marker");
                src.advance(offset);
            }
            None => {
                let noise = src.len() - partial;
                if noise > 0 {
                    debug!(discarded = noise, "no frame sync marker in buffer");
                    src.advance(noise);
                }
                return Ok(None);
            }
        }
        FRAME_SYNC_SIZE
    } else {
        0
    };

    if src.len() < preamble + MIN_FRAME_SIZE {
        return Ok(None);
    }

    let total = match frame_size(&src[preamble..]) {
        Ok(total) => total,
        Err(err) => {
            src.advance(preamble.max(1));
            return Err(err);
        }
    };
    if src.len() < preamble + total {
        return Ok(None);
    }

    src.advance(preamble);
    let frame = src.split_to(total);
    decode(&frame).map(Some)
}
