//! Fixed-size packet framing for an onboard TM/TC bus.
//!
//! Every packet on the bus is framed as:
//! - A 2-byte packed header (type, APID, ECF flag, payload length)
//! - Up to 123 bytes of payload
//! - A 2-byte big-endian Error Control Field (CRC-16)
//!
//! Frames never exceed [`BUS_SIZE`] bytes. On a byte stream each frame may be
//! preceded by the 4-byte [`FRAME_SYNC`] marker so receivers can lock on.

#[cfg(feature = "async")]
pub mod async_codec;
pub mod codec;
pub mod ecf;
pub mod error;
pub mod reader;
pub mod status;
pub mod sync;
pub mod writer;

#[cfg(feature = "async")]
pub use async_codec::BusCodec;
pub use codec::{
    decode, decode_with, encode_packetize, encode_packetize_with, frame_size, EcfFlag, Packet,
    PacketType, BUS_SIZE, DATA_SIZE, ECF_SIZE, HEADER_SIZE, MAX_APID, MIN_FRAME_SIZE,
};
pub use ecf::{Crc16, ErrorControl, CRC16_BUS};
pub use error::{ErrorKind, FrameError, Result};
pub use reader::FrameReader;
pub use status::{status_of, Status};
pub use sync::{decode_stream, find_sync, FrameConfig, SyncState, FRAME_SYNC, FRAME_SYNC_SIZE};
pub use writer::FrameWriter;
