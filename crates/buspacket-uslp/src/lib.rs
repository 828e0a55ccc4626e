//! Transfer frames for the ground link.
//!
//! A simplified USLP (CCSDS 732.1) transfer frame carries bus traffic to and
//! from the ground station. Two header forms exist:
//! - truncated: 4-byte primary header, frame length implied by the buffer
//! - full: 7-byte primary header with frame length, control flags and an
//!   optional virtual channel (VC) data zone of up to 7 bytes
//!
//! Both forms carry a 1-byte data field header and end with the same CRC-16
//! Error Control Field as bus packets.

pub mod error;
pub mod frame;

pub use error::{Result, UslpError};
pub use frame::{
    Direction, FrameControl, PrimaryHeader, TransferFrame, BASE_HEADER_SIZE, DATA_HEADER_SIZE,
    DATA_MAX_SIZE, DEFAULT_CONSTRUCTION_RULE, DEFAULT_MAP_ID, DEFAULT_PROTOCOL_ID, DEFAULT_SCID,
    DEFAULT_VCID, ECF_SIZE, MAX_SIZE, TFVN, TRUNCATED_HEADER_SIZE, VC_DATA_MAX_SIZE,
};
