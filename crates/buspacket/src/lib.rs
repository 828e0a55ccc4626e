//! Onboard TM/TC bus packets and ground-link transfer frames.
//!
//! A bus packet is a 2-byte header (type, APID, ECF flag, length), up to 123
//! payload bytes and a CRC-16 Error Control Field, at most 127 bytes on the
//! wire. Streams prefix each packet with a 4-byte sync marker.
//!
//! # Crate Structure
//!
//! - [`frame`]: packet codec, frame sync, blocking reader/writer and the
//!   optional `tokio_util` codec (behind `async` feature)
//! - [`uslp`]: USLP-style transfer frames for the ground link

/// Re-export bus packet types.
pub mod frame {
    pub use buspacket_frame::*;
}

/// Re-export transfer frame types.
pub mod uslp {
    pub use buspacket_uslp::*;
}
