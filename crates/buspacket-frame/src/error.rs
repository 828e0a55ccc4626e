use crate::status::Status;

/// Errors that can occur during packet encoding/decoding.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// The payload exceeds the bus data field.
    #[error("payload too large ({size} bytes, max {max})")]
    PayloadTooLarge { size: usize, max: usize },

    /// The APID does not fit in 7 bits.
    #[error("apid {apid} out of range (max {max})")]
    ApidOutOfRange { apid: u8, max: u8 },

    /// The declared data length is larger than the data actually supplied.
    #[error("data length {length} exceeds supplied data ({available} bytes)")]
    LengthExceedsData { length: usize, available: usize },

    /// Raw packet type value other than TM (0) or TC (1).
    #[error("invalid packet type {0} (expected 0 or 1)")]
    InvalidPacketType(u8),

    /// Raw ECF flag value other than absent (0) or present (1).
    #[error("invalid ecf flag {0} (expected 0 or 1)")]
    InvalidEcfFlag(u8),

    /// The buffer is shorter than the frame it claims to hold.
    #[error("frame truncated ({available} bytes, need {needed})")]
    Truncated { needed: usize, available: usize },

    /// The header announces a payload length larger than the bus allows.
    #[error("header length {length} out of range (max {max})")]
    LengthOutOfRange { length: usize, max: usize },

    /// The Error Control Field does not match the frame contents.
    #[error("ecf mismatch (received {received:#06x}, expected {expected:#06x})")]
    EcfMismatch { received: u16, expected: u16 },

    /// An I/O error occurred while reading or writing frames.
    #[error("frame I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The stream was closed before a complete frame was received.
    #[error("connection closed (incomplete frame)")]
    ConnectionClosed,
}

/// Coarse classification of a [`FrameError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Caller supplied an out-of-range field on encode.
    InvalidArgument,
    /// Received bytes do not form a well-shaped frame.
    Malformed,
    /// Frame is well-shaped but its ECF does not check out.
    Integrity,
    /// Stream level failure.
    Io,
}

impl FrameError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            FrameError::PayloadTooLarge { .. }
            | FrameError::ApidOutOfRange { .. }
            | FrameError::LengthExceedsData { .. }
            | FrameError::InvalidPacketType(_)
            | FrameError::InvalidEcfFlag(_) => ErrorKind::InvalidArgument,
            FrameError::Truncated { .. } | FrameError::LengthOutOfRange { .. } => {
                ErrorKind::Malformed
            }
            FrameError::EcfMismatch { .. } => ErrorKind::Integrity,
            FrameError::Io(_) | FrameError::ConnectionClosed => ErrorKind::Io,
        }
    }

    /// Numeric status reported across plain-integer call boundaries. Never zero.
    pub fn status(&self) -> Status {
        match self.kind() {
            ErrorKind::InvalidArgument => Status::InvalidArgument,
            ErrorKind::Malformed => Status::MalformedFrame,
            ErrorKind::Integrity => Status::IntegrityFailure,
            ErrorKind::Io => Status::Io,
        }
    }
}

pub type Result<T> = std::result::Result<T, FrameError>;
