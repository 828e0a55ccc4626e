use buspacket_frame::Status;

/// Errors that can occur during transfer frame encoding/decoding.
#[derive(Debug, thiserror::Error)]
pub enum UslpError {
    /// A header field does not fit its bit width.
    #[error("{field} value {value} out of range (max {max})")]
    FieldOutOfRange {
        field: &'static str,
        value: u32,
        max: u32,
    },

    /// The data field does not fit in a transfer frame.
    #[error("data too large ({size} bytes, max {max})")]
    DataTooLarge { size: usize, max: usize },

    /// The buffer is shorter than the frame it claims to hold.
    #[error("transfer frame truncated ({available} bytes, need {needed})")]
    Truncated { needed: usize, available: usize },

    /// The frame length field is impossible for the header it sits in.
    #[error("invalid frame length {length}")]
    InvalidLength { length: usize },

    /// The Error Control Field does not match the frame contents.
    #[error("ecf mismatch (received {received:#06x}, expected {expected:#06x})")]
    EcfMismatch { received: u16, expected: u16 },
}

impl UslpError {
    /// Numeric status shared with the bus codec. Never zero.
    pub fn status(&self) -> Status {
        match self {
            UslpError::FieldOutOfRange { .. } | UslpError::DataTooLarge { .. } => {
                Status::InvalidArgument
            }
            UslpError::Truncated { .. } | UslpError::InvalidLength { .. } => Status::MalformedFrame,
            UslpError::EcfMismatch { .. } => Status::IntegrityFailure,
        }
    }
}

pub type Result<T> = std::result::Result<T, UslpError>;
