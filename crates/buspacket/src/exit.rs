use std::fmt;
use std::io;

use buspacket_frame::{ErrorKind, FrameError};
use buspacket_uslp::UslpError;

pub const SUCCESS: i32 = 0;
pub const FAILURE: i32 = 1;
pub const PERMISSION_DENIED: i32 = 50;
pub const DATA_INVALID: i32 = 60;
pub const USAGE: i32 = 64;
pub const INTERNAL: i32 = 125;

pub type CliResult<T> = Result<T, CliError>;

#[derive(Debug)]
pub struct CliError {
    pub code: i32,
    pub message: String,
}

impl CliError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

pub fn io_error(context: &str, err: io::Error) -> CliError {
    let code = match err.kind() {
        io::ErrorKind::PermissionDenied => PERMISSION_DENIED,
        io::ErrorKind::NotFound => USAGE,
        _ => INTERNAL,
    };
    CliError::new(code, format!("{context}: {err}"))
}

pub fn frame_error(context: &str, err: FrameError) -> CliError {
    match err {
        FrameError::Io(source) => io_error(context, source),
        FrameError::ConnectionClosed => CliError::new(FAILURE, format!("{context}: {err}")),
        other => {
            let code = match other.kind() {
                ErrorKind::InvalidArgument => USAGE,
                ErrorKind::Malformed | ErrorKind::Integrity => DATA_INVALID,
                ErrorKind::Io => INTERNAL,
            };
            CliError::new(code, format!("{context}: {other}"))
        }
    }
}

pub fn uslp_error(context: &str, err: UslpError) -> CliError {
    let code = match err {
        UslpError::FieldOutOfRange { .. } | UslpError::DataTooLarge { .. } => USAGE,
        UslpError::Truncated { .. }
        | UslpError::InvalidLength { .. }
        | UslpError::EcfMismatch { .. } => DATA_INVALID,
    };
    CliError::new(code, format!("{context}: {err}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_errors_map_to_exit_codes() {
        let err = frame_error("encode failed", FrameError::ApidOutOfRange { apid: 200, max: 127 });
        assert_eq!(err.code, USAGE);
        assert!(err.message.starts_with("encode failed: "));

        let err = frame_error(
            "decode failed",
            FrameError::EcfMismatch {
                received: 1,
                expected: 2,
            },
        );
        assert_eq!(err.code, DATA_INVALID);

        let err = frame_error("decode failed", FrameError::Truncated { needed: 4, available: 2 });
        assert_eq!(err.code, DATA_INVALID);

        assert_eq!(frame_error("read failed", FrameError::ConnectionClosed).code, FAILURE);
    }

    #[test]
    fn io_errors_map_to_exit_codes() {
        let denied = io::Error::new(io::ErrorKind::PermissionDenied, "denied");
        assert_eq!(io_error("open", denied).code, PERMISSION_DENIED);

        let missing = io::Error::new(io::ErrorKind::NotFound, "missing");
        assert_eq!(frame_error("open", FrameError::Io(missing)).code, USAGE);
    }

    #[test]
    fn uslp_errors_map_to_exit_codes() {
        let err = uslp_error(
            "encode failed",
            UslpError::DataTooLarge { size: 300, max: 249 },
        );
        assert_eq!(err.code, USAGE);

        let err = uslp_error("decode failed", UslpError::InvalidLength { length: 3 });
        assert_eq!(err.code, DATA_INVALID);
    }
}
