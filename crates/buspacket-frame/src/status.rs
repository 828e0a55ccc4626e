//! Numeric status codes.
//!
//! `0` is the only success value. Callers that only care about
//! success/failure can compare against zero; the non-zero values tell a
//! malformed frame (discard) apart from an integrity failure (ask for resend).

use crate::error::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Status {
    Ok = 0,
    InvalidArgument = 1,
    MalformedFrame = 2,
    IntegrityFailure = 3,
    Io = 4,
}

impl Status {
    pub fn code(self) -> u8 {
        self as u8
    }

    pub fn is_ok(self) -> bool {
        self == Status::Ok
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Status::Ok => "ok",
            Status::InvalidArgument => "invalid-argument",
            Status::MalformedFrame => "malformed-frame",
            Status::IntegrityFailure => "integrity-failure",
            Status::Io => "io",
        }
    }
}

impl From<Status> for u8 {
    fn from(status: Status) -> Self {
        status.code()
    }
}

/// Status code of a codec result.
pub fn status_of<T>(result: &Result<T>) -> u8 {
    match result {
        Ok(_) => Status::Ok.code(),
        Err(err) => err.status().code(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FrameError;

    #[test]
    fn ok_is_zero() {
        assert_eq!(status_of(&Ok(())), 0);
        assert!(Status::Ok.is_ok());
    }

    #[test]
    fn failures_are_distinct_and_non_zero() {
        let invalid: Result<()> = Err(FrameError::PayloadTooLarge { size: 124, max: 123 });
        let malformed: Result<()> = Err(FrameError::Truncated {
            needed: 4,
            available: 1,
        });
        let integrity: Result<()> = Err(FrameError::EcfMismatch {
            received: 1,
            expected: 2,
        });

        let codes = [
            status_of(&invalid),
            status_of(&malformed),
            status_of(&integrity),
        ];
        assert_eq!(codes, [1, 2, 3]);
    }

    #[test]
    fn connection_closed_maps_to_io() {
        assert_eq!(FrameError::ConnectionClosed.status(), Status::Io);
        assert_eq!(Status::Io.as_str(), "io");
    }
}
