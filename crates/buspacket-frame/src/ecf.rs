//! Error Control Field computation.
//!
//! The bus uses CRC-16 with the CCSDS polynomial x^16 + x^12 + x^5 + 1
//! (`0x1021`), seed `0x0000`, no reflection and no final XOR. This is the
//! parameter set the `crc` catalog names CRC-16/XMODEM.

use crc::{Crc, CRC_16_XMODEM};

/// CRC engine for the bus ECF.
pub const CRC16_BUS: Crc<u16> = Crc::<u16>::new(&CRC_16_XMODEM);

/// A 16-bit integrity check over header + payload.
pub trait ErrorControl {
    fn compute(&self, bytes: &[u8]) -> u16;
}

/// Default bus checksum.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Crc16;

impl ErrorControl for Crc16 {
    fn compute(&self, bytes: &[u8]) -> u16 {
        CRC16_BUS.checksum(bytes)
    }
}

impl<F> ErrorControl for F
where
    F: Fn(&[u8]) -> u16,
{
    fn compute(&self, bytes: &[u8]) -> u16 {
        self(bytes)
    }
}
