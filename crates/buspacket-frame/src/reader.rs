use std::io::{self, Read};

use bytes::BytesMut;
use tracing::warn;

use crate::codec::{Packet, BUS_SIZE};
use crate::error::{FrameError, Result};
use crate::sync::{decode_stream, FrameConfig, FRAME_SYNC_SIZE};

/// One synced frame at the largest bus size.
const READ_CHUNK_SIZE: usize = BUS_SIZE + FRAME_SYNC_SIZE;

/// Reads validated bus packets from any `Read` stream (serial port, pipe,
/// capture file).
///
/// Short reads and line noise between frames are absorbed; callers only see
/// whole packets or an error.
pub struct FrameReader<T> {
    inner: T,
    buf: BytesMut,
    config: FrameConfig,
    skipped: u64,
}

impl<T: Read> FrameReader<T> {
    pub fn new(inner: T) -> Self {
        Self::with_config(inner, FrameConfig::default())
    }

    pub fn with_config(inner: T, config: FrameConfig) -> Self {
        Self {
            inner,
            buf: BytesMut::with_capacity(4 * READ_CHUNK_SIZE),
            config,
            skipped: 0,
        }
    }

    /// Block until the next valid packet arrives.
    ///
    /// EOF yields [`FrameError::ConnectionClosed`], whether it lands between
    /// frames or inside one. With `skip_invalid`, malformed and corrupt frames
    /// are logged and dropped.
    pub fn read_packet(&mut self) -> Result<Packet> {
        loop {
            match decode_stream(&mut self.buf, &self.config) {
                Ok(Some(packet)) => return Ok(packet),
                Ok(None) => self.fill()?,
                Err(err) if self.config.skip_invalid => {
                    self.skipped += 1;
                    warn!(error = %err, status = err.status().code(), "dropping invalid frame");
                }
                Err(err) => return Err(err),
            }
        }
    }

    /// Frames dropped under `skip_invalid`.
    pub fn skipped(&self) -> u64 {
        self.skipped
    }

    /// Bytes received but not yet consumed as a packet.
    pub fn buffered(&self) -> &[u8] {
        &self.buf
    }

    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    pub fn get_mut(&mut self) -> &mut T {
        &mut self.inner
    }

    pub fn into_inner(self) -> T {
        self.inner
    }

    pub fn config(&self) -> &FrameConfig {
        &self.config
    }

    fn fill(&mut self) -> Result<()> {
        let mut chunk = [0u8; READ_CHUNK_SIZE];
        loop {
            match self.inner.read(&mut chunk) {
                Ok(0) => return Err(FrameError::ConnectionClosed),
                Ok(n) => {
                    self.buf.extend_from_slice(&chunk[..n]);
                    return Ok(());
                }
                Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
                Err(err) => return Err(FrameError::Io(err)),
            }
        }
    }
}

/// Yields packets until the stream closes.
impl<T: Read> Iterator for FrameReader<T> {
    type Item = Result<Packet>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.read_packet() {
            Err(FrameError::ConnectionClosed) => None,
            other => Some(other),
        }
    }
}
