//! `tokio_util` codec for bus frames on async byte streams.

use bytes::BytesMut;
use tokio_util::codec::{Decoder, Encoder};
use tracing::warn;

use crate::codec::Packet;
use crate::error::{FrameError, Result};
use crate::sync::{decode_stream, FrameConfig, FRAME_SYNC};

/// Frames bus packets for `FramedRead` / `FramedWrite`.
#[derive(Debug, Clone, Default)]
pub struct BusCodec {
    config: FrameConfig,
}

impl BusCodec {
    pub fn new(config: FrameConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &FrameConfig {
        &self.config
    }
}

impl Decoder for BusCodec {
    type Item = Packet;
    type Error = FrameError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Packet>> {
        loop {
            match decode_stream(src, &self.config) {
                Err(err) if self.config.skip_invalid => {
                    warn!(error = %err, status = err.status().code(), "dropping invalid frame");
                }
                other => return other,
            }
        }
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Packet>> {
        match self.decode(src)? {
            Some(packet) => Ok(Some(packet)),
            None if src.is_empty() => Ok(None),
            None => Err(FrameError::ConnectionClosed),
        }
    }
}

impl Encoder<&Packet> for BusCodec {
    type Error = FrameError;

    fn encode(&mut self, item: &Packet, dst: &mut BytesMut) -> Result<()> {
        if self.config.frame_sync {
            dst.extend_from_slice(&FRAME_SYNC);
        }
        item.packetize(dst);
        Ok(())
    }
}

impl Encoder<Packet> for BusCodec {
    type Error = FrameError;

    fn encode(&mut self, item: Packet, dst: &mut BytesMut) -> Result<()> {
        <Self as Encoder<&Packet>>::encode(self, &item, dst)
    }
}
