use std::io::{self, Write};

use bytes::BytesMut;
use tracing::trace;

use crate::codec::{EcfFlag, Packet, PacketType, BUS_SIZE};
use crate::error::{FrameError, Result};
use crate::sync::{FrameConfig, FRAME_SYNC, FRAME_SYNC_SIZE};

/// Writes bus packets to any `Write` stream, each preceded by the sync marker
/// unless `frame_sync` is off.
pub struct FrameWriter<T> {
    inner: T,
    buf: BytesMut,
    config: FrameConfig,
    written: u64,
}

impl<T: Write> FrameWriter<T> {
    pub fn new(inner: T) -> Self {
        Self::with_config(inner, FrameConfig::default())
    }

    pub fn with_config(inner: T, config: FrameConfig) -> Self {
        Self {
            inner,
            buf: BytesMut::with_capacity(FRAME_SYNC_SIZE + BUS_SIZE),
            config,
            written: 0,
        }
    }

    /// Write one packet and flush. Blocks until the stream takes every byte.
    pub fn write_packet(&mut self, packet: &Packet) -> Result<()> {
        self.buf.clear();
        self.stage(packet);
        self.drain()?;
        self.written += 1;
        self.flush()
    }

    /// Write several packets back to back with a single flush.
    pub fn write_batch<'a, I>(&mut self, packets: I) -> Result<()>
    where
        I: IntoIterator<Item = &'a Packet>,
    {
        self.buf.clear();
        let mut staged = 0u64;
        for packet in packets {
            self.stage(packet);
            staged += 1;
        }
        self.drain()?;
        self.written += staged;
        self.flush()
    }

    /// Build a packet from raw fields and write it.
    pub fn send(
        &mut self,
        packet_type: PacketType,
        apid: u8,
        ecf_flag: EcfFlag,
        payload: &[u8],
    ) -> Result<()> {
        let packet = Packet::new(packet_type, apid, ecf_flag, payload)?;
        self.write_packet(&packet)
    }

    pub fn flush(&mut self) -> Result<()> {
        loop {
            match self.inner.flush() {
                Ok(()) => return Ok(()),
                Err(err) if retryable(&err) => continue,
                Err(err) => return Err(FrameError::Io(err)),
            }
        }
    }

    /// Packets fully handed to the stream since creation.
    pub fn packets_written(&self) -> u64 {
        self.written
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

    fn stage(&mut self, packet: &Packet) {
        if self.config.frame_sync {
            self.buf.extend_from_slice(&FRAME_SYNC);
        }
        packet.packetize(&mut self.buf);
        trace!(apid = packet.apid(), length = packet.length(), "packet staged");
    }

    fn drain(&mut self) -> Result<()> {
        let mut sent = 0usize;
        while sent < self.buf.len() {
            match self.inner.write(&self.buf[sent..]) {
                Ok(0) => return Err(FrameError::ConnectionClosed),
                Ok(n) => sent += n,
                Err(err) if retryable(&err) => continue,
                Err(err) => return Err(FrameError::Io(err)),
            }
        }
        Ok(())
    }
}

fn retryable(err: &io::Error) -> bool {
    matches!(
        err.kind(),
        io::ErrorKind::Interrupted | io::ErrorKind::WouldBlock
    )
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;

    use super::*;
    use crate::codec::{decode, DATA_SIZE};

    const SCENARIO: [u8; 10] = [0xA8, 0x86, 100, 1, 12, 234, 34, 5, 0x79, 0xE4];

    /// Replays scripted outcomes for `write` and `flush`, then behaves normally.
    #[derive(Default)]
    struct Scripted {
        writes: VecDeque<io::Result<usize>>,
        flushes: VecDeque<io::Result<()>>,
        /// Cap on bytes accepted per successful write.
        chunk: Option<usize>,
        data: Vec<u8>,
        flush_calls: usize,
    }

    impl Write for Scripted {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            if let Some(outcome) = self.writes.pop_front() {
                return outcome;
            }
            let n = self.chunk.map_or(buf.len(), |c| c.min(buf.len()));
            self.data.extend_from_slice(&buf[..n]);
            Ok(n)
        }

        fn flush(&mut self) -> io::Result<()> {
            self.flush_calls += 1;
            self.flushes.pop_front().unwrap_or(Ok(()))
        }
    }

    #[test]
    fn writes_sync_marker_then_frame() {
        let mut writer = FrameWriter::new(Vec::new());
        writer
            .send(PacketType::Tc, 40, EcfFlag::Present, &[100, 1, 12, 234, 34, 5])
            .unwrap();

        let wire = writer.into_inner();
        assert_eq!(&wire[..FRAME_SYNC_SIZE], &FRAME_SYNC);
        assert_eq!(&wire[FRAME_SYNC_SIZE..], &SCENARIO);
    }

    #[test]
    fn unsynced_output_is_the_bare_frame() {
        let config = FrameConfig {
            frame_sync: false,
            ..FrameConfig::default()
        };
        let mut writer = FrameWriter::with_config(Vec::new(), config);
        writer.send(PacketType::Tm, 3, EcfFlag::Absent, b"abc").unwrap();

        let wire = writer.into_inner();
        assert_eq!(wire.len(), 7);
        assert_eq!(decode(&wire).unwrap().payload(), b"abc");
    }

    #[test]
    fn batch_is_flushed_once() {
        let packets = [
            Packet::new(PacketType::Tm, 1, EcfFlag::Present, b"one").unwrap(),
            Packet::new(PacketType::Tm, 2, EcfFlag::Present, b"two").unwrap(),
        ];
        let mut writer = FrameWriter::new(Scripted::default());
        writer.write_batch(&packets).unwrap();

        assert_eq!(writer.packets_written(), 2);
        let sink = writer.into_inner();
        assert_eq!(sink.flush_calls, 1);
        assert_eq!(sink.data.len(), 2 * (FRAME_SYNC_SIZE + 4 + 3));

        let second = &sink.data[FRAME_SYNC_SIZE + 7 + FRAME_SYNC_SIZE..];
        assert_eq!(decode(second).unwrap(), packets[1]);
    }

    #[test]
    fn oversized_payload_writes_nothing() {
        let mut writer = FrameWriter::new(Vec::new());
        let err = writer
            .send(PacketType::Tm, 1, EcfFlag::Present, &[0u8; DATA_SIZE + 1])
            .unwrap_err();

        assert!(matches!(err, FrameError::PayloadTooLarge { .. }));
        assert_eq!(writer.packets_written(), 0);
        assert!(writer.get_ref().is_empty());
    }

    #[test]
    fn retries_interrupted_and_would_block() {
        let sink = Scripted {
            writes: VecDeque::from([
                Err(io::ErrorKind::Interrupted.into()),
                Err(io::ErrorKind::WouldBlock.into()),
            ]),
            flushes: VecDeque::from([Err(io::ErrorKind::Interrupted.into())]),
            chunk: Some(3),
            ..Scripted::default()
        };
        let mut writer = FrameWriter::new(sink);
        writer.send(PacketType::Tc, 5, EcfFlag::Present, b"retry").unwrap();

        let sink = writer.into_inner();
        assert_eq!(sink.data.len(), FRAME_SYNC_SIZE + 4 + 5);
        assert_eq!(sink.flush_calls, 2);
    }

    #[test]
    fn zero_length_write_is_connection_closed() {
        let sink = Scripted {
            writes: VecDeque::from([Ok(0)]),
            ..Scripted::default()
        };
        let mut writer = FrameWriter::new(sink);
        let err = writer.send(PacketType::Tm, 1, EcfFlag::Absent, b"x").unwrap_err();
        assert!(matches!(err, FrameError::ConnectionClosed));
    }

    #[test]
    fn hard_io_error_propagates() {
        let sink = Scripted {
            writes: VecDeque::from([Err(io::ErrorKind::BrokenPipe.into())]),
            ..Scripted::default()
        };
        let mut writer = FrameWriter::new(sink);
        let err = writer.send(PacketType::Tm, 1, EcfFlag::Absent, b"x").unwrap_err();
        assert!(matches!(err, FrameError::Io(e) if e.kind() == io::ErrorKind::BrokenPipe));
    }

    #[test]
    fn failed_write_is_not_counted() {
        let packets = [
            Packet::new(PacketType::Tm, 1, EcfFlag::Present, b"one").unwrap(),
            Packet::new(PacketType::Tm, 2, EcfFlag::Present, b"two").unwrap(),
        ];
        let sink = Scripted {
            writes: VecDeque::from([
                Err(io::ErrorKind::BrokenPipe.into()),
                Err(io::ErrorKind::BrokenPipe.into()),
            ]),
            ..Scripted::default()
        };
        let mut writer = FrameWriter::new(sink);

        assert!(writer.write_packet(&packets[0]).is_err());
        assert!(writer.write_batch(&packets).is_err());
        assert_eq!(writer.packets_written(), 0);

        writer.write_batch(&packets).unwrap();
        assert_eq!(writer.packets_written(), 2);
    }
}
