//! Write a few packets into an in-memory bus with line noise, then read them back.
//!
//! Run with:
//!   cargo run --example loopback

use std::io::Cursor;

use buspacket::frame::{EcfFlag, FrameReader, FrameWriter, PacketType};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut writer = FrameWriter::new(Vec::new());
    writer.send(PacketType::Tc, 40, EcfFlag::Present, &[100, 1, 12, 234, 34, 5])?;
    writer.send(PacketType::Tm, 3, EcfFlag::Present, b"battery=7.4V")?;
    writer.send(PacketType::Tm, 3, EcfFlag::Absent, b"heartbeat")?;

    // Garbage before the first sync marker is discarded by the reader.
    let mut wire = vec![0xFF, 0x00, 0x1A];
    wire.extend_from_slice(writer.get_ref());
    eprintln!("Bus carries {} bytes", wire.len());

    for packet in FrameReader::new(Cursor::new(wire)) {
        let packet = packet?;
        eprintln!(
            "{:?} apid={} ecf={:?} payload={:?}",
            packet.packet_type(),
            packet.apid(),
            packet.ecf_flag(),
            String::from_utf8_lossy(packet.payload())
        );
    }

    Ok(())
}
