use std::io::{IsTerminal, Write};

use buspacket_frame::{EcfFlag, Packet, PacketType};
use buspacket_uslp::{Direction, FrameControl, PrimaryHeader, TransferFrame};
use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use serde::Serialize;

#[derive(Clone, Debug, Copy, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
    Raw,
    Hex,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Table
        } else {
            Self::Json
        }
    }
}

#[derive(Serialize)]
struct PacketOutput {
    packet_type: PacketType,
    apid: u8,
    ecf_flag: EcfFlag,
    length: u8,
    ecf: String,
    payload: String,
}

impl PacketOutput {
    fn new(packet: &Packet) -> Self {
        Self {
            packet_type: packet.packet_type(),
            apid: packet.apid(),
            ecf_flag: packet.ecf_flag(),
            length: packet.length(),
            ecf: format!("{:#06x}", packet.ecf()),
            payload: hex::encode(packet.payload()),
        }
    }
}

#[derive(Serialize)]
struct WireOutput {
    size: usize,
    frame: String,
}

#[derive(Serialize)]
struct TransferFrameOutput<'a> {
    header: &'a PrimaryHeader,
    truncated: bool,
    control: Option<&'a FrameControl>,
    construction_rule: u8,
    protocol_id: u8,
    data_size: usize,
    data: String,
}

pub fn print_packet(packet: &Packet, format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(&PacketOutput::new(packet)),
        OutputFormat::Table => {
            let out = PacketOutput::new(packet);
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["TYPE", "APID", "ECF", "LENGTH", "PAYLOAD"])
                .add_row(vec![
                    packet_type_name(packet.packet_type()).to_string(),
                    packet.apid().to_string(),
                    ecf_label(packet),
                    packet.length().to_string(),
                    out.payload,
                ]);
            println!("{table}");
        }
        OutputFormat::Pretty => {
            println!(
                "type={} apid={} ecf={} length={} payload={}",
                packet_type_name(packet.packet_type()),
                packet.apid(),
                ecf_label(packet),
                packet.length(),
                hex::encode(packet.payload())
            );
        }
        OutputFormat::Raw => print_raw(packet.payload()),
        OutputFormat::Hex => println!("{}", hex::encode(packet.payload())),
    }
}

/// Print an encoded frame.
pub fn print_wire(frame: &[u8], format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(&WireOutput {
            size: frame.len(),
            frame: hex::encode(frame),
        }),
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["SIZE", "FRAME"])
                .add_row(vec![frame.len().to_string(), hex::encode(frame)]);
            println!("{table}");
        }
        OutputFormat::Pretty => println!("size={} frame={}", frame.len(), spaced_hex(frame)),
        OutputFormat::Raw => print_raw(frame),
        OutputFormat::Hex => println!("{}", hex::encode(frame)),
    }
}

pub fn print_transfer_frame(frame: &TransferFrame, format: OutputFormat) {
    let h = &frame.header;
    match format {
        OutputFormat::Json => print_json(&TransferFrameOutput {
            header: h,
            truncated: frame.is_truncated(),
            control: frame.control.as_ref(),
            construction_rule: frame.construction_rule,
            protocol_id: frame.protocol_id,
            data_size: frame.data.len(),
            data: hex::encode(&frame.data),
        }),
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["SCID", "DIR", "VCID", "MAP", "HEADER", "SIZE", "DATA"])
                .add_row(vec![
                    format!("{:#06x}", h.scid),
                    direction_name(h.direction).to_string(),
                    h.vcid.to_string(),
                    h.map_id.to_string(),
                    header_label(frame).to_string(),
                    frame.data.len().to_string(),
                    hex::encode(&frame.data),
                ]);
            println!("{table}");
        }
        OutputFormat::Pretty => {
            println!(
                "tfvn={} scid={:#06x} dir={} vcid={} map={} header={} rule={} protocol={} data={}",
                h.tfvn,
                h.scid,
                direction_name(h.direction),
                h.vcid,
                h.map_id,
                header_label(frame),
                frame.construction_rule,
                frame.protocol_id,
                hex::encode(&frame.data)
            );
        }
        OutputFormat::Raw => print_raw(&frame.data),
        OutputFormat::Hex => println!("{}", hex::encode(&frame.data)),
    }
}

pub fn print_raw(data: &[u8]) {
    let mut out = std::io::stdout();
    let _ = out.write_all(data);
    let _ = out.flush();
}

fn print_json<T: Serialize>(value: &T) {
    println!(
        "{}",
        serde_json::to_string(value).unwrap_or_else(|_| "{}".to_string())
    );
}

pub fn packet_type_name(packet_type: PacketType) -> &'static str {
    match packet_type {
        PacketType::Tm => "TM",
        PacketType::Tc => "TC",
    }
}

fn ecf_label(packet: &Packet) -> String {
    match packet.ecf_flag() {
        EcfFlag::Present => format!("{:#06x}", packet.ecf()),
        EcfFlag::Absent => "none".to_string(),
    }
}

fn direction_name(direction: Direction) -> &'static str {
    match direction {
        Direction::Source => "src",
        Direction::Destination => "dst",
    }
}

fn header_label(frame: &TransferFrame) -> &'static str {
    if frame.is_truncated() {
        "truncated"
    } else {
        "full"
    }
}

fn spaced_hex(data: &[u8]) -> String {
    data.iter()
        .map(|b| format!("{b:02X}"))
        .collect::<Vec<_>>()
        .join(" ")
}
