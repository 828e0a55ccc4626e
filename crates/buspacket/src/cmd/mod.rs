use clap::{Args, Subcommand, ValueEnum};
use std::fs;
use std::path::PathBuf;

use buspacket_frame::{EcfFlag, PacketType};

use crate::exit::{io_error, CliError, CliResult, USAGE};
use crate::output::OutputFormat;

pub mod decode;
pub mod encode;
pub mod listen;
pub mod uslp;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Encode a payload into a bus packet.
    Encode(EncodeArgs),
    /// Decode and validate a bus packet.
    Decode(DecodeArgs),
    /// Read a sync-delimited packet stream and print each packet.
    Listen(ListenArgs),
    /// Encode a payload into a ground-link transfer frame.
    UslpEncode(UslpEncodeArgs),
    /// Decode and validate a ground-link transfer frame.
    UslpDecode(DecodeArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Encode(args) => encode::run(args, format),
        Command::Decode(args) => decode::run(args, format),
        Command::Listen(args) => listen::run(args, format),
        Command::UslpEncode(args) => uslp::encode(args, format),
        Command::UslpDecode(args) => uslp::decode(args, format),
        Command::Version(args) => version::run(args),
    }
}

#[derive(Copy, Clone, Debug, ValueEnum)]
pub enum PacketTypeArg {
    Tm,
    Tc,
}

impl From<PacketTypeArg> for PacketType {
    fn from(value: PacketTypeArg) -> Self {
        match value {
            PacketTypeArg::Tm => PacketType::Tm,
            PacketTypeArg::Tc => PacketType::Tc,
        }
    }
}

/// Payload source shared by the encoding commands.
#[derive(Args, Debug, Default)]
pub struct PayloadArgs {
    /// Payload as a hex string.
    #[arg(long, conflicts_with_all = ["bytes", "file"])]
    pub hex: Option<String>,
    /// Payload as comma-separated byte values.
    #[arg(long, value_delimiter = ',', conflicts_with_all = ["hex", "file"])]
    pub bytes: Option<Vec<u8>>,
    /// Read payload from file.
    #[arg(long, conflicts_with_all = ["hex", "bytes"])]
    pub file: Option<PathBuf>,
}

impl PayloadArgs {
    /// Resolve the payload bytes. No source means an empty payload.
    pub fn resolve(&self) -> CliResult<Vec<u8>> {
        if let Some(text) = &self.hex {
            return parse_hex("--hex", text);
        }
        if let Some(bytes) = &self.bytes {
            return Ok(bytes.clone());
        }
        if let Some(path) = &self.file {
            return fs::read(path)
                .map_err(|err| io_error(&format!("failed reading {}", path.display()), err));
        }
        Ok(Vec::new())
    }
}

#[derive(Args, Debug)]
pub struct EncodeArgs {
    /// Packet type.
    #[arg(long = "type", value_name = "TYPE")]
    pub packet_type: PacketTypeArg,
    /// Application ID (0-127).
    #[arg(long)]
    pub apid: u8,
    /// Do not compute an ECF; the field is sent as zero.
    #[arg(long)]
    pub no_ecf: bool,
    #[command(flatten)]
    pub payload: PayloadArgs,
    /// Prefix the packet with the frame sync marker.
    #[arg(long)]
    pub sync: bool,
}

impl EncodeArgs {
    pub fn ecf_flag(&self) -> EcfFlag {
        if self.no_ecf {
            EcfFlag::Absent
        } else {
            EcfFlag::Present
        }
    }
}

#[derive(Args, Debug)]
pub struct DecodeArgs {
    /// Frame as a hex string.
    #[arg(conflicts_with = "file", required_unless_present = "file")]
    pub frame: Option<String>,
    /// Read the frame from file.
    #[arg(long)]
    pub file: Option<PathBuf>,
}

impl DecodeArgs {
    pub fn resolve(&self) -> CliResult<Vec<u8>> {
        if let Some(path) = &self.file {
            return fs::read(path)
                .map_err(|err| io_error(&format!("failed reading {}", path.display()), err));
        }
        match &self.frame {
            Some(text) => parse_hex("frame", text),
            None => Err(CliError::new(USAGE, "no frame given")),
        }
    }
}

#[derive(Args, Debug)]
pub struct ListenArgs {
    /// Stream to read (file, FIFO or serial device); `-` reads stdin.
    pub path: PathBuf,
    /// Filter to specific APIDs (comma-separated).
    #[arg(long, value_delimiter = ',')]
    pub apid: Option<Vec<u8>>,
    /// Exit after printing N packets.
    #[arg(long)]
    pub count: Option<usize>,
    /// Packets are back to back, without sync markers.
    #[arg(long)]
    pub no_sync: bool,
    /// Log and skip corrupt packets instead of stopping.
    #[arg(long)]
    pub skip_invalid: bool,
}

#[derive(Args, Debug)]
pub struct UslpEncodeArgs {
    /// Spacecraft ID.
    #[arg(long, default_value_t = buspacket_uslp::DEFAULT_SCID)]
    pub scid: u16,
    /// Virtual channel ID (0-63).
    #[arg(long, default_value_t = buspacket_uslp::DEFAULT_VCID)]
    pub vcid: u8,
    /// Multiplexer access point ID (0-15).
    #[arg(long, default_value_t = buspacket_uslp::DEFAULT_MAP_ID)]
    pub map_id: u8,
    /// SCID names the destination instead of the source.
    #[arg(long)]
    pub destination: bool,
    /// Use the 4-byte truncated header.
    #[arg(long, conflicts_with_all = ["expedited", "command", "ocf", "vc_data"])]
    pub truncated: bool,
    /// Expedited (sequence-controlled bypass) service.
    #[arg(long)]
    pub expedited: bool,
    /// Frame carries protocol control commands.
    #[arg(long)]
    pub command: bool,
    /// Flag an Operational Control Field.
    #[arg(long)]
    pub ocf: bool,
    /// Virtual channel frame data as hex (up to 7 bytes).
    #[arg(long, value_name = "HEX")]
    pub vc_data: Option<String>,
    /// TFDZ construction rule (0-7).
    #[arg(long, default_value_t = buspacket_uslp::DEFAULT_CONSTRUCTION_RULE)]
    pub construction_rule: u8,
    /// Upper layer protocol ID (0-31).
    #[arg(long, default_value_t = buspacket_uslp::DEFAULT_PROTOCOL_ID)]
    pub protocol_id: u8,
    #[command(flatten)]
    pub payload: PayloadArgs,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}

/// Parse hex, ignoring whitespace and an optional `0x` prefix.
pub fn parse_hex(what: &str, text: &str) -> CliResult<Vec<u8>> {
    let cleaned: String = text.chars().filter(|c| !c.is_whitespace()).collect();
    let cleaned = cleaned
        .strip_prefix("0x")
        .or_else(|| cleaned.strip_prefix("0X"))
        .unwrap_or(&cleaned);
    hex::decode(cleaned).map_err(|err| CliError::new(USAGE, format!("{what} is not valid hex: {err}")))
}
