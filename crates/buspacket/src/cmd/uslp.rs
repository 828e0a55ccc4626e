use buspacket_uslp::{Direction, FrameControl, PrimaryHeader, TransferFrame};
use tracing::debug;

use crate::cmd::{parse_hex, DecodeArgs, UslpEncodeArgs};
use crate::exit::{uslp_error, CliResult, SUCCESS};
use crate::output::{print_transfer_frame, print_wire, OutputFormat};

pub fn encode(args: UslpEncodeArgs, format: OutputFormat) -> CliResult<i32> {
    let frame = build_frame(&args)?;
    let wire = frame
        .to_bytes()
        .map_err(|err| uslp_error("encode failed", err))?;

    debug!(scid = args.scid, vcid = args.vcid, size = wire.len(), "transfer frame encoded");
    print_wire(&wire, format);
    Ok(SUCCESS)
}

pub fn decode(args: DecodeArgs, format: OutputFormat) -> CliResult<i32> {
    let input = args.resolve()?;
    let frame = TransferFrame::decode(&input).map_err(|err| uslp_error("decode failed", err))?;
    print_transfer_frame(&frame, format);
    Ok(SUCCESS)
}

fn build_frame(args: &UslpEncodeArgs) -> CliResult<TransferFrame> {
    let header = PrimaryHeader {
        scid: args.scid,
        direction: if args.destination {
            Direction::Destination
        } else {
            Direction::Source
        },
        vcid: args.vcid,
        map_id: args.map_id,
        ..PrimaryHeader::default()
    };
    let data = args.payload.resolve()?;

    let mut frame = if args.truncated {
        TransferFrame::truncated(header, data)
    } else {
        let vc_data = match &args.vc_data {
            Some(text) => parse_hex("--vc-data", text)?,
            None => Vec::new(),
        };
        let control = FrameControl {
            expedited: args.expedited,
            protocol_command: args.command,
            ocf_present: args.ocf,
            vc_data,
        };
        TransferFrame::full(header, control, data)
    };
    frame.construction_rule = args.construction_rule;
    frame.protocol_id = args.protocol_id;
    Ok(frame)
}
