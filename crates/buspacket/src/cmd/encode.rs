use buspacket_frame::{encode_packetize, FRAME_SYNC};
use tracing::debug;

use crate::cmd::EncodeArgs;
use crate::exit::{frame_error, CliResult, SUCCESS};
use crate::output::{print_wire, OutputFormat};

pub fn run(args: EncodeArgs, format: OutputFormat) -> CliResult<i32> {
    let payload = args.payload.resolve()?;
    let frame = encode_packetize(
        args.packet_type.into(),
        args.apid,
        args.ecf_flag(),
        &payload,
        payload.len(),
    )
    .map_err(|err| frame_error("encode failed", err))?;

    debug!(apid = args.apid, size = frame.len(), "packet encoded");

    if args.sync {
        let mut wire = Vec::with_capacity(FRAME_SYNC.len() + frame.len());
        wire.extend_from_slice(&FRAME_SYNC);
        wire.extend_from_slice(&frame);
        print_wire(&wire, format);
    } else {
        print_wire(&frame, format);
    }

    Ok(SUCCESS)
}
