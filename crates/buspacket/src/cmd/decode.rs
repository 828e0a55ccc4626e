use buspacket_frame::{decode, FRAME_SYNC};
use tracing::debug;

use crate::cmd::DecodeArgs;
use crate::exit::{frame_error, CliResult, SUCCESS};
use crate::output::{print_packet, OutputFormat};

pub fn run(args: DecodeArgs, format: OutputFormat) -> CliResult<i32> {
    let input = args.resolve()?;
    let frame = strip_sync(&input);
    if frame.len() != input.len() {
        debug!("leading sync marker skipped");
    }

    let packet = decode(frame).map_err(|err| frame_error("decode failed", err))?;
    print_packet(&packet, format);
    Ok(SUCCESS)
}

/// Accept frames copied from a synced stream.
fn strip_sync(input: &[u8]) -> &[u8] {
    input.strip_prefix(&FRAME_SYNC[..]).unwrap_or(input)
}
