use std::fs::File;
use std::io::{self, Read};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use buspacket_frame::{FrameConfig, FrameError, FrameReader, Packet};
use tracing::{debug, info};

use crate::cmd::ListenArgs;
use crate::exit::{frame_error, io_error, CliError, CliResult, FAILURE, SUCCESS};
use crate::output::{print_packet, OutputFormat};

/// How often the stop flag is checked while the bus is idle.
const STOP_POLL: Duration = Duration::from_millis(100);

/// Packets buffered between the reader thread and the printer.
const QUEUE_DEPTH: usize = 64;

type Source = Box<dyn Read + Send>;

pub fn run(args: ListenArgs, format: OutputFormat) -> CliResult<i32> {
    let source = open_source(&args.path)?;
    let config = FrameConfig {
        frame_sync: !args.no_sync,
        skip_invalid: args.skip_invalid,
    };
    let reader = FrameReader::with_config(source, config);

    let running = Arc::new(AtomicBool::new(true));
    install_ctrlc_handler(running.clone())?;

    info!(path = %args.path.display(), sync = !args.no_sync, "listening");

    // A blocked read() is not woken by Ctrl-C, so reading happens off the
    // main thread and the stop flag is polled here.
    let packets = spawn_reader(reader)?;
    let mut printed = 0usize;

    while running.load(Ordering::SeqCst) {
        let packet = match packets.recv_timeout(STOP_POLL) {
            Ok(Ok(packet)) => packet,
            Ok(Err(FrameError::ConnectionClosed)) | Err(RecvTimeoutError::Disconnected) => {
                debug!(printed, "stream ended");
                break;
            }
            Ok(Err(err)) => return Err(frame_error("receive failed", err)),
            Err(RecvTimeoutError::Timeout) => continue,
        };

        if !accepts(args.apid.as_deref(), &packet) {
            continue;
        }

        print_packet(&packet, format);
        printed = printed.saturating_add(1);

        if let Some(count) = args.count {
            if printed >= count {
                return Ok(SUCCESS);
            }
        }
    }

    if !running.load(Ordering::SeqCst) {
        info!(printed, "interrupted");
    }

    match args.count {
        Some(count) if running.load(Ordering::SeqCst) => Err(CliError::new(
            FAILURE,
            format!("stream ended after {printed} of {count} packets"),
        )),
        _ => Ok(SUCCESS),
    }
}

/// Read packets on a worker thread until the stream fails or closes. The
/// thread is left blocked in `read()` if the listener stops first.
fn spawn_reader(
    mut reader: FrameReader<Source>,
) -> CliResult<mpsc::Receiver<buspacket_frame::Result<Packet>>> {
    let (tx, rx) = mpsc::sync_channel(QUEUE_DEPTH);
    thread::Builder::new()
        .name("bus-reader".to_string())
        .spawn(move || loop {
            let next = reader.read_packet();
            let last = next.is_err();
            if tx.send(next).is_err() || last {
                break;
            }
        })
        .map_err(|err| io_error("failed starting reader thread", err))?;
    Ok(rx)
}

fn open_source(path: &Path) -> CliResult<Source> {
    if path.as_os_str() == "-" {
        return Ok(Box::new(io::stdin()));
    }
    let file = File::open(path)
        .map_err(|err| io_error(&format!("failed opening {}", path.display()), err))?;
    Ok(Box::new(file))
}

fn accepts(filter: Option<&[u8]>, packet: &Packet) -> bool {
    filter.is_none_or(|apids| apids.contains(&packet.apid()))
}

fn install_ctrlc_handler(running: Arc<AtomicBool>) -> CliResult<()> {
    ctrlc::set_handler(move || {
        running.store(false, Ordering::SeqCst);
    })
    .map_err(|err| {
        CliError::new(
            crate::exit::INTERNAL,
            format!("signal handler setup failed: {err}"),
        )
    })
}
