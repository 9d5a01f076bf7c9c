use std::fs::File;
use std::io::Read;

use tracing::debug;
use workerchan_channel::classify;
use workerchan_frame::{FrameConfig, FrameError, FrameReader};

use crate::cmd::DecodeArgs;
use crate::exit::{frame_error, io_error, CliError, CliResult, DATA_INVALID, SUCCESS};
use crate::output::{print_message, OutputFormat};

pub fn run(args: DecodeArgs, format: OutputFormat) -> CliResult<i32> {
    let source: Box<dyn Read> = match &args.file {
        Some(path) => Box::new(
            File::open(path)
                .map_err(|err| io_error(&format!("failed opening {}", path.display()), err))?,
        ),
        None => Box::new(std::io::stdin().lock()),
    };

    let config = FrameConfig {
        max_payload_size: args.max_payload,
        ..FrameConfig::default()
    };
    let mut frames = FrameReader::with_config(source, config);
    let mut printed = 0usize;

    loop {
        let payload = match frames.read_frame() {
            Ok(payload) => payload,
            Err(FrameError::ConnectionClosed) => {
                let trailing = frames.buffered_len();
                if trailing > 0 {
                    return Err(CliError::new(
                        DATA_INVALID,
                        format!("truncated frame: {trailing} trailing bytes"),
                    ));
                }
                break;
            }
            Err(err) => return Err(frame_error("decode failed", err)),
        };

        print_message(&payload, &classify(&payload), format);
        printed = printed.saturating_add(1);

        if let Some(count) = args.count {
            if printed >= count.get() {
                break;
            }
        }
    }

    debug!(frames = printed, "decode finished");
    Ok(SUCCESS)
}
