use std::fs;
use std::io::Read;

use workerchan_channel::classify;
use workerchan_frame::encode;

use crate::cmd::EncodeArgs;
use crate::exit::{io_error, CliError, CliResult, DATA_INVALID, SUCCESS};
use crate::output::print_raw;

pub fn run(args: EncodeArgs) -> CliResult<i32> {
    let payload = resolve_payload(&args)?;

    if args.check {
        classify(&payload).map_err(|err| {
            CliError::new(DATA_INVALID, format!("payload is not a message: {err}"))
        })?;
    }

    print_raw(&encode(&payload));
    Ok(SUCCESS)
}

fn resolve_payload(args: &EncodeArgs) -> CliResult<Vec<u8>> {
    if let Some(data) = &args.data {
        return Ok(data.as_bytes().to_vec());
    }
    if let Some(path) = &args.file {
        return fs::read(path)
            .map_err(|err| io_error(&format!("failed reading {}", path.display()), err));
    }
    let mut payload = Vec::new();
    std::io::stdin()
        .lock()
        .read_to_end(&mut payload)
        .map_err(|err| io_error("failed reading stdin", err))?;
    Ok(payload)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn data_takes_the_literal_text() {
        let args = EncodeArgs {
            data: Some(r#"{"event":"x"}"#.to_string()),
            file: None,
            check: true,
        };
        assert_eq!(resolve_payload(&args).unwrap(), br#"{"event":"x"}"#.to_vec());
    }

    #[test]
    fn missing_file_is_usage_error() {
        let args = EncodeArgs {
            data: None,
            file: Some("/nonexistent/workerchan-payload.json".into()),
            check: false,
        };
        let err = resolve_payload(&args).unwrap_err();
        assert_eq!(err.code, crate::exit::USAGE);
    }
}
