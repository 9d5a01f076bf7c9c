use crate::cmd::VersionArgs;
use crate::exit::{CliResult, SUCCESS};

pub fn run(args: VersionArgs) -> CliResult<i32> {
    if !args.extended {
        println!("workerchan {}", env!("CARGO_PKG_VERSION"));
        return Ok(SUCCESS);
    }

    println!("name: workerchan");
    println!("version: {}", env!("CARGO_PKG_VERSION"));
    println!("target: {}", option_env!("WORKERCHAN_BUILD_TARGET").unwrap_or("unknown"));
    println!("target_os: {}", std::env::consts::OS);
    println!("target_arch: {}", std::env::consts::ARCH);
    println!("git_hash: {}", option_env!("GIT_HASH").unwrap_or("unknown"));
    println!("features: async={}, cli=true", cfg!(feature = "async"));
    println!(
        "defaults: read_chunk_size={}, max_payload_size={}",
        workerchan_channel::DEFAULT_READ_CHUNK_SIZE,
        workerchan_frame::DEFAULT_MAX_PAYLOAD
    );

    Ok(SUCCESS)
}
