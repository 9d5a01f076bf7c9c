use clap::{Args, Subcommand};
use std::num::NonZeroUsize;
use std::os::fd::RawFd;
use std::path::PathBuf;

use workerchan_channel::DEFAULT_READ_CHUNK_SIZE;
use workerchan_frame::DEFAULT_MAX_PAYLOAD;

use crate::exit::CliResult;
use crate::output::OutputFormat;

pub mod decode;
pub mod encode;
pub mod serve;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run a worker loop on inherited socket descriptors.
    Serve(ServeArgs),
    /// Write one netstring frame to stdout.
    Encode(EncodeArgs),
    /// Read netstring frames and print the classified messages.
    Decode(DecodeArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Serve(args) => serve::run(args),
        Command::Encode(args) => encode::run(args),
        Command::Decode(args) => decode::run(args, format),
        Command::Version(args) => version::run(args),
    }
}

#[derive(Args, Debug)]
pub struct ServeArgs {
    /// Descriptor the controller writes to.
    #[arg(long, value_name = "FD", default_value = "3")]
    pub inbound_fd: RawFd,
    /// Descriptor the controller reads from.
    #[arg(long, value_name = "FD", default_value = "4")]
    pub outbound_fd: RawFd,
    /// Bytes read from the inbound socket per receive.
    #[arg(long, value_name = "BYTES", default_value_t = DEFAULT_READ_CHUNK_SIZE)]
    pub chunk_size: usize,
    /// Largest accepted frame payload.
    #[arg(long, value_name = "BYTES", default_value_t = DEFAULT_MAX_PAYLOAD)]
    pub max_payload: usize,
    /// Target id for the `running` notification. Default: process id.
    #[arg(long)]
    pub target_id: Option<String>,
}

#[derive(Args, Debug)]
pub struct EncodeArgs {
    /// Payload text.
    #[arg(long, conflicts_with = "file")]
    pub data: Option<String>,
    /// Read payload from file. Without --data or --file, stdin is used.
    #[arg(long, conflicts_with = "data")]
    pub file: Option<PathBuf>,
    /// Refuse payloads that are not a request or notification.
    #[arg(long)]
    pub check: bool,
}

#[derive(Args, Debug)]
pub struct DecodeArgs {
    /// Read frames from file instead of stdin.
    #[arg(long)]
    pub file: Option<PathBuf>,
    /// Exit after printing N messages (N >= 1).
    #[arg(long)]
    pub count: Option<NonZeroUsize>,
    /// Largest accepted frame payload.
    #[arg(long, value_name = "BYTES", default_value_t = DEFAULT_MAX_PAYLOAD)]
    pub max_payload: usize,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}
