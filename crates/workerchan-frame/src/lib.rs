//! Streaming netstring framing for worker IPC.
//!
//! Every message travels as a netstring:
//! - the payload length in ASCII decimal
//! - a `:` separator
//! - the raw payload bytes (no escaping)
//! - a `,` terminator
//!
//! The decoder accepts the byte stream in chunks of any size and hands back
//! whole payloads in arrival order.

#[cfg(feature = "async")]
pub mod async_codec;
pub mod codec;
pub mod error;
pub mod reader;
pub mod writer;

#[cfg(feature = "async")]
pub use async_codec::NetstringCodec;
pub use codec::{
    decode_frame, encode, encode_frame, FrameConfig, FrameDecoder, DEFAULT_MAX_PAYLOAD,
    DEFAULT_READ_CHUNK_SIZE,
};
pub use error::{FrameError, Result};
pub use reader::FrameReader;
pub use writer::FrameWriter;
