//! Unix domain socket transport for worker channels.
//!
//! The owning process hands the worker pre-opened socket descriptors (for
//! example fd 3 and fd 4). This crate turns such a descriptor into an
//! [`IpcStream`] after checking that it really is a stream socket.
//!
//! This is the lowest layer of workerchan. Everything else builds on top of
//! the [`IpcStream`] type provided here.

pub mod error;

#[cfg(unix)]
pub mod stream;

pub use error::{Result, TransportError};

#[cfg(unix)]
pub use stream::IpcStream;
