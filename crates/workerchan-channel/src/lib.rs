//! Framed JSON messaging between a worker process and its controller.
//!
//! A [`Channel`] owns two inherited Unix socket descriptors, one it reads
//! from and one it writes to, and exchanges netstring-framed JSON over them.
//! Inbound frames are classified into [`Request`]s, which expect exactly one
//! response, and [`Notification`]s, which expect none.

pub mod channel;
pub mod classify;
pub mod config;
pub mod error;
pub mod message;
pub mod response;

pub use channel::{Channel, ChannelState};
pub use classify::{classify, IncomingMessage};
pub use config::{ChannelConfig, DEFAULT_READ_CHUNK_SIZE};
pub use error::{ChannelError, Direction, MessageError, Result};
pub use message::{ErrorKind, Message, Notification, Request, RequestError};
pub use response::{FailureResponse, OutgoingNotification, SuccessResponse};
