//! Netstring-framed JSON messaging between a worker process and its controller.
//!
//! The controller spawns the worker with two Unix socket descriptors, one per
//! direction. The worker wraps them in a [`Channel`], receives requests and
//! notifications, and answers requests with `succeed` / `failed`.
//!
//! # Crate Structure
//!
//! - [`transport`]: Adopting inherited socket descriptors
//! - [`frame`]: Streaming netstring codec, frame reader and writer
//! - [`channel`]: Message classification, requests, notifications, the channel

/// Re-export transport types.
pub mod transport {
    pub use workerchan_transport::*;
}

/// Re-export frame types.
pub mod frame {
    pub use workerchan_frame::*;
}

/// Re-export channel types.
pub mod channel {
    pub use workerchan_channel::*;
}

pub use workerchan_channel::{
    Channel, ChannelConfig, ChannelError, Message, Notification, Request, RequestError,
};
