use std::fmt;
use std::io::ErrorKind as IoErrorKind;

use workerchan_frame::FrameError;
use workerchan_transport::TransportError;

/// Which of the two sockets an error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// The socket the channel reads from.
    Inbound,
    /// The socket the channel writes to.
    Outbound,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Inbound => f.write_str("inbound"),
            Direction::Outbound => f.write_str("outbound"),
        }
    }
}

/// Errors that can occur in channel operations.
#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    /// The inbound byte stream is malformed, or an outbound frame was cut
    /// short. Either closes the channel.
    #[error("framing error: {0}")]
    Framing(FrameError),

    /// An outbound payload exceeds the frame size limit. Nothing was sent and
    /// the channel stays usable.
    #[error("outbound payload too large ({size} bytes, max {max})")]
    PayloadTooLarge { size: usize, max: usize },

    /// One of the two sockets could not be established. The channel is closed.
    #[error("failed to establish {direction} connection: {source}")]
    Connection {
        direction: Direction,
        source: TransportError,
    },

    /// The peer closed the connection, or the channel was closed locally.
    #[error("channel closed")]
    Closed,

    /// An I/O error occurred on one of the sockets.
    #[error("channel I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// An outbound message could not be serialized.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ChannelError {
    /// Whether the channel is unusable after this error.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            ChannelError::Framing(_) | ChannelError::Connection { .. } | ChannelError::Closed
        )
    }
}

impl From<FrameError> for ChannelError {
    fn from(err: FrameError) -> Self {
        match err {
            FrameError::ConnectionClosed => ChannelError::Closed,
            FrameError::Io(io) if is_disconnect(io.kind()) => ChannelError::Closed,
            FrameError::Io(io) => ChannelError::Io(io),
            FrameError::PartialWrite { ref source, .. } if is_disconnect(source.kind()) => {
                ChannelError::Closed
            }
            other => ChannelError::Framing(other),
        }
    }
}

fn is_disconnect(kind: IoErrorKind) -> bool {
    matches!(
        kind,
        IoErrorKind::BrokenPipe | IoErrorKind::ConnectionReset | IoErrorKind::NotConnected
    )
}

/// Why an inbound frame was discarded.
///
/// These never tear the channel down: the frame is logged and skipped.
#[derive(Debug, thiserror::Error)]
pub enum MessageError {
    /// The payload is not valid JSON.
    #[error("invalid json: {0}")]
    Decode(#[from] serde_json::Error),

    /// The payload is JSON but not an object.
    #[error("invalid message, not a JSON object")]
    NotAnObject,

    /// A request carries `method` but no `id` to address the response to.
    #[error("invalid request, missing 'id' field")]
    MissingId,

    /// A protocol field has the wrong JSON type.
    #[error("invalid message, '{field}' must be a string")]
    FieldType { field: &'static str },

    /// Neither `method` nor `event` is present.
    #[error("invalid message, missing 'method' and 'event' fields")]
    Unrecognized,
}

impl MessageError {
    /// Whether the payload failed to parse, as opposed to parsing into the wrong shape.
    pub fn is_decode(&self) -> bool {
        matches!(self, MessageError::Decode(_))
    }
}

pub type Result<T> = std::result::Result<T, ChannelError>;
