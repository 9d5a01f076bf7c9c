/// Errors that can occur during frame encoding/decoding.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// The length prefix contains a byte that is not allowed there.
    #[error("invalid netstring length prefix (unexpected byte {byte:#04x})")]
    InvalidLength { byte: u8 },

    /// The byte following the payload is not the `,` terminator.
    #[error("missing netstring terminator (found byte {found:#04x})")]
    MissingTerminator { found: u8 },

    /// The payload exceeds the configured maximum size.
    #[error("payload too large ({size} bytes, max {max})")]
    PayloadTooLarge { size: usize, max: usize },

    /// An I/O error occurred while reading or writing frames.
    #[error("frame I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A write failed after part of the frame was already sent. The peer now
    /// holds an unterminated frame, so the stream can no longer be framed.
    #[error("frame write interrupted after {written} of {total} bytes: {source}")]
    PartialWrite {
        written: usize,
        total: usize,
        source: std::io::Error,
    },

    /// The connection was closed by the peer.
    #[error("connection closed")]
    ConnectionClosed,
}

impl FrameError {
    /// Whether this error means the byte stream can no longer be split into frames.
    pub fn is_framing(&self) -> bool {
        matches!(
            self,
            FrameError::InvalidLength { .. }
                | FrameError::MissingTerminator { .. }
                | FrameError::PayloadTooLarge { .. }
                | FrameError::PartialWrite { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, FrameError>;
