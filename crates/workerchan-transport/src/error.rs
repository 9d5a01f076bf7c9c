use std::os::raw::c_int;

/// Errors that can occur while adopting or using a socket descriptor.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The descriptor does not refer to a socket.
    #[error("descriptor {fd} is not a socket")]
    NotASocket { fd: c_int },

    /// The descriptor is a socket, but not a stream socket.
    #[error("descriptor {fd} is not a stream socket (type {socket_type})")]
    NotAStreamSocket { fd: c_int, socket_type: c_int },

    /// Inspecting the descriptor failed.
    #[error("failed to adopt descriptor {fd}: {source}")]
    Adopt {
        fd: c_int,
        source: std::io::Error,
    },

    /// An I/O error occurred on the transport stream.
    #[error("transport I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, TransportError>;
