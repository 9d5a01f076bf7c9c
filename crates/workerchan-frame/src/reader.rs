use std::collections::VecDeque;
use std::io::{ErrorKind, Read};

use bytes::Bytes;
use tracing::trace;
use workerchan_transport::IpcStream;

use crate::codec::{FrameConfig, FrameDecoder};
use crate::error::{FrameError, Result};

/// Reads netstring frames from any `Read` stream.
///
/// Reads in chunks of `read_chunk_size` bytes and keeps partial frames
/// between calls, so callers always get complete payloads.
pub struct FrameReader<T> {
    inner: T,
    decoder: FrameDecoder,
    chunk: Vec<u8>,
    pending: VecDeque<Bytes>,
    config: FrameConfig,
}

impl<T: Read> FrameReader<T> {
    /// Create a new frame reader with default configuration.
    pub fn new(inner: T) -> Self {
        Self::with_config(inner, FrameConfig::default())
    }

    /// Create a new frame reader with explicit configuration.
    pub fn with_config(inner: T, config: FrameConfig) -> Self {
        Self {
            inner,
            decoder: FrameDecoder::with_max_payload(config.max_payload_size),
            chunk: vec![0u8; config.read_chunk_size.max(1)],
            pending: VecDeque::new(),
            config,
        }
    }

    /// Read the next complete frame (blocking).
    ///
    /// Returns `Err(FrameError::ConnectionClosed)` when EOF is reached.
    pub fn read_frame(&mut self) -> Result<Bytes> {
        loop {
            if let Some(frame) = self.pending.pop_front() {
                return Ok(frame);
            }
            let frames = self.read_chunk()?;
            self.pending.extend(frames);
        }
    }

    /// Perform exactly one read and return the frames it completed.
    ///
    /// The result is empty when the read ended inside a frame. Frames that
    /// [`FrameReader::read_frame`] has buffered but not yet returned are not
    /// included. Returns `Err(FrameError::ConnectionClosed)` on EOF.
    pub fn read_chunk(&mut self) -> Result<Vec<Bytes>> {
        let read = loop {
            match self.inner.read(&mut self.chunk) {
                Ok(n) => break n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(FrameError::Io(err)),
            }
        };

        if read == 0 {
            return Err(FrameError::ConnectionClosed);
        }

        trace!(bytes = read, "read chunk");
        self.decoder.feed(&self.chunk[..read])
    }

    /// Bytes received but not yet delivered as a frame.
    pub fn buffered_len(&self) -> usize {
        self.decoder.buffered_len()
    }

    /// Borrow the underlying stream.
    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    /// Mutably borrow the underlying stream.
    pub fn get_mut(&mut self) -> &mut T {
        &mut self.inner
    }

    /// Consume the reader and return the inner stream.
    pub fn into_inner(self) -> T {
        self.inner
    }

    /// Current frame reader configuration.
    pub fn config(&self) -> &FrameConfig {
        &self.config
    }
}

impl FrameReader<IpcStream> {
    /// Create a frame reader for `IpcStream` and apply read timeout from config.
    pub fn with_config_ipc(inner: IpcStream, config: FrameConfig) -> Result<Self> {
        inner
            .set_read_timeout(config.read_timeout)
            .map_err(transport_to_frame_error)?;
        Ok(Self::with_config(inner, config))
    }
}

pub(crate) fn transport_to_frame_error(err: workerchan_transport::TransportError) -> FrameError {
    match err {
        workerchan_transport::TransportError::Io(io)
        | workerchan_transport::TransportError::Adopt { source: io, .. } => FrameError::Io(io),
        other => FrameError::Io(std::io::Error::other(other.to_string())),
    }
}
