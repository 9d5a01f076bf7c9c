use std::collections::VecDeque;
use std::net::Shutdown;
use std::os::fd::{FromRawFd, OwnedFd, RawFd};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use serde_json::Value;
use tracing::{debug, warn};
use workerchan_frame::{FrameError, FrameReader, FrameWriter};
use workerchan_transport::IpcStream;

use crate::classify::{classify, IncomingMessage};
use crate::config::ChannelConfig;
use crate::error::{ChannelError, Direction, Result};
use crate::message::{Message, Notification, Request};
use crate::response::OutgoingNotification;

/// Observable connection state of a [`Channel`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelState {
    /// Descriptors held, streams not yet opened.
    Unconnected,
    /// Both streams open.
    Connected,
    /// Closed locally or after a fatal error. Terminal.
    Closed,
}

enum ConnectionState {
    Unconnected { inbound: OwnedFd, outbound: OwnedFd },
    // Clones of the two streams, kept so `close` can shut them down while
    // another thread is blocked reading.
    Connected { inbound: IpcStream, outbound: IpcStream },
    Closed,
}

struct Inbound {
    frames: FrameReader<IpcStream>,
    queued: VecDeque<Message>,
}

struct Shared {
    config: ChannelConfig,
    state: Mutex<ConnectionState>,
    inbound: Mutex<Option<Inbound>>,
    outbound: Mutex<Option<FrameWriter<IpcStream>>>,
}

/// Framed JSON channel over a pair of inherited Unix socket descriptors.
///
/// Cloning yields another handle to the same channel. One thread should own
/// [`Channel::receive`]; any number may send.
///
/// Lock order is `state`, then `inbound`, then `outbound`. Nothing takes
/// `state` while holding one of the others.
#[derive(Clone)]
pub struct Channel {
    shared: Arc<Shared>,
}

/// Non-owning channel handle held by [`Request`]s.
#[derive(Clone)]
pub(crate) struct WeakChannel(Weak<Shared>);

impl WeakChannel {
    pub(crate) fn upgrade(&self) -> Option<Channel> {
        self.0.upgrade().map(|shared| Channel { shared })
    }

    #[cfg(test)]
    pub(crate) fn detached() -> Self {
        Self(Weak::new())
    }
}

impl Channel {
    /// Create a channel over two pre-opened descriptors with default configuration.
    ///
    /// Nothing is checked until the first `send` / `receive` / `connect`.
    pub fn new(inbound: OwnedFd, outbound: OwnedFd) -> Self {
        Self::with_config(inbound, outbound, ChannelConfig::default())
    }

    /// Create a channel with explicit configuration.
    pub fn with_config(inbound: OwnedFd, outbound: OwnedFd, config: ChannelConfig) -> Self {
        Self {
            shared: Arc::new(Shared {
                config,
                state: Mutex::new(ConnectionState::Unconnected { inbound, outbound }),
                inbound: Mutex::new(None),
                outbound: Mutex::new(None),
            }),
        }
    }

    /// Create a channel from raw descriptor numbers inherited from the parent.
    ///
    /// # Safety
    ///
    /// Both descriptors must be open, distinct, and owned by nothing else in
    /// the process. The channel closes them.
    pub unsafe fn from_raw_fds(inbound: RawFd, outbound: RawFd, config: ChannelConfig) -> Self {
        // SAFETY: ownership of both descriptors is transferred by the caller contract.
        let (inbound, outbound) =
            unsafe { (OwnedFd::from_raw_fd(inbound), OwnedFd::from_raw_fd(outbound)) };
        Self::with_config(inbound, outbound, config)
    }

    /// Current connection state.
    pub fn state(&self) -> ChannelState {
        match *lock(&self.shared.state) {
            ConnectionState::Unconnected { .. } => ChannelState::Unconnected,
            ConnectionState::Connected { .. } => ChannelState::Connected,
            ConnectionState::Closed => ChannelState::Closed,
        }
    }

    /// Open both streams if not already open.
    ///
    /// If either side fails the channel is closed and the error names the
    /// failing direction. After `close` this returns [`ChannelError::Closed`].
    pub fn connect(&self) -> Result<()> {
        let mut state = lock(&self.shared.state);
        let (inbound_fd, outbound_fd) =
            match std::mem::replace(&mut *state, ConnectionState::Closed) {
                connected @ ConnectionState::Connected { .. } => {
                    *state = connected;
                    return Ok(());
                }
                ConnectionState::Closed => return Err(ChannelError::Closed),
                ConnectionState::Unconnected { inbound, outbound } => (inbound, outbound),
            };

        let frame_config = self.shared.config.frame_config();

        let (inbound, inbound_handle) = adopt(inbound_fd, Direction::Inbound).inspect_err(|err| {
            warn!(error = %err, "channel connect failed");
        })?;
        let (outbound, outbound_handle) =
            adopt(outbound_fd, Direction::Outbound).inspect_err(|err| {
                warn!(error = %err, "channel connect failed");
            })?;

        let writer = FrameWriter::with_config_ipc(outbound, frame_config.clone()).map_err(|err| {
            warn!(error = %err, "channel connect failed");
            ChannelError::from(err)
        })?;

        *lock(&self.shared.inbound) = Some(Inbound {
            frames: FrameReader::with_config(inbound, frame_config),
            queued: VecDeque::new(),
        });
        *lock(&self.shared.outbound) = Some(writer);
        *state = ConnectionState::Connected {
            inbound: inbound_handle,
            outbound: outbound_handle,
        };

        debug!("channel connected");
        Ok(())
    }

    /// Receive the next classified message.
    ///
    /// Messages left over from an earlier read are returned first, without
    /// touching the socket. Otherwise one chunk is read; `Ok(None)` means it
    /// completed no valid frame. Invalid frames are logged and skipped.
    ///
    /// Returns [`ChannelError::Closed`] when the peer has closed the inbound
    /// connection or the channel is closed. A framing or I/O error is returned
    /// once and closes the channel.
    pub fn receive(&self) -> Result<Option<Message>> {
        self.connect()?;

        let outcome = self.receive_connected();
        if matches!(outcome, Err(ChannelError::Framing(_) | ChannelError::Io(_))) {
            self.close();
        }
        outcome
    }

    fn receive_connected(&self) -> Result<Option<Message>> {
        let mut guard = lock(&self.shared.inbound);
        let inbound = guard.as_mut().ok_or(ChannelError::Closed)?;

        if let Some(message) = inbound.queued.pop_front() {
            return Ok(Some(message));
        }

        let payloads = inbound.frames.read_chunk().map_err(|err| {
            let err = ChannelError::from(err);
            match &err {
                ChannelError::Closed => debug!("channel: socket closed"),
                other => warn!(error = %other, "channel receive failed"),
            }
            err
        })?;

        for payload in payloads {
            match classify(&payload) {
                Ok(incoming) => {
                    let message = self.materialize(incoming);
                    debug!(name = message.name(), "received message");
                    inbound.queued.push_back(message);
                }
                Err(err) => {
                    warn!(error = %err, size = payload.len(), "channel: discarding frame");
                }
            }
        }

        Ok(inbound.queued.pop_front())
    }

    fn materialize(&self, incoming: IncomingMessage) -> Message {
        match incoming {
            IncomingMessage::Request {
                id,
                method,
                data,
                internal,
            } => Message::Request(Request::new(
                id,
                method,
                data,
                internal,
                self.downgrade(),
            )),
            IncomingMessage::Notification {
                event,
                data,
                internal,
            } => Message::Notification(Notification::new(event, data, internal)),
        }
    }

    /// Frame `text` and write it to the outbound socket.
    ///
    /// An oversized payload is rejected with [`ChannelError::PayloadTooLarge`]
    /// before anything is written. A write that fails partway through a frame
    /// closes the channel.
    pub fn send(&self, text: &str) -> Result<()> {
        self.connect()?;

        let outcome = {
            let mut guard = lock(&self.shared.outbound);
            let writer = guard.as_mut().ok_or(ChannelError::Closed)?;
            writer.send(text.as_bytes())
        };

        match outcome {
            Ok(()) => Ok(()),
            Err(FrameError::PayloadTooLarge { size, max }) => {
                Err(ChannelError::PayloadTooLarge { size, max })
            }
            Err(err @ FrameError::PartialWrite { .. }) => {
                warn!(error = %err, "channel: outbound frame truncated");
                self.close();
                Err(ChannelError::from(err))
            }
            Err(err) => Err(ChannelError::from(err)),
        }
    }

    /// Send `{"targetId", "event", "data"?}`, logging instead of returning failures.
    pub fn notify(&self, target_id: &str, event: &str, data: Option<Value>) {
        if let Err(err) = self.try_notify(target_id, event, data) {
            warn!(
                target_id,
                event,
                error = %err,
                "channel: notify() failed"
            );
        }
    }

    /// Send `{"targetId", "event", "data"?}`.
    pub fn try_notify(&self, target_id: &str, event: &str, data: Option<Value>) -> Result<()> {
        let body = serde_json::to_string(&OutgoingNotification {
            target_id,
            event,
            data: data.as_ref(),
        })?;
        self.send(&body)
    }

    /// Release both sockets. Safe to call more than once.
    ///
    /// A `receive` blocked in another thread returns [`ChannelError::Closed`].
    pub fn close(&self) {
        let previous = std::mem::replace(&mut *lock(&self.shared.state), ConnectionState::Closed);
        match previous {
            ConnectionState::Connected { inbound, outbound } => {
                shutdown(&inbound, Direction::Inbound);
                shutdown(&outbound, Direction::Outbound);
                debug!("channel closed");
            }
            ConnectionState::Unconnected { .. } => debug!("channel closed before connecting"),
            ConnectionState::Closed => return,
        }

        lock(&self.shared.inbound).take();
        lock(&self.shared.outbound).take();
    }

    fn downgrade(&self) -> WeakChannel {
        WeakChannel(Arc::downgrade(&self.shared))
    }
}

impl std::fmt::Debug for Channel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Channel")
            .field("state", &self.state())
            .field("config", &self.shared.config)
            .finish()
    }
}

fn adopt(fd: OwnedFd, direction: Direction) -> Result<(IpcStream, IpcStream)> {
    let connection_error = |source| ChannelError::Connection { direction, source };
    let stream = IpcStream::adopt(fd).map_err(connection_error)?;
    let handle = stream.try_clone().map_err(connection_error)?;
    Ok((stream, handle))
}

fn shutdown(stream: &IpcStream, direction: Direction) {
    if let Err(err) = stream.shutdown(Shutdown::Both) {
        debug!(%direction, error = %err, "socket shutdown failed");
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
