use std::io::{Read, Write};
use std::net::Shutdown;
use std::os::fd::{AsFd, AsRawFd, BorrowedFd, FromRawFd, OwnedFd, RawFd};
use std::os::unix::net::UnixStream;
use std::time::Duration;

use tracing::debug;

use crate::error::{Result, TransportError};

/// A connected Unix stream socket adopted from an inherited descriptor.
///
/// Implements `Read + Write`. The channel layer uses one instance per
/// direction: one it only reads from, one it only writes to.
pub struct IpcStream {
    inner: UnixStream,
}

impl IpcStream {
    /// Adopt an owned descriptor.
    ///
    /// Fails with [`TransportError::NotASocket`] or
    /// [`TransportError::NotAStreamSocket`] when the descriptor is of the
    /// wrong kind. The descriptor is closed on failure.
    pub fn adopt(fd: OwnedFd) -> Result<Self> {
        let raw = fd.as_raw_fd();
        check_stream_socket(fd.as_fd())?;
        debug!(fd = raw, "adopted unix stream socket");
        Ok(Self {
            inner: UnixStream::from(fd),
        })
    }

    /// Adopt a raw descriptor number such as one inherited from the parent.
    ///
    /// # Safety
    ///
    /// `fd` must be an open descriptor that nothing else in the process owns
    /// or will close.
    pub unsafe fn adopt_raw(fd: RawFd) -> Result<Self> {
        // SAFETY: ownership of `fd` is transferred to us by the caller contract.
        let owned = unsafe { OwnedFd::from_raw_fd(fd) };
        Self::adopt(owned)
    }

    /// Shut down one or both halves of the connection.
    ///
    /// A blocked `read` on another handle to the same socket returns 0 once
    /// the read half is shut down.
    pub fn shutdown(&self, how: Shutdown) -> Result<()> {
        self.inner.shutdown(how).map_err(Into::into)
    }

    /// Set read timeout on the underlying stream.
    pub fn set_read_timeout(&self, timeout: Option<Duration>) -> Result<()> {
        self.inner.set_read_timeout(timeout).map_err(Into::into)
    }

    /// Set write timeout on the underlying stream.
    pub fn set_write_timeout(&self, timeout: Option<Duration>) -> Result<()> {
        self.inner.set_write_timeout(timeout).map_err(Into::into)
    }

    /// Try to clone this stream (creates a new file descriptor).
    pub fn try_clone(&self) -> Result<Self> {
        let cloned = self.inner.try_clone()?;
        Ok(Self { inner: cloned })
    }
}

impl From<UnixStream> for IpcStream {
    fn from(inner: UnixStream) -> Self {
        Self { inner }
    }
}

impl Read for IpcStream {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        self.inner.read(buf)
    }
}

impl Write for IpcStream {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.inner.write(buf)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.inner.flush()
    }
}

impl AsRawFd for IpcStream {
    fn as_raw_fd(&self) -> RawFd {
        self.inner.as_raw_fd()
    }
}

impl std::fmt::Debug for IpcStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IpcStream")
            .field("fd", &self.inner.as_raw_fd())
            .finish()
    }
}

fn check_stream_socket(fd: BorrowedFd<'_>) -> Result<()> {
    let raw = fd.as_raw_fd();

    let mut stat = std::mem::MaybeUninit::<libc::stat>::uninit();
    // SAFETY: `raw` is a valid open descriptor borrowed for the duration of the
    // call and `stat` points to writable memory of the right size.
    let rc = unsafe { libc::fstat(raw, stat.as_mut_ptr()) };
    if rc != 0 {
        return Err(TransportError::Adopt {
            fd: raw,
            source: std::io::Error::last_os_error(),
        });
    }
    // SAFETY: fstat returned 0, so it initialized `stat`.
    let stat = unsafe { stat.assume_init() };
    if stat.st_mode & libc::S_IFMT != libc::S_IFSOCK {
        return Err(TransportError::NotASocket { fd: raw });
    }

    let mut socket_type: libc::c_int = 0;
    let mut len = std::mem::size_of::<libc::c_int>() as libc::socklen_t;
    // SAFETY: `socket_type` and `len` are valid writable pointers for the provided
    // sizes, and `raw` is an open socket descriptor.
    let rc = unsafe {
        libc::getsockopt(
            raw,
            libc::SOL_SOCKET,
            libc::SO_TYPE,
            (&mut socket_type as *mut libc::c_int).cast::<libc::c_void>(),
            &mut len,
        )
    };
    if rc != 0 {
        return Err(TransportError::Adopt {
            fd: raw,
            source: std::io::Error::last_os_error(),
        });
    }
    if socket_type != libc::SOCK_STREAM {
        return Err(TransportError::NotAStreamSocket {
            fd: raw,
            socket_type,
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use std::os::unix::net::UnixDatagram;

    use super::*;

    #[test]
    fn adopt_stream_pair() {
        let (left, right) = UnixStream::pair().unwrap();
        let mut writer = IpcStream::adopt(OwnedFd::from(left)).unwrap();
        let mut reader = IpcStream::adopt(OwnedFd::from(right)).unwrap();

        writer.write_all(b"hello").unwrap();
        let mut buf = [0u8; 5];
        reader.read_exact(&mut buf).unwrap();
        assert_eq!(&buf, b"hello");
    }

    #[test]
    fn rejects_regular_file() {
        let file = std::fs::File::open("/dev/null").unwrap();
        let err = IpcStream::adopt(OwnedFd::from(file)).unwrap_err();
        assert!(matches!(err, TransportError::NotASocket { .. }));
    }

    #[test]
    fn rejects_datagram_socket() {
        let (left, _right) = UnixDatagram::pair().unwrap();
        let err = IpcStream::adopt(OwnedFd::from(left)).unwrap_err();
        assert!(matches!(err, TransportError::NotAStreamSocket { .. }));
    }

    #[test]
    fn adopt_raw_takes_ownership() {
        use std::os::fd::IntoRawFd;

        let (left, right) = UnixStream::pair().unwrap();
        let raw = left.into_raw_fd();
        // SAFETY: `raw` came from `into_raw_fd` and is owned by nobody else.
        let mut stream = unsafe { IpcStream::adopt_raw(raw) }.unwrap();
        assert_eq!(stream.as_raw_fd(), raw);

        stream.write_all(b"x").unwrap();
        let mut peer = right;
        let mut buf = [0u8; 1];
        peer.read_exact(&mut buf).unwrap();
        assert_eq!(&buf, b"x");
    }

    #[test]
    fn shutdown_wakes_reader_with_eof() {
        let (left, _right) = UnixStream::pair().unwrap();
        let stream = IpcStream::adopt(OwnedFd::from(left)).unwrap();
        let mut reader = stream.try_clone().unwrap();

        let handle = std::thread::spawn(move || {
            let mut buf = [0u8; 8];
            reader.read(&mut buf).unwrap()
        });

        std::thread::sleep(Duration::from_millis(20));
        stream.shutdown(Shutdown::Both).unwrap();
        assert_eq!(handle.join().unwrap(), 0);
    }

    #[test]
    fn timeouts_apply() {
        let (left, _right) = UnixStream::pair().unwrap();
        let stream = IpcStream::from(left);
        stream
            .set_read_timeout(Some(Duration::from_millis(10)))
            .unwrap();
        stream
            .set_write_timeout(Some(Duration::from_millis(10)))
            .unwrap();
        assert!(format!("{stream:?}").contains("IpcStream"));
    }
}
