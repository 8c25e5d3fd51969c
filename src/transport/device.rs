//! Non-blocking duplex endpoints over raw device nodes.
//!
//! Both bridge endpoints are plain character devices with no framing of
//! their own, opened read-write and non-blocking, then registered with the
//! tokio reactor via [`AsyncFd`]. Reads and writes are gated on readiness
//! so the bridge loop never blocks; any pollable duplex fd works, which is
//! what the integration tests use (socketpairs instead of device nodes).

use std::fs::File;
use std::io::{self, Read, Write};
use std::os::fd::OwnedFd;
use std::os::unix::fs::OpenOptionsExt;
use std::path::Path;

use tokio::io::unix::AsyncFd;
use tokio::io::Interest;

use crate::error::{BridgeError, Result};

/// One duplex byte-stream endpoint of the bridge.
///
/// The underlying fd is closed on drop, on every exit path. For the
/// virtual-HCI device this is what unregisters the kernel controller
/// instance.
#[derive(Debug)]
pub struct Endpoint {
    fd: AsyncFd<File>,
    name: &'static str,
}

impl Endpoint {
    /// Open a device node read-write and non-blocking.
    ///
    /// Fails if the device is missing, busy, or not accessible; endpoint
    /// open failures are fatal at startup.
    pub fn open(path: impl AsRef<Path>, name: &'static str) -> Result<Self> {
        let file = std::fs::OpenOptions::new()
            .read(true)
            .write(true)
            .custom_flags(libc::O_NONBLOCK)
            .open(path)?;

        Self::from_file(file, name)
    }

    /// Wrap an already open duplex fd.
    ///
    /// The fd must be in non-blocking mode; used by tests to run the
    /// bridge over socketpairs.
    pub fn from_fd(fd: impl Into<OwnedFd>, name: &'static str) -> Result<Self> {
        Self::from_file(File::from(fd.into()), name)
    }

    fn from_file(file: File, name: &'static str) -> Result<Self> {
        let fd = AsyncFd::with_interest(file, Interest::READABLE | Interest::WRITABLE)?;
        Ok(Self { fd, name })
    }

    /// Name used in log lines ("vhci" / "chip").
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Wait for readability, then perform one non-blocking read.
    ///
    /// `EINTR` is retried; a read that would block re-awaits readiness.
    /// Returns the number of bytes read, which may be zero.
    pub async fn read_chunk(&self, buf: &mut [u8]) -> io::Result<usize> {
        loop {
            let mut guard = self.fd.readable().await?;

            match guard.try_io(|inner| {
                let mut file: &File = inner.get_ref();
                file.read(buf)
            }) {
                Ok(Ok(n)) => return Ok(n),
                Ok(Err(ref e)) if e.kind() == io::ErrorKind::Interrupted => continue,
                Ok(Err(e)) => return Err(e),
                Err(_would_block) => continue,
            }
        }
    }

    /// Wait for writability, then write one frame in a single write call.
    ///
    /// A short write is an error, not retried: forwarding half a frame
    /// would desynchronize the peer's parser.
    pub async fn write_frame(&self, frame: &[u8]) -> Result<()> {
        loop {
            let mut guard = self.fd.writable().await?;

            match guard.try_io(|inner| {
                let mut file: &File = inner.get_ref();
                file.write(frame)
            }) {
                Ok(Ok(n)) if n == frame.len() => return Ok(()),
                Ok(Ok(n)) => {
                    return Err(BridgeError::ShortWrite {
                        written: n,
                        expected: frame.len(),
                    })
                }
                Ok(Err(ref e)) if e.kind() == io::ErrorKind::Interrupted => continue,
                Ok(Err(e)) => return Err(e.into()),
                Err(_would_block) => continue,
            }
        }
    }
}
