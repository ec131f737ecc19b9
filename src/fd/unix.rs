//! Unix descriptor stream
//!
//! Polls, reads and writes an inherited descriptor using POSIX APIs. The
//! descriptor is borrowed, never closed: it belongs to the host process.

use std::os::fd::BorrowedFd;
use std::os::unix::io::RawFd;
use std::time::Duration;

use nix::errno::Errno;
use nix::poll::{poll, PollFd, PollFlags};
use nix::unistd::{isatty, read, write};

use super::{poll_timeout_ms, ByteSource, ReadOutcome};
use crate::error::{DoorError, DoorResult};

/// A borrowed, pollable descriptor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FdStream {
    fd: RawFd,
}

impl FdStream {
    /// Wrap a descriptor number inherited from the host
    pub fn new(fd: RawFd) -> Self {
        Self { fd }
    }

    /// The raw descriptor number
    pub fn fd(&self) -> RawFd {
        self.fd
    }

    /// Whether the descriptor refers to a terminal
    pub fn is_tty(&self) -> bool {
        isatty(self.fd).unwrap_or(false)
    }

    /// Wait for the descriptor to become readable
    ///
    /// Hang-up and error conditions count as readable so that the following
    /// read can observe end-of-stream. Returns false if the timeout expired
    /// or the wait was interrupted by a signal.
    pub fn poll_read(&self, timeout: Option<Duration>) -> DoorResult<bool> {
        self.poll_for(
            PollFlags::POLLIN,
            PollFlags::POLLIN | PollFlags::POLLHUP | PollFlags::POLLERR,
            timeout,
        )
    }

    fn poll_for(
        &self,
        events: PollFlags,
        ready: PollFlags,
        timeout: Option<Duration>,
    ) -> DoorResult<bool> {
        // poll(2) skips negative descriptors, which would block forever
        if self.fd < 0 {
            return Err(DoorError::Poll {
                fd: self.fd,
                source: Errno::EBADF,
            });
        }

        // SAFETY: the host keeps the descriptor open for the life of the door
        let borrowed_fd = unsafe { BorrowedFd::borrow_raw(self.fd) };
        let mut fds = [PollFd::new(&borrowed_fd, events)];
        match poll(&mut fds, poll_timeout_ms(timeout)) {
            Ok(0) => Ok(false),
            Ok(_) => {
                let revents = fds[0].revents().unwrap_or(PollFlags::empty());
                if revents.contains(PollFlags::POLLNVAL) {
                    return Err(DoorError::Poll {
                        fd: self.fd,
                        source: Errno::EBADF,
                    });
                }
                Ok(revents.intersects(ready))
            }
            Err(Errno::EINTR) => Ok(false),
            Err(source) => Err(DoorError::Poll {
                fd: self.fd,
                source,
            }),
        }
    }

    /// Read whatever is available without waiting
    pub fn read(&self, buf: &mut [u8]) -> DoorResult<ReadOutcome> {
        match read(self.fd, buf) {
            Ok(0) => Ok(ReadOutcome::Closed),
            Ok(n) => Ok(ReadOutcome::Data(n)),
            // EAGAIN and EWOULDBLOCK are the same value on Linux
            Err(Errno::EAGAIN) | Err(Errno::EINTR) => Ok(ReadOutcome::Pending),
            Err(source) => Err(DoorError::Read {
                fd: self.fd,
                source,
            }),
        }
    }

    /// Write all of `data`, waiting for writability if the descriptor is non-blocking
    pub fn write_all(&self, mut data: &[u8]) -> DoorResult<()> {
        while !data.is_empty() {
            match write(self.fd, data) {
                Ok(0) => return Err(DoorError::WriteZero(self.fd)),
                Ok(n) => data = &data[n..],
                Err(Errno::EINTR) => {}
                Err(Errno::EAGAIN) => {
                    self.poll_for(PollFlags::POLLOUT, PollFlags::POLLOUT, None)?;
                }
                Err(source) => {
                    return Err(DoorError::Write {
                        fd: self.fd,
                        source,
                    })
                }
            }
        }
        Ok(())
    }
}

impl ByteSource for FdStream {
    fn read_timeout(
        &mut self,
        buf: &mut [u8],
        timeout: Option<Duration>,
    ) -> DoorResult<ReadOutcome> {
        if !self.poll_read(timeout)? {
            return Ok(ReadOutcome::Pending);
        }
        self.read(buf)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::os::unix::io::AsRawFd;
    use std::os::unix::net::UnixStream;

    #[test]
    fn test_read_timeout_pending() {
        let (_tx, rx) = UnixStream::pair().expect("socketpair");
        let mut stream = FdStream::new(rx.as_raw_fd());
        let mut buf = [0u8; 16];

        let outcome = stream
            .read_timeout(&mut buf, Some(Duration::from_millis(10)))
            .expect("poll");
        assert_eq!(outcome, ReadOutcome::Pending);
    }

    #[test]
    fn test_read_timeout_data() {
        let (mut tx, rx) = UnixStream::pair().expect("socketpair");
        tx.write_all(b"hello").expect("write");

        let mut stream = FdStream::new(rx.as_raw_fd());
        let mut buf = [0u8; 16];
        let outcome = stream
            .read_timeout(&mut buf, Some(Duration::from_millis(100)))
            .expect("read");
        assert_eq!(outcome, ReadOutcome::Data(5));
        assert_eq!(&buf[..5], b"hello");
    }

    #[test]
    fn test_read_timeout_closed() {
        let (tx, rx) = UnixStream::pair().expect("socketpair");
        drop(tx);

        let mut stream = FdStream::new(rx.as_raw_fd());
        let mut buf = [0u8; 16];
        let outcome = stream
            .read_timeout(&mut buf, Some(Duration::from_millis(100)))
            .expect("read");
        assert_eq!(outcome, ReadOutcome::Closed);
    }

    #[test]
    fn test_write_all() {
        let (tx, mut rx) = UnixStream::pair().expect("socketpair");
        let stream = FdStream::new(tx.as_raw_fd());
        stream.write_all(b"\x10\x02Nx\x10\x03").expect("write");

        let mut buf = [0u8; 16];
        let n = std::io::Read::read(&mut rx, &mut buf).expect("read");
        assert_eq!(&buf[..n], b"\x10\x02Nx\x10\x03");
    }

    #[test]
    fn test_invalid_descriptor_is_an_error() {
        // far above any descriptor the test process will have open
        let mut stream = FdStream::new(1 << 20);
        let mut buf = [0u8; 16];
        for _ in 0..3 {
            assert!(matches!(
                stream.read_timeout(&mut buf, None),
                Err(DoorError::Poll {
                    source: Errno::EBADF,
                    ..
                })
            ));
        }

        assert!(matches!(
            FdStream::new(-1).read_timeout(&mut buf, None),
            Err(DoorError::Poll {
                source: Errno::EBADF,
                ..
            })
        ));
    }

    #[test]
    fn test_socket_is_not_tty() {
        let (tx, _rx) = UnixStream::pair().expect("socketpair");
        assert!(!FdStream::new(tx.as_raw_fd()).is_tty());
    }
}
