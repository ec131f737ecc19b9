//! Descriptor I/O
//!
//! Both the keyboard stream and the LNWP control channel are inherited
//! descriptors that are read with readiness polling and an explicit timeout.
//! [`ByteSource`] is the seam the decoders read through, so they can be driven
//! by a real descriptor ([`FdStream`]) or by scripted input in tests.

use std::time::Duration;

use crate::error::DoorResult;

#[cfg(unix)]
mod unix;

#[cfg(unix)]
pub use unix::FdStream;

/// Result of a single bounded read attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadOutcome {
    /// `n` bytes were written into the caller's buffer
    Data(usize),
    /// Nothing arrived before the timeout expired
    Pending,
    /// The peer closed the stream (zero-length read on a ready descriptor)
    Closed,
}

/// A readable byte stream with readiness-based timeouts
pub trait ByteSource {
    /// Wait up to `timeout` for data and read what is available into `buf`.
    ///
    /// `None` blocks until data arrives or the stream closes.
    fn read_timeout(&mut self, buf: &mut [u8], timeout: Option<Duration>)
        -> DoorResult<ReadOutcome>;
}

impl<S: ByteSource + ?Sized> ByteSource for &mut S {
    fn read_timeout(
        &mut self,
        buf: &mut [u8],
        timeout: Option<Duration>,
    ) -> DoorResult<ReadOutcome> {
        (**self).read_timeout(buf, timeout)
    }
}

/// Convert an optional timeout into poll(2) milliseconds (-1 blocks forever)
pub(crate) fn poll_timeout_ms(timeout: Option<Duration>) -> i32 {
    match timeout {
        None => -1,
        Some(d) => d.as_millis().min(i32::MAX as u128) as i32,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_poll_timeout_ms() {
        assert_eq!(poll_timeout_ms(None), -1);
        assert_eq!(poll_timeout_ms(Some(Duration::ZERO)), 0);
        assert_eq!(poll_timeout_ms(Some(Duration::from_millis(250))), 250);
        assert_eq!(poll_timeout_ms(Some(Duration::from_secs(u64::MAX))), i32::MAX);
    }
}
