//! Control channel transport

use crate::error::DoorResult;
use crate::fd::{ByteSource, FdStream};

/// A bidirectional control descriptor
///
/// Reads go through [`ByteSource`]; outbound frames are written whole.
pub trait ControlChannel: ByteSource {
    /// Write a complete frame
    fn send(&mut self, data: &[u8]) -> DoorResult<()>;
}

impl ControlChannel for FdStream {
    fn send(&mut self, data: &[u8]) -> DoorResult<()> {
        self.write_all(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;
    use std::os::unix::io::AsRawFd;
    use std::os::unix::net::UnixStream;

    #[test]
    fn test_fd_stream_send() {
        let (ours, mut theirs) = UnixStream::pair().expect("socketpair");
        let mut channel = FdStream::new(ours.as_raw_fd());
        channel.send(b"\x10\x02Nx\x10\x03").expect("send");

        let mut buf = [0u8; 16];
        let n = theirs.read(&mut buf).expect("read");
        assert_eq!(&buf[..n], b"\x10\x02Nx\x10\x03");
    }
}
