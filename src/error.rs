//! Error types for door I/O
//!
//! Timeouts, end-of-stream and malformed protocol input are not errors here;
//! they surface as "no event" or are recovered inside the decoders. Only real
//! OS failures and caller misuse end up in [`DoorError`]. Terminal attribute
//! failures are logged by the raw-mode layer and leave the terminal as is.

/// Error type for door operations
#[derive(Debug, thiserror::Error)]
pub enum DoorError {
    #[error("Failed to poll descriptor {fd}: {source}")]
    Poll {
        fd: i32,
        #[source]
        source: nix::Error,
    },

    #[error("Failed to read from descriptor {fd}: {source}")]
    Read {
        fd: i32,
        #[source]
        source: nix::Error,
    },

    #[error("Failed to write to descriptor {fd}: {source}")]
    Write {
        fd: i32,
        #[source]
        source: nix::Error,
    },

    #[error("Descriptor {0} accepted zero bytes on write")]
    WriteZero(i32),

    #[error("Frame kind must be a single ASCII character, got {0:?}")]
    InvalidKind(char),

    #[error("Input mode must be 'raw' or 'cooked', got {0:?}")]
    InvalidInputMode(String),

    #[error("Door start requires a node and dropfile path via env vars or argv[1]/argv[2]")]
    MissingSessionArgs,

    #[error("Invalid node number: {0:?}")]
    InvalidNode(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for door operations
pub type DoorResult<T> = Result<T, DoorError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = DoorError::InvalidInputMode("sideways".to_string());
        assert_eq!(
            err.to_string(),
            "Input mode must be 'raw' or 'cooked', got \"sideways\""
        );

        let err = DoorError::Read {
            fd: 7,
            source: nix::Error::EBADF,
        };
        assert!(err.to_string().starts_with("Failed to read from descriptor 7"));
    }

    #[test]
    fn test_io_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "gone");
        let err: DoorError = io.into();
        assert!(matches!(err, DoorError::Io(_)));
    }
}
