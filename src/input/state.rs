//! Per-descriptor stream state

use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::os::unix::io::RawFd;
use std::rc::Rc;

use super::raw_mode::RawModeState;

/// Everything the decoder remembers about one input descriptor
///
/// Lives as long as the registry that created it. Raw-mode restoration is
/// reference counted, so dropping a state never touches the terminal.
pub struct StreamState {
    pub(super) fd: RawFd,
    /// Bytes read from the descriptor but not yet decoded
    pub(super) inbuf: VecDeque<u8>,
    /// Accumulated bytes awaiting disambiguation
    pub(super) sequence: Vec<u8>,
    /// The next byte is a raw doorway scan code
    pub(super) doorway: bool,
    /// A NUL arrived mid-sequence; doorway starts once the sequence drains
    pub(super) doorway_pending: bool,
    pub(super) extended_keys: bool,
    pub(super) eof: bool,
    pub(super) raw: RawModeState,
}

impl StreamState {
    /// Create fresh state for a descriptor
    pub fn new(fd: RawFd) -> Self {
        Self {
            fd,
            inbuf: VecDeque::with_capacity(1024),
            sequence: Vec::with_capacity(super::SEQUENCE_BUFFER_SIZE),
            doorway: false,
            doorway_pending: false,
            extended_keys: false,
            eof: false,
            raw: RawModeState::default(),
        }
    }

    /// The descriptor this state belongs to
    pub fn fd(&self) -> RawFd {
        self.fd
    }

    /// Bytes held back while a sequence is being disambiguated
    pub fn pending_bytes(&self) -> &[u8] {
        &self.sequence
    }

    /// Whether the longer function/paging key sequences are recognized
    pub fn extended_keys(&self) -> bool {
        self.extended_keys
    }

    /// Current raw-mode nesting depth
    pub fn raw_mode_depth(&self) -> u32 {
        self.raw.depth()
    }

    /// Whether a read has observed end-of-stream
    pub fn eof_seen(&self) -> bool {
        self.eof
    }

    /// Drop buffered input and any half-decoded sequence
    pub(super) fn reset_input(&mut self) {
        self.inbuf.clear();
        self.sequence.clear();
        self.doorway = false;
        self.doorway_pending = false;
    }
}

impl fmt::Debug for StreamState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StreamState")
            .field("fd", &self.fd)
            .field("buffered", &self.inbuf.len())
            .field("sequence", &self.sequence)
            .field("doorway", &self.doorway)
            .field("doorway_pending", &self.doorway_pending)
            .field("extended_keys", &self.extended_keys)
            .field("raw_mode_depth", &self.raw.depth())
            .finish()
    }
}

/// Registry of stream state, keyed by descriptor
///
/// Owned by the session. Fetching the same descriptor twice returns the
/// same shared state.
#[derive(Debug, Default)]
pub struct StreamRegistry {
    streams: HashMap<RawFd, Rc<RefCell<StreamState>>>,
}

impl StreamRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Shared state for `fd`, created on first use
    pub fn stream(&mut self, fd: RawFd) -> Rc<RefCell<StreamState>> {
        Rc::clone(
            self.streams
                .entry(fd)
                .or_insert_with(|| Rc::new(RefCell::new(StreamState::new(fd)))),
        )
    }

    /// State for `fd` if it has been created
    pub fn get(&self, fd: RawFd) -> Option<Rc<RefCell<StreamState>>> {
        self.streams.get(&fd).cloned()
    }

    pub fn len(&self) -> usize {
        self.streams.len()
    }

    pub fn is_empty(&self) -> bool {
        self.streams.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_is_idempotent() {
        let mut registry = StreamRegistry::new();
        assert!(registry.is_empty());

        let a = registry.stream(5);
        let b = registry.stream(5);
        assert!(Rc::ptr_eq(&a, &b));
        assert_eq!(registry.len(), 1);

        let c = registry.stream(6);
        assert!(!Rc::ptr_eq(&a, &c));
        assert_eq!(registry.len(), 2);
        assert_eq!(c.borrow().fd(), 6);
    }

    #[test]
    fn test_get_does_not_create() {
        let mut registry = StreamRegistry::new();
        assert!(registry.get(3).is_none());
        registry.stream(3);
        assert!(registry.get(3).is_some());
    }

    #[test]
    fn test_new_state_is_idle() {
        let st = StreamState::new(0);
        assert!(st.pending_bytes().is_empty());
        assert!(!st.extended_keys());
        assert_eq!(st.raw_mode_depth(), 0);
        assert!(!st.eof_seen());
    }
}
