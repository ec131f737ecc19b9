//! Keystroke decoder state machine
//!
//! States, per descriptor:
//! - Idle: nothing pending
//! - Accumulating: the pending bytes are a strict prefix of at least one
//!   table entry; more bytes are read with a short per-byte timeout
//! - Doorway: a NUL was seen, the next byte is a raw scan code
//!
//! A pending buffer that is no longer the start of any entry is resolved
//! immediately: the longest complete entry it begins with is emitted, or
//! failing that its first byte as a literal. Leftover bytes stay pending for
//! the next call.

use std::cell::RefCell;
use std::os::unix::io::RawFd;
use std::rc::Rc;
use std::time::Duration;

use tracing::trace;

use super::{
    InputEvent, Key, RawModeGuard, StreamRegistry, StreamState, DEFAULT_ESCAPE_TIMEOUT_MS,
    SEQUENCE_BUFFER_SIZE,
};
use crate::config::DoorConfig;
use crate::error::DoorResult;
use crate::fd::{ByteSource, FdStream, ReadOutcome};
use crate::keys::{
    is_sequence_prefix, longest_complete_match, unambiguous_match, KeySequence, ReadFlags,
};

/// Keyboard reader for one descriptor
pub struct RawInput<S = FdStream> {
    state: Rc<RefCell<StreamState>>,
    source: S,
    escape_timeout: Duration,
    chunk_size: usize,
}

impl RawInput<FdStream> {
    /// Open a reader on `fd`, sharing state with other readers of the same descriptor
    pub fn open(registry: &mut StreamRegistry, fd: RawFd, config: &DoorConfig) -> Self {
        let state = registry.stream(fd);
        if config.extended_keys {
            state.borrow_mut().extended_keys = true;
        }
        Self::with_source(state, FdStream::new(fd))
            .with_escape_timeout(Duration::from_millis(config.escape_timeout_ms))
            .with_chunk_size(config.read_chunk_size)
    }
}

impl<S: ByteSource> RawInput<S> {
    /// Reader over an arbitrary byte source
    pub fn with_source(state: Rc<RefCell<StreamState>>, source: S) -> Self {
        Self {
            state,
            source,
            escape_timeout: Duration::from_millis(DEFAULT_ESCAPE_TIMEOUT_MS),
            chunk_size: 1024,
        }
    }

    /// Grace period between bytes of an ambiguous sequence
    pub fn with_escape_timeout(mut self, timeout: Duration) -> Self {
        self.escape_timeout = timeout;
        self
    }

    /// Maximum bytes pulled from the source per read
    pub fn with_chunk_size(mut self, size: usize) -> Self {
        self.chunk_size = size.max(1);
        self
    }

    /// Shared stream state
    pub fn state(&self) -> &Rc<RefCell<StreamState>> {
        &self.state
    }

    pub fn set_extended_keys(&mut self, enabled: bool) {
        self.state.borrow_mut().extended_keys = enabled;
    }

    /// Enter raw mode for as long as the returned guard lives
    pub fn raw_mode(&self) -> RawModeGuard {
        RawModeGuard::acquire(&self.state)
    }

    /// Increment the raw-mode depth (applied on 0 -> 1)
    pub fn enable_raw_mode(&self) {
        let mut st = self.state.borrow_mut();
        let fd = st.fd;
        st.raw.enable(fd);
    }

    /// Decrement the raw-mode depth (restored on 1 -> 0)
    pub fn disable_raw_mode(&self) {
        let mut st = self.state.borrow_mut();
        let fd = st.fd;
        st.raw.disable(fd);
    }

    /// Decode the next keystroke
    ///
    /// `timeout` bounds the wait for the first byte; `None` blocks. Returns
    /// `Ok(None)` on timeout or end-of-stream.
    pub fn next_event(
        &mut self,
        timeout: Option<Duration>,
        flags: ReadFlags,
    ) -> DoorResult<Option<InputEvent>> {
        let mut st = self.state.borrow_mut();
        let extended = st.extended_keys;
        let mut reader = Reader {
            source: &mut self.source,
            chunk_size: self.chunk_size,
        };
        st.decode(&mut reader, timeout, self.escape_timeout, flags, extended)
    }

    /// Decode the next keystroke as a [`Key`]
    ///
    /// Control bytes such as DEL and ^E are delivered as characters here.
    pub fn get_key(&mut self, timeout: Option<Duration>) -> DoorResult<Option<Key>> {
        Ok(self.next_event(timeout, ReadFlags::RAW_CTRL)?.map(Key::from))
    }

    /// Whether input is waiting, without blocking
    pub fn key_pressed(&mut self) -> DoorResult<bool> {
        let mut st = self.state.borrow_mut();
        if !st.inbuf.is_empty() || !st.sequence.is_empty() || st.doorway || st.doorway_pending {
            return Ok(true);
        }
        let mut reader = Reader {
            source: &mut self.source,
            chunk_size: self.chunk_size,
        };
        reader.fill(&mut st, Some(Duration::ZERO))
    }

    /// Discard buffered input, pending sequences and anything readable right now
    pub fn clear_keybuffer(&mut self) -> DoorResult<()> {
        let mut st = self.state.borrow_mut();
        st.reset_input();
        let mut reader = Reader {
            source: &mut self.source,
            chunk_size: self.chunk_size,
        };
        while reader.fill(&mut st, Some(Duration::ZERO))? {
            st.inbuf.clear();
        }
        Ok(())
    }

    /// Whether the underlying stream has reported end-of-stream
    pub fn eof_seen(&self) -> bool {
        self.state.borrow().eof
    }
}

struct Reader<'a, S> {
    source: &'a mut S,
    chunk_size: usize,
}

impl<S: ByteSource> Reader<'_, S> {
    /// Pull one chunk into the stream buffer; false on timeout or EOF
    fn fill(&mut self, st: &mut StreamState, timeout: Option<Duration>) -> DoorResult<bool> {
        let mut buf = vec![0u8; self.chunk_size];
        match self.source.read_timeout(&mut buf, timeout)? {
            ReadOutcome::Data(n) => {
                st.inbuf.extend(&buf[..n]);
                Ok(n > 0)
            }
            ReadOutcome::Pending => Ok(false),
            ReadOutcome::Closed => {
                if !st.eof {
                    trace!(fd = st.fd, "input stream closed");
                }
                st.eof = true;
                Ok(false)
            }
        }
    }

    fn read_byte(
        &mut self,
        st: &mut StreamState,
        timeout: Option<Duration>,
    ) -> DoorResult<Option<u8>> {
        if st.inbuf.is_empty() && !self.fill(st, timeout)? {
            return Ok(None);
        }
        Ok(st.inbuf.pop_front())
    }
}

impl StreamState {
    fn decode<S: ByteSource>(
        &mut self,
        reader: &mut Reader<'_, S>,
        timeout: Option<Duration>,
        escape_timeout: Duration,
        flags: ReadFlags,
        extended: bool,
    ) -> DoorResult<Option<InputEvent>> {
        if flags.raw {
            return Ok(reader.read_byte(self, timeout)?.map(InputEvent::Character));
        }

        if !self.doorway && self.doorway_pending && self.sequence.is_empty() {
            self.doorway_pending = false;
            self.doorway = true;
        }

        if self.sequence.is_empty() && !self.doorway {
            match reader.read_byte(self, timeout)? {
                None => return Ok(None),
                Some(0) => {
                    trace!(fd = self.fd, "doorway sequence started");
                    self.doorway = true;
                }
                Some(b) => self.sequence.push(b),
            }
        }

        if !self.doorway {
            if !is_sequence_prefix(&self.sequence, flags, extended) {
                return Ok(self.take_literal());
            }
            if let Some(seq) = unambiguous_match(&self.sequence, flags, extended) {
                return Ok(Some(self.take_match(seq)));
            }
        }

        while !self.doorway_pending {
            let Some(byte) = reader.read_byte(self, Some(escape_timeout))? else {
                trace!(fd = self.fd, pending = ?self.sequence, "escape grace period expired");
                break;
            };

            if self.doorway {
                self.doorway = false;
                return Ok(Some(InputEvent::Extended(byte)));
            }

            if byte == 0 {
                self.doorway_pending = true;
                break;
            }

            // Safety bound only: entries are shorter than the cap and a
            // non-prefix stops accumulation first
            if self.sequence.len() >= SEQUENCE_BUFFER_SIZE {
                self.inbuf.push_front(byte);
                break;
            }
            self.sequence.push(byte);

            if let Some(seq) = unambiguous_match(&self.sequence, flags, extended) {
                return Ok(Some(self.take_match(seq)));
            }
            if !is_sequence_prefix(&self.sequence, flags, extended) {
                break;
            }
        }

        if self.doorway {
            // NUL with nothing after it
            self.doorway = false;
            return Ok(Some(InputEvent::Character(0)));
        }

        if let Some(seq) = longest_complete_match(&self.sequence, flags, extended) {
            return Ok(Some(self.take_match(seq)));
        }
        Ok(self.take_literal())
    }

    fn take_literal(&mut self) -> Option<InputEvent> {
        if self.sequence.is_empty() {
            return None;
        }
        Some(InputEvent::Character(self.sequence.remove(0)))
    }

    fn take_match(&mut self, seq: &KeySequence) -> InputEvent {
        self.sequence.drain(..seq.bytes.len());
        InputEvent::Extended(seq.key.scan_code())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;

    use crate::keys::KeyCode;

    /// Byte source fed from a script of chunks; `None` entries are timeouts
    struct Script {
        steps: VecDeque<Option<Vec<u8>>>,
    }

    impl Script {
        fn new(steps: Vec<Option<Vec<u8>>>) -> Self {
            Self {
                steps: steps.into(),
            }
        }
    }

    fn data(bytes: &[u8]) -> Option<Vec<u8>> {
        Some(bytes.to_vec())
    }

    const PAUSE: Option<Vec<u8>> = None;

    impl ByteSource for Script {
        fn read_timeout(
            &mut self,
            buf: &mut [u8],
            _timeout: Option<Duration>,
        ) -> DoorResult<ReadOutcome> {
            match self.steps.pop_front() {
                None => Ok(ReadOutcome::Closed),
                Some(None) => Ok(ReadOutcome::Pending),
                Some(Some(chunk)) => {
                    buf[..chunk.len()].copy_from_slice(&chunk);
                    Ok(ReadOutcome::Data(chunk.len()))
                }
            }
        }
    }

    fn input(steps: Vec<Option<Vec<u8>>>, extended: bool) -> RawInput<Script> {
        let state = Rc::new(RefCell::new(StreamState::new(-1)));
        let mut inp = RawInput::with_source(state, Script::new(steps));
        inp.set_extended_keys(extended);
        inp
    }

    fn next(inp: &mut RawInput<Script>) -> Option<InputEvent> {
        inp.next_event(Some(Duration::ZERO), ReadFlags::NORMAL)
            .expect("decode")
    }

    #[test]
    fn test_plain_characters() {
        let mut inp = input(vec![data(b"hi")], false);
        assert_eq!(next(&mut inp), Some(InputEvent::Character(b'h')));
        assert_eq!(next(&mut inp), Some(InputEvent::Character(b'i')));
        assert_eq!(next(&mut inp), None);
    }

    #[test]
    fn test_arrow_in_one_chunk() {
        let mut inp = input(vec![data(b"\x1b[A")], false);
        assert_eq!(next(&mut inp), Some(InputEvent::Extended(KeyCode::Up.scan_code())));
    }

    #[test]
    fn test_arrow_split_across_reads() {
        let mut inp = input(vec![data(b"\x1b"), data(b"["), data(b"B")], false);
        assert_eq!(next(&mut inp), Some(InputEvent::Extended(KeyCode::Down.scan_code())));
    }

    #[test]
    fn test_lone_escape_after_timeout() {
        let mut inp = input(vec![data(b"\x1b"), PAUSE], false);
        assert_eq!(next(&mut inp), Some(InputEvent::Character(0x1b)));
        assert!(inp.state().borrow().pending_bytes().is_empty());
    }

    #[test]
    fn test_non_sequence_after_escape() {
        let mut inp = input(vec![data(b"\x1bz")], true);
        assert_eq!(next(&mut inp), Some(InputEvent::Character(0x1b)));
        assert_eq!(next(&mut inp), Some(InputEvent::Character(b'z')));
    }

    #[test]
    fn test_prefix_resolves_to_longest_on_timeout() {
        // ESC [ H could be the start of ESC [ H ESC [ 2 J
        let mut inp = input(vec![data(b"\x1b[H"), PAUSE], true);
        assert_eq!(next(&mut inp), Some(InputEvent::Extended(KeyCode::Home.scan_code())));
    }

    #[test]
    fn test_longest_sequence_wins() {
        let mut inp = input(vec![data(b"\x1b[H\x1b[2J")], true);
        assert_eq!(
            next(&mut inp),
            Some(InputEvent::Extended(KeyCode::PageDown.scan_code()))
        );
    }

    #[test]
    fn test_broken_long_sequence_keeps_suffix() {
        let mut inp = input(vec![data(b"\x1b[H\x1b[x")], true);
        assert_eq!(next(&mut inp), Some(InputEvent::Extended(KeyCode::Home.scan_code())));
        assert_eq!(next(&mut inp), Some(InputEvent::Character(0x1b)));
        assert_eq!(next(&mut inp), Some(InputEvent::Character(b'[')));
        assert_eq!(next(&mut inp), Some(InputEvent::Character(b'x')));
    }

    #[test]
    fn test_basic_subset_ignores_function_keys() {
        let mut inp = input(vec![data(b"\x1bOP")], false);
        assert_eq!(next(&mut inp), Some(InputEvent::Character(0x1b)));
        assert_eq!(next(&mut inp), Some(InputEvent::Character(b'O')));
        assert_eq!(next(&mut inp), Some(InputEvent::Character(b'P')));

        let mut inp = input(vec![data(b"\x1bOP")], true);
        assert_eq!(next(&mut inp), Some(InputEvent::Extended(KeyCode::F1.scan_code())));
    }

    #[test]
    fn test_doorway_scan_code() {
        let mut inp = input(vec![data(b"\x00\x48")], false);
        assert_eq!(next(&mut inp), Some(InputEvent::Extended(0x48)));
    }

    #[test]
    fn test_doorway_across_calls() {
        let mut inp = input(vec![data(b"\x00"), data(b"\x99")], false);
        assert_eq!(next(&mut inp), Some(InputEvent::Extended(0x99)));
    }

    #[test]
    fn test_doorway_double_nul() {
        let mut inp = input(vec![data(b"\x00\x00a")], false);
        assert_eq!(next(&mut inp), Some(InputEvent::Extended(0)));
        assert_eq!(next(&mut inp), Some(InputEvent::Character(b'a')));
    }

    #[test]
    fn test_lone_nul_is_character() {
        let mut inp = input(vec![data(b"\x00"), PAUSE], false);
        assert_eq!(next(&mut inp), Some(InputEvent::Character(0)));
    }

    #[test]
    fn test_doorway_mid_sequence() {
        let mut inp = input(vec![data(b"\x1b[\x00\x4b")], false);
        assert_eq!(next(&mut inp), Some(InputEvent::Character(0x1b)));
        assert_eq!(next(&mut inp), Some(InputEvent::Character(b'[')));
        assert_eq!(next(&mut inp), Some(InputEvent::Extended(0x4b)));
        assert_eq!(next(&mut inp), None);
    }

    #[test]
    fn test_raw_flag_passes_bytes_through() {
        let mut inp = input(vec![data(b"\x1b[A\x00")], true);
        let mut out = Vec::new();
        while let Some(ev) = inp
            .next_event(Some(Duration::ZERO), ReadFlags::RAW)
            .expect("decode")
        {
            out.push(ev);
        }
        assert_eq!(
            out,
            vec![
                InputEvent::Character(0x1b),
                InputEvent::Character(b'['),
                InputEvent::Character(b'A'),
                InputEvent::Character(0),
            ]
        );
    }

    #[test]
    fn test_control_aliases_respect_raw_ctrl() {
        let mut inp = input(vec![data(b"\x7f")], true);
        assert_eq!(next(&mut inp), Some(InputEvent::Extended(KeyCode::Delete.scan_code())));

        let mut inp = input(vec![data(b"\x7f")], true);
        assert_eq!(
            inp.get_key(Some(Duration::ZERO)).expect("decode"),
            Some(Key::Char(0x7f))
        );
    }

    #[test]
    fn test_get_key_maps_named_keys() {
        let mut inp = input(vec![data(b"\x1b[3~")], true);
        assert_eq!(
            inp.get_key(Some(Duration::ZERO)).expect("decode"),
            Some(Key::Named(KeyCode::Delete))
        );
    }

    #[test]
    fn test_eof_yields_none() {
        let mut inp = input(vec![], false);
        assert_eq!(next(&mut inp), None);
        assert!(inp.eof_seen());
    }

    #[test]
    fn test_shared_state_between_readers() {
        let state = Rc::new(RefCell::new(StreamState::new(-1)));
        let mut first = RawInput::with_source(Rc::clone(&state), Script::new(vec![data(b"ab")]));
        let mut second = RawInput::with_source(Rc::clone(&state), Script::new(vec![]));

        assert_eq!(next(&mut first), Some(InputEvent::Character(b'a')));
        // The second reader sees the byte the first one buffered
        assert_eq!(
            second
                .next_event(Some(Duration::ZERO), ReadFlags::NORMAL)
                .expect("decode"),
            Some(InputEvent::Character(b'b'))
        );
    }

    #[test]
    fn test_key_pressed_and_clear() {
        let mut inp = input(vec![data(b"xyz"), data(b"more"), PAUSE], false);
        assert!(inp.key_pressed().expect("poll"));
        inp.clear_keybuffer().expect("clear");
        assert!(inp.state().borrow().pending_bytes().is_empty());
        assert_eq!(next(&mut inp), None);
    }

    #[test]
    fn test_digit_run_stops_at_first_non_prefix() {
        let mut inp = input(vec![data(b"\x1b[1"), data(b"1111111111")], true);
        assert_eq!(next(&mut inp), Some(InputEvent::Character(0x1b)));
        // "\x1b[111" is not an entry; accumulation stopped there
        assert_eq!(inp.state().borrow().pending_bytes(), b"[111");
        assert!(inp.state().borrow().pending_bytes().len() < SEQUENCE_BUFFER_SIZE);
    }
}
