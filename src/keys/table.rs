//! Static sequence table and matching queries
//!
//! Every byte sequence appears exactly once. When several entries match a
//! buffer the longest wins; entries of equal length cannot both match the
//! same buffer, and should a duplicate ever be added the earlier entry in
//! table order takes priority.

use super::{KeyCode, ReadFlags};

/// One encoding of a logical key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeySequence {
    /// Raw bytes as sent by the terminal
    pub bytes: &'static [u8],
    /// Logical key the bytes stand for
    pub key: KeyCode,
    /// Single control-byte alias, skipped under `raw_ctrl`
    pub control: bool,
    /// Member of the basic subset used when extended keys are off
    pub basic: bool,
}

const fn basic(bytes: &'static [u8], key: KeyCode) -> KeySequence {
    KeySequence {
        bytes,
        key,
        control: false,
        basic: true,
    }
}

const fn full(bytes: &'static [u8], key: KeyCode) -> KeySequence {
    KeySequence {
        bytes,
        key,
        control: false,
        basic: false,
    }
}

const fn ctrl(bytes: &'static [u8], key: KeyCode) -> KeySequence {
    KeySequence {
        bytes,
        key,
        control: true,
        basic: false,
    }
}

static TABLE: &[KeySequence] = &[
    // VT52 / ANSI.SYS style
    basic(b"\x1bA", KeyCode::Up),
    basic(b"\x1bB", KeyCode::Down),
    basic(b"\x1bC", KeyCode::Right),
    basic(b"\x1bD", KeyCode::Left),
    basic(b"\x1bH", KeyCode::Home),
    basic(b"\x1bK", KeyCode::End),
    full(b"\x1bP", KeyCode::F1),
    full(b"\x1bQ", KeyCode::F2),
    full(b"\x1b?w", KeyCode::F3),
    full(b"\x1b?x", KeyCode::F4),
    full(b"\x1b?t", KeyCode::F5),
    full(b"\x1b?u", KeyCode::F6),
    full(b"\x1b?q", KeyCode::F7),
    full(b"\x1b?r", KeyCode::F8),
    full(b"\x1b?p", KeyCode::F9),
    // CSI
    basic(b"\x1b[A", KeyCode::Up),
    basic(b"\x1b[B", KeyCode::Down),
    basic(b"\x1b[C", KeyCode::Right),
    basic(b"\x1b[D", KeyCode::Left),
    full(b"\x1b[M", KeyCode::PageUp),
    full(b"\x1b[H\x1b[2J", KeyCode::PageDown),
    basic(b"\x1b[H", KeyCode::Home),
    basic(b"\x1b[K", KeyCode::End),
    full(b"\x1b[L", KeyCode::Home),
    full(b"\x1b[Z", KeyCode::ShiftTab),
    // SS3
    full(b"\x1bOP", KeyCode::F1),
    full(b"\x1bOQ", KeyCode::F2),
    full(b"\x1bOR", KeyCode::F3),
    full(b"\x1bOS", KeyCode::F4),
    full(b"\x1bOw", KeyCode::F3),
    full(b"\x1bOx", KeyCode::F4),
    full(b"\x1bOt", KeyCode::F5),
    full(b"\x1bOu", KeyCode::F6),
    full(b"\x1bOq", KeyCode::F7),
    full(b"\x1bOr", KeyCode::F8),
    full(b"\x1bOp", KeyCode::F9),
    full(b"\x1bOA", KeyCode::Up),
    full(b"\x1bOB", KeyCode::Down),
    full(b"\x1bOC", KeyCode::Right),
    full(b"\x1bOD", KeyCode::Left),
    full(b"\x1bOH", KeyCode::Home),
    full(b"\x1bOK", KeyCode::End),
    // CSI n ~
    full(b"\x1b[1~", KeyCode::Home),
    full(b"\x1b[2~", KeyCode::Insert),
    full(b"\x1b[3~", KeyCode::Delete),
    full(b"\x1b[4~", KeyCode::End),
    full(b"\x1b[5~", KeyCode::PageUp),
    full(b"\x1b[6~", KeyCode::PageDown),
    full(b"\x1b[11~", KeyCode::F1),
    full(b"\x1b[12~", KeyCode::F2),
    full(b"\x1b[13~", KeyCode::F3),
    full(b"\x1b[14~", KeyCode::F4),
    full(b"\x1b[15~", KeyCode::F5),
    full(b"\x1b[17~", KeyCode::F6),
    full(b"\x1b[18~", KeyCode::F7),
    full(b"\x1b[19~", KeyCode::F8),
    full(b"\x1b[20~", KeyCode::F9),
    full(b"\x1b[21~", KeyCode::F10),
    full(b"\x1b[23~", KeyCode::F11),
    full(b"\x1b[24~", KeyCode::F12),
    // WordStar-style control keys
    ctrl(b"\x16\t", KeyCode::Insert),
    ctrl(b"\x7f", KeyCode::Delete),
    ctrl(b"\x05", KeyCode::Up),
    ctrl(b"\x18", KeyCode::Down),
    ctrl(b"\x13", KeyCode::Left),
    ctrl(b"\x04", KeyCode::Right),
    ctrl(b"\x07", KeyCode::Delete),
    ctrl(b"\x16", KeyCode::Insert),
];

/// Entries in play for the given flags, in priority order
///
/// Raw mode has no sequences at all.
pub fn sequences(flags: ReadFlags, extended: bool) -> impl Iterator<Item = &'static KeySequence> {
    TABLE.iter().filter(move |seq| {
        !flags.raw && (extended || seq.basic) && !(flags.raw_ctrl && seq.control)
    })
}

/// Whether `buf` is the start of (or equal to) at least one entry
pub fn is_sequence_prefix(buf: &[u8], flags: ReadFlags, extended: bool) -> bool {
    !buf.is_empty() && sequences(flags, extended).any(|seq| seq.bytes.starts_with(buf))
}

/// The longest entry that `buf` starts with, provided no entry extends `buf`
///
/// Returns `None` while `buf` could still grow into a longer entry, since
/// emitting now might split a sequence that is still arriving.
pub fn unambiguous_match(
    buf: &[u8],
    flags: ReadFlags,
    extended: bool,
) -> Option<&'static KeySequence> {
    if buf.is_empty() {
        return None;
    }
    let mut best: Option<&'static KeySequence> = None;
    for seq in sequences(flags, extended) {
        if seq.bytes.len() > buf.len() {
            if seq.bytes.starts_with(buf) {
                return None;
            }
        } else if buf.starts_with(seq.bytes) && best.map_or(true, |b| seq.bytes.len() > b.bytes.len())
        {
            best = Some(seq);
        }
    }
    best
}

/// The longest entry that `buf` starts with, ignoring possible extensions
///
/// Used once waiting for more input has timed out.
pub fn longest_complete_match(
    buf: &[u8],
    flags: ReadFlags,
    extended: bool,
) -> Option<&'static KeySequence> {
    let mut best: Option<&'static KeySequence> = None;
    for seq in sequences(flags, extended) {
        if buf.starts_with(seq.bytes) && best.map_or(true, |b| seq.bytes.len() > b.bytes.len()) {
            best = Some(seq);
        }
    }
    best
}
