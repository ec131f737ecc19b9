//! Raw Keyboard Input
//!
//! Turns the unbuffered byte stream from the remote terminal into keystroke
//! events. Bytes are pulled from a non-blocking [`ByteSource`] and matched
//! against the [key table](crate::keys). Multi-byte escape sequences arrive
//! byte by byte and may be prefixes of one another, so the decoder
//! accumulates a short pending buffer and waits a bounded grace period for
//! more input before settling on the longest match.
//!
//! # Doorway mode
//!
//! A NUL byte announces that the next byte is a raw scan code. The decoder
//! emits that byte as an extended key without consulting the table.
//!
//! # Shared stream state
//!
//! Decoder state and the raw-mode reference count live in a per-descriptor
//! [`StreamState`], handed out by a [`StreamRegistry`]. Several [`RawInput`]
//! handles can exist for one descriptor (nested prompts, for example) and
//! they all see the same pending bytes and the same raw-mode depth.
//!
//! [`ByteSource`]: crate::fd::ByteSource

mod decoder;
mod line;
mod raw_mode;
mod state;

pub use decoder::RawInput;
pub use raw_mode::RawModeGuard;
pub use state::{StreamRegistry, StreamState};

use serde::{Deserialize, Serialize};

use crate::keys::KeyCode;

/// Pending sequence bytes kept before the oldest is forced out as a literal
pub const SEQUENCE_BUFFER_SIZE: usize = 10;

/// Default inter-byte grace period while a sequence is ambiguous (ms)
pub const DEFAULT_ESCAPE_TIMEOUT_MS: u64 = 250;

pub const KEY_ENTER: u8 = b'\r';
pub const KEY_ESC: u8 = 0x1b;
pub const KEY_BACKSPACE: u8 = 0x08;
pub const KEY_DEL: u8 = 0x7f;
pub const KEY_TAB: u8 = b'\t';

/// A decoded keystroke
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InputEvent {
    /// A plain byte, including control characters and a lone ESC
    Character(u8),
    /// A special key, carried as its scan code
    ///
    /// Doorway clients may send scan codes the table does not know about,
    /// so this is not restricted to [`KeyCode`] values.
    Extended(u8),
}

impl InputEvent {
    /// The logical key for an extended event, if the scan code is known
    pub fn key_code(&self) -> Option<KeyCode> {
        match self {
            InputEvent::Extended(code) => KeyCode::from_scan_code(*code),
            InputEvent::Character(_) => None,
        }
    }
}

/// A keystroke as seen by prompts and menus
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Key {
    /// A plain byte
    Char(u8),
    /// A recognized special key
    Named(KeyCode),
    /// An extended scan code with no logical key
    Unknown(u8),
}

impl From<InputEvent> for Key {
    fn from(event: InputEvent) -> Self {
        match event {
            InputEvent::Character(b) => Key::Char(b),
            InputEvent::Extended(code) => match KeyCode::from_scan_code(code) {
                Some(key) => Key::Named(key),
                None => Key::Unknown(code),
            },
        }
    }
}

/// Printable in CP437 / Latin-1 terms: ASCII graphic plus the high half
pub fn is_printable(b: u8) -> bool {
    (32..=126).contains(&b) || b >= 160
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_key_code() {
        assert_eq!(InputEvent::Extended(0x48).key_code(), Some(KeyCode::Up));
        assert_eq!(InputEvent::Extended(0x01).key_code(), None);
        assert_eq!(InputEvent::Character(0x48).key_code(), None);
    }

    #[test]
    fn test_key_from_event() {
        assert_eq!(Key::from(InputEvent::Character(b'a')), Key::Char(b'a'));
        assert_eq!(
            Key::from(InputEvent::Extended(0x53)),
            Key::Named(KeyCode::Delete)
        );
        assert_eq!(Key::from(InputEvent::Extended(0x99)), Key::Unknown(0x99));
    }

    #[test]
    fn test_is_printable() {
        assert!(is_printable(b'a'));
        assert!(is_printable(b' '));
        assert!(is_printable(0xB0));
        assert!(!is_printable(KEY_ESC));
        assert!(!is_printable(KEY_DEL));
        assert!(!is_printable(0x85));
    }
}
