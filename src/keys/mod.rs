//! Key Sequence Table
//!
//! Maps the byte sequences a remote terminal sends for special keys onto
//! logical key codes. A logical key usually has several encodings (CSI, SS3,
//! VT52-style, `~`-terminated, single control bytes) and some encodings are
//! prefixes of others, so the table exposes prefix and longest-match queries
//! rather than a plain lookup.
//!
//! Two subsets exist:
//! - the basic subset (arrows, Home, End) used when extended keys are off, so
//!   terminals without full VT emulation are never kept waiting on sequences
//!   they will not send;
//! - the full table, which adds function keys, paging keys, Insert/Delete,
//!   Shift-Tab and the control-byte aliases.

mod table;

pub use table::{
    is_sequence_prefix, longest_complete_match, sequences, unambiguous_match, KeySequence,
};

use serde::{Deserialize, Serialize};

/// Logical keys, valued by their PC scan code
///
/// Doorway-mode clients send these scan codes directly after a NUL byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum KeyCode {
    F1 = 0x3B,
    F2 = 0x3C,
    F3 = 0x3D,
    F4 = 0x3E,
    F5 = 0x3F,
    F6 = 0x40,
    F7 = 0x41,
    F8 = 0x42,
    F9 = 0x43,
    F10 = 0x44,
    Home = 0x47,
    Up = 0x48,
    PageUp = 0x49,
    Left = 0x4B,
    Right = 0x4D,
    End = 0x4F,
    Down = 0x50,
    PageDown = 0x51,
    Insert = 0x52,
    Delete = 0x53,
    F11 = 0x85,
    F12 = 0x86,
    ShiftTab = 0x0F,
}

impl KeyCode {
    /// The scan code carried by extended-key events
    pub fn scan_code(self) -> u8 {
        self as u8
    }

    /// Map a scan code back to a logical key
    pub fn from_scan_code(code: u8) -> Option<Self> {
        let key = match code {
            0x3B => Self::F1,
            0x3C => Self::F2,
            0x3D => Self::F3,
            0x3E => Self::F4,
            0x3F => Self::F5,
            0x40 => Self::F6,
            0x41 => Self::F7,
            0x42 => Self::F8,
            0x43 => Self::F9,
            0x44 => Self::F10,
            0x47 => Self::Home,
            0x48 => Self::Up,
            0x49 => Self::PageUp,
            0x4B => Self::Left,
            0x4D => Self::Right,
            0x4F => Self::End,
            0x50 => Self::Down,
            0x51 => Self::PageDown,
            0x52 => Self::Insert,
            0x53 => Self::Delete,
            0x85 => Self::F11,
            0x86 => Self::F12,
            0x0F => Self::ShiftTab,
            _ => return None,
        };
        Some(key)
    }
}

/// Flags controlling how a decode request consults the table
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReadFlags {
    /// Return every byte verbatim, no table lookup at all
    pub raw: bool,
    /// Skip single-byte control aliases (DEL, ^E, ^X, ...) so they arrive as characters
    pub raw_ctrl: bool,
}

impl ReadFlags {
    pub const NORMAL: Self = Self {
        raw: false,
        raw_ctrl: false,
    };

    pub const RAW: Self = Self {
        raw: true,
        raw_ctrl: false,
    };

    pub const RAW_CTRL: Self = Self {
        raw: false,
        raw_ctrl: true,
    };
}
