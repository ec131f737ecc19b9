//! Doorkit: terminal I/O for BBS door programs
//!
//! A door runs as a child of the BBS host and talks to the caller over
//! inherited descriptors: a raw terminal stream and, optionally, an LNWP
//! control channel for presence, chat and mail. This crate provides:
//!
//! - `keys`: key sequence table (CSI, SS3, VT52 and control-byte encodings)
//! - `input`: raw keystroke decoder with doorway mode and reference-counted raw mode
//! - `lnwp`: LNWP frame extraction, payload codec and event classification
//! - `door`: control-channel polling loop, inbox auto-drain and outbound commands
//! - `session`: startup argument resolution and terminal descriptor selection
//! - `fd`: readiness-polled descriptor I/O shared by both channels

pub mod config;
pub mod door;
pub mod error;
pub mod fd;
pub mod input;
pub mod keys;
pub mod lnwp;
pub mod session;

pub use config::DoorConfig;
pub use door::{ControlChannel, DecodedFrame, Door, EventPoll, FramePoll};
pub use error::{DoorError, DoorResult};
pub use fd::{ByteSource, FdStream, ReadOutcome};
pub use input::{InputEvent, Key, RawInput, RawModeGuard, StreamRegistry};
pub use keys::{KeyCode, ReadFlags};
pub use lnwp::{DoorEvent, Fields, Framer, LnwpFrame};
pub use session::SessionArgs;
