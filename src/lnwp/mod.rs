//! LNWP control-channel protocol
//!
//! Frames travel on the control descriptor as
//! `DLE STX <kind> <payload, DLE doubled> DLE ETX`, interleaved with
//! unrelated passthrough bytes. The payload is a text line of
//! `KEY=value` tokens, for example `LNWP V1 PRM=GET_MSG BOX="TEMP"`.
//!
//! - [`Framer`] extracts frames from arbitrarily fragmented reads
//! - [`build_payload`] / [`parse_payload`] encode and decode the payload text
//! - [`DoorEvent`] is the typed view of a decoded frame

mod event;
mod framer;
mod payload;

pub use event::{parse_nodes_info, DoorEvent, NodeMap};
pub use framer::{encode_frame, escape_payload, FeedOutput, Framer, LnwpFrame};
pub use payload::{build_payload, parse_payload, quote_val, Fields};

/// Data link escape, doubled inside payloads
pub const DLE: u8 = 0x10;
/// Start of frame (after DLE)
pub const STX: u8 = 0x02;
/// End of frame (after DLE)
pub const ETX: u8 = 0x03;
