//! Streaming frame extractor
//!
//! States:
//! - Passthrough: outside any frame, bytes are handed back unchanged
//! - LeadEscape: a DLE was seen outside a frame; STX opens a frame, anything
//!   else means the DLE was plain passthrough
//! - Kind: the byte after `DLE STX` is the frame kind
//! - Payload: collecting payload bytes
//! - PayloadEscape: a DLE inside the payload; DLE is a literal DLE, ETX ends
//!   the frame, anything else is kept as DLE plus that byte
//!
//! All state survives between calls to [`Framer::feed`], so a frame may be
//! split across any number of reads.

use serde::Serialize;

use super::{DLE, ETX, STX};
use crate::error::{DoorError, DoorResult};

/// A complete frame with its payload already unescaped
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LnwpFrame {
    pub kind: char,
    pub payload: Vec<u8>,
}

impl LnwpFrame {
    /// Payload as text, replacing invalid UTF-8
    pub fn payload_str(&self) -> String {
        String::from_utf8_lossy(&self.payload).into_owned()
    }
}

/// Result of one [`Framer::feed`] call
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct FeedOutput {
    pub frames: Vec<LnwpFrame>,
    /// Bytes outside any frame, in original order
    pub passthrough: Vec<u8>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Passthrough,
    LeadEscape,
    Kind,
    Payload,
    PayloadEscape,
}

/// Incremental LNWP frame decoder
#[derive(Debug)]
pub struct Framer {
    state: State,
    kind: u8,
    payload: Vec<u8>,
}

impl Default for Framer {
    fn default() -> Self {
        Self::new()
    }
}

impl Framer {
    pub fn new() -> Self {
        Self {
            state: State::Passthrough,
            kind: 0,
            payload: Vec::with_capacity(256),
        }
    }

    /// Whether a DLE at the end of the last chunk is waiting for its partner
    pub fn pending_lead_escape(&self) -> bool {
        self.state == State::LeadEscape
    }

    /// Whether a frame has been opened but not closed
    pub fn in_frame(&self) -> bool {
        matches!(
            self.state,
            State::Kind | State::Payload | State::PayloadEscape
        )
    }

    /// Process a chunk of bytes
    pub fn feed(&mut self, data: &[u8]) -> FeedOutput {
        let mut out = FeedOutput::default();
        for &byte in data {
            self.process_byte(byte, &mut out);
        }
        out
    }

    fn process_byte(&mut self, byte: u8, out: &mut FeedOutput) {
        match self.state {
            State::Passthrough => {
                if byte == DLE {
                    self.state = State::LeadEscape;
                } else {
                    out.passthrough.push(byte);
                }
            }
            State::LeadEscape => {
                if byte == STX {
                    self.payload.clear();
                    self.state = State::Kind;
                    return;
                }
                // False start: the held DLE was ordinary data
                out.passthrough.push(DLE);
                if byte == DLE {
                    self.state = State::LeadEscape;
                } else {
                    out.passthrough.push(byte);
                    self.state = State::Passthrough;
                }
            }
            State::Kind => {
                self.kind = byte;
                self.state = State::Payload;
            }
            State::Payload => {
                if byte == DLE {
                    self.state = State::PayloadEscape;
                } else {
                    self.payload.push(byte);
                }
            }
            State::PayloadEscape => {
                match byte {
                    DLE => self.payload.push(DLE),
                    ETX => {
                        let frame = LnwpFrame {
                            kind: char::from(self.kind),
                            payload: std::mem::take(&mut self.payload),
                        };
                        tracing::trace!(kind = %frame.kind, len = frame.payload.len(), "frame decoded");
                        out.frames.push(frame);
                        self.state = State::Passthrough;
                        return;
                    }
                    other => {
                        self.payload.push(DLE);
                        self.payload.push(other);
                    }
                }
                self.state = State::Payload;
            }
        }
    }
}

/// Double every DLE in `payload`
pub fn escape_payload(payload: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(payload.len() + 4);
    for &b in payload {
        out.push(b);
        if b == DLE {
            out.push(DLE);
        }
    }
    out
}

/// Build a complete wire frame
///
/// The kind must be a single ASCII character.
pub fn encode_frame(kind: char, payload: &[u8]) -> DoorResult<Vec<u8>> {
    if !kind.is_ascii() {
        return Err(DoorError::InvalidKind(kind));
    }
    let mut frame = Vec::with_capacity(payload.len() + 6);
    frame.extend_from_slice(&[DLE, STX, kind as u8]);
    frame.extend_from_slice(&escape_payload(payload));
    frame.extend_from_slice(&[DLE, ETX]);
    Ok(frame)
}
