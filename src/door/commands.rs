//! Outbound LNWP commands
//!
//! Kinds used on the wire: `N` notifications (presence, activity), `C`
//! commands (push mail, input mode, chat), `Q` queries (mail, node info).

use std::str::FromStr;

use tracing::trace;

use super::inbox::mailbox_or;
use super::{ControlChannel, Door};
use crate::error::{DoorError, DoorResult};
use crate::lnwp::{build_payload, encode_frame};

/// Host-side terminal line discipline
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    /// Character at a time
    Raw,
    /// Line buffered by the host
    Cooked,
}

impl FromStr for InputMode {
    type Err = DoorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "raw" | "character" | "char" | "form" | "editor" | "chat" => Ok(InputMode::Raw),
            "cooked" | "line" | "menu" => Ok(InputMode::Cooked),
            _ => Err(DoorError::InvalidInputMode(s.to_string())),
        }
    }
}

/// Comma-joined trimmed keys, or `*` when nothing is left
fn key_list(keys: &[&str]) -> String {
    let joined = keys
        .iter()
        .map(|k| k.trim())
        .filter(|k| !k.is_empty())
        .collect::<Vec<_>>()
        .join(",");
    if joined.is_empty() {
        "*".to_string()
    } else {
        joined
    }
}

impl<C: ControlChannel> Door<C> {
    /// Frame and send a payload
    ///
    /// Characters outside ASCII are sent as `?`. Does nothing without a
    /// control channel.
    pub fn send_lnwp(&mut self, kind: char, payload: &str) -> DoorResult<()> {
        let Some(channel) = self.channel.as_mut() else {
            return Ok(());
        };
        let bytes: Vec<u8> = payload
            .chars()
            .map(|c| if c.is_ascii() { c as u8 } else { b'?' })
            .collect();
        let frame = encode_frame(kind, &bytes)?;
        trace!(%kind, payload, "sending frame");
        channel.send(&frame)
    }

    fn send_command(
        &mut self,
        kind: char,
        prm: &str,
        val: Option<&str>,
        extra: &[(&str, &str)],
    ) -> DoorResult<()> {
        self.send_lnwp(kind, &build_payload(prm, val, extra))
    }

    /// Publish what the user is doing
    pub fn set_activity(&mut self, activity: &str) -> DoorResult<()> {
        self.send_command('N', "ACTIVITY", Some(activity), &[])
    }

    pub fn clear_activity(&mut self) -> DoorResult<()> {
        self.set_activity("")
    }

    /// Announce the user's name; blank names are ignored
    pub fn set_username(&mut self, username: &str) -> DoorResult<()> {
        let username = username.trim();
        if username.is_empty() {
            return Ok(());
        }
        self.username = Some(username.to_string());
        self.send_command('N', "USERNAME", Some(username), &[])
    }

    pub fn enable_lnwp(&mut self) -> DoorResult<()> {
        self.send_command('N', "ARM_LNWP", Some("1"), &[])
    }

    pub fn disable_lnwp(&mut self) -> DoorResult<()> {
        self.send_command('N', "DISARM_LNWP", Some("0"), &[])
    }

    /// Ask the host to push new-mail notices for `mailbox`
    pub fn set_push_messages(&mut self, enabled: bool, mailbox: &str) -> DoorResult<()> {
        let state = if enabled { "ON" } else { "OFF" };
        self.send_command('C', "PUSH_MSG", Some(state), &[("BOX", mailbox)])
    }

    /// Switch the host's line discipline
    ///
    /// Accepts `raw`, `character`, `char`, `form`, `editor`, `chat` for raw
    /// input and `cooked`, `line`, `menu` for line input.
    pub fn set_input_mode(&mut self, mode: &str) -> DoorResult<()> {
        let raw = match mode.parse::<InputMode>()? {
            InputMode::Raw => "ON",
            InputMode::Cooked => "OFF",
        };
        self.send_command('C', "RAW_MODE", Some(raw), &[])
    }

    /// Send a chat message; node 0 addresses nobody in particular
    pub fn send_message(&mut self, node: u32, text: &str, mailbox: &str, tag: &str) -> DoorResult<()> {
        if node == 0 {
            self.send_command('C', "SEND_MSG", Some(text), &[("BOX", mailbox), ("TAG", tag)])
        } else {
            let node = node.to_string();
            self.send_command(
                'C',
                "SEND_MSG",
                Some(text),
                &[("NODE_ID", node.as_str()), ("BOX", mailbox), ("TAG", tag)],
            )
        }
    }

    /// Ask for the next queued message; a blank mailbox means the default
    pub fn request_next_message(&mut self, mailbox: &str) -> DoorResult<()> {
        let mailbox = mailbox_or(mailbox, &self.default_box);
        self.send_command('Q', "GET_MSG", None, &[("BOX", mailbox.as_str())])
    }

    /// Ask for `keys` of every node (`*` when empty)
    pub fn request_nodes_info(&mut self, keys: &[&str]) -> DoorResult<()> {
        let keys = key_list(keys);
        self.send_command('Q', "REQ_INFO", Some("NODES_INFO"), &[("KEY", keys.as_str())])
    }

    /// Ask for `keys` of this node (`*` when empty)
    pub fn request_node_info(&mut self, keys: &[&str]) -> DoorResult<()> {
        let keys = key_list(keys);
        self.send_command('Q', "REQ_INFO", Some("NODE_INFO"), &[("KEY", keys.as_str())])
    }
}
