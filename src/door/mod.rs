//! Door Event Loop
//!
//! Polls the LNWP control descriptor, runs received bytes through the
//! [`Framer`] and payload codec, and classifies frames into [`DoorEvent`]s.
//! The loop also keeps the inbound caches (inbox, node snapshots) and drives
//! the inbox auto-drain handshake.
//!
//! Every poll performs at most one read. A zero-length read marks the channel
//! closed; later polls return nothing without touching the descriptor.
//! Without a control channel (descriptor 0) the door still works and every
//! LNWP operation is a no-op.

mod channel;
mod commands;
mod inbox;

pub use channel::ControlChannel;
pub use commands::InputMode;
pub use inbox::InboxDrain;

use std::os::unix::io::RawFd;
use std::time::{Duration, Instant};

use serde::Serialize;
use tracing::{debug, trace, warn};

use crate::config::DoorConfig;
use crate::error::DoorResult;
use crate::fd::{FdStream, ReadOutcome};
use crate::lnwp::{parse_payload, DoorEvent, Fields, Framer, NodeMap};
use crate::session::SessionArgs;

/// Slice length for the blocking nodes-info query
const NODES_INFO_SLICE: Duration = Duration::from_millis(100);

/// A decoded frame: kind plus payload fields
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DecodedFrame {
    pub kind: char,
    pub fields: Fields,
}

/// Frames from one poll
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct FramePoll {
    pub frames: Vec<DecodedFrame>,
    /// Bytes outside any frame, in original order
    pub passthrough: Vec<u8>,
}

/// Events from one poll
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct EventPoll {
    pub events: Vec<DoorEvent>,
    pub passthrough: Vec<u8>,
}

/// LNWP-aware door runtime
pub struct Door<C = FdStream> {
    channel: Option<C>,
    framer: Framer,
    door_key: String,
    username: Option<String>,
    eof: bool,
    inbox: Vec<Fields>,
    nodes_info: NodeMap,
    node_info: Fields,
    drain: InboxDrain,
    poll_max_bytes: usize,
    nodes_info_wait: Duration,
    default_box: String,
}

impl Door<FdStream> {
    /// Door on an inherited control descriptor; `control_fd <= 0` disables LNWP
    pub fn open(control_fd: RawFd, door_key: &str, config: &DoorConfig) -> Self {
        let channel = (control_fd > 0).then(|| FdStream::new(control_fd));
        Self::with_channel(channel, door_key, config)
    }

    /// Door configured from the resolved startup arguments
    pub fn from_session(session: &SessionArgs, config: &DoorConfig) -> Self {
        Self::open(session.lnwp_fd, &session.door_key, config)
    }
}

impl<C: ControlChannel> Door<C> {
    pub fn with_channel(channel: Option<C>, door_key: &str, config: &DoorConfig) -> Self {
        Self {
            channel,
            framer: Framer::new(),
            door_key: door_key.to_string(),
            username: None,
            eof: false,
            inbox: Vec::new(),
            nodes_info: NodeMap::new(),
            node_info: Fields::new(),
            drain: InboxDrain::new(&config.default_box),
            poll_max_bytes: config.poll_max_bytes.max(1),
            nodes_info_wait: Duration::from_millis(config.nodes_info_wait_ms),
            default_box: config.default_box.clone(),
        }
    }

    /// Whether a control channel is attached
    pub fn lnwp_enabled(&self) -> bool {
        self.channel.is_some()
    }

    /// Whether the control channel has reported end-of-stream
    pub fn is_eof(&self) -> bool {
        self.eof
    }

    /// Identifier the host assigned to this door
    pub fn door_key(&self) -> &str {
        &self.door_key
    }

    /// Username last announced with [`Door::set_username`]
    pub fn username(&self) -> Option<&str> {
        self.username.as_deref()
    }

    pub fn channel(&self) -> Option<&C> {
        self.channel.as_ref()
    }

    pub fn inbox_drain(&self) -> &InboxDrain {
        &self.drain
    }

    /// Read once from the control channel and decode any complete frames
    ///
    /// `timeout` bounds the wait for readability; `None` blocks. Returns an
    /// empty result on timeout, without a channel, or once closed.
    pub fn poll(&mut self, timeout: Option<Duration>, max_bytes: usize) -> DoorResult<FramePoll> {
        let Some(channel) = self.channel.as_mut() else {
            return Ok(FramePoll::default());
        };
        if self.eof {
            return Ok(FramePoll::default());
        }

        let mut buf = vec![0u8; max_bytes.max(1)];
        let n = match channel.read_timeout(&mut buf, timeout)? {
            ReadOutcome::Data(n) => n,
            ReadOutcome::Pending => return Ok(FramePoll::default()),
            ReadOutcome::Closed => {
                debug!(door_key = %self.door_key, "control channel closed");
                self.eof = true;
                return Ok(FramePoll::default());
            }
        };

        let fed = self.framer.feed(&buf[..n]);
        let frames = fed
            .frames
            .into_iter()
            .map(|frame| DecodedFrame {
                kind: frame.kind,
                fields: parse_payload(&frame.payload_str()),
            })
            .collect();
        Ok(FramePoll {
            frames,
            passthrough: fed.passthrough,
        })
    }

    /// Poll once and classify frames, updating caches and the inbox drain
    ///
    /// Every frame of the read is applied even if an auto-drain request
    /// cannot be sent; such failures are logged and end the drain.
    pub fn poll_events(
        &mut self,
        timeout: Option<Duration>,
        max_bytes: usize,
    ) -> DoorResult<EventPoll> {
        let polled = self.poll(timeout, max_bytes)?;
        let mut events = Vec::with_capacity(polled.frames.len());

        for frame in polled.frames {
            let event = DoorEvent::classify(frame.kind, frame.fields);
            match &event {
                DoorEvent::NewMessage { .. } => {
                    if let Some(mailbox) = self.drain.on_new_message() {
                        debug!(%mailbox, "new mail, auto-draining");
                        self.request_drain(&mailbox);
                    }
                }
                DoorEvent::Message { fields } => {
                    if event.is_empty_inbox() {
                        debug!("inbox drained");
                        self.drain.on_empty();
                        continue;
                    }
                    self.inbox.push(fields.clone());
                    if let Some(mailbox) = self.drain.on_message() {
                        self.request_drain(&mailbox);
                    }
                }
                DoorEvent::NodesInfo { nodes, .. } => self.nodes_info = nodes.clone(),
                DoorEvent::NodeInfo { fields } => self.node_info = fields.clone(),
                DoorEvent::Raw { kind, fields } => {
                    trace!(%kind, prm = fields.get("PRM").map(String::as_str).unwrap_or(""), "unrecognized frame");
                }
            }
            events.push(event);
        }

        Ok(EventPoll {
            events,
            passthrough: polled.passthrough,
        })
    }

    /// Ask for the next message on behalf of the auto-drain
    ///
    /// A failed request ends the drain so the next new-mail notice starts
    /// over; the rest of the batch is still applied.
    fn request_drain(&mut self, mailbox: &str) {
        if let Err(e) = self.request_next_message(mailbox) {
            warn!(%mailbox, error = %e, "inbox request failed, auto-drain stopped");
            self.drain.cancel();
        }
    }

    /// Poll once, then hand back and clear every collected message
    pub fn poll_messages(&mut self, timeout: Option<Duration>) -> DoorResult<Vec<Fields>> {
        self.poll_events(timeout, self.poll_max_bytes)?;
        Ok(self.drain_messages())
    }

    /// First frame of a single poll
    pub fn recv_lnwp(&mut self, timeout: Option<Duration>) -> DoorResult<Option<DecodedFrame>> {
        let polled = self.poll(timeout, self.poll_max_bytes)?;
        Ok(polled.frames.into_iter().next())
    }

    /// Hand back and clear collected messages
    pub fn drain_messages(&mut self) -> Vec<Fields> {
        std::mem::take(&mut self.inbox)
    }

    /// Last node-list snapshot received
    pub fn nodes_info(&self) -> &NodeMap {
        &self.nodes_info
    }

    /// Last single-node snapshot received
    pub fn node_info(&self) -> &Fields {
        &self.node_info
    }

    /// Enable or disable automatic inbox draining
    pub fn set_inbox_auto_drain(&mut self, enabled: bool, mailbox: &str) {
        self.drain.configure(enabled, mailbox, &self.default_box);
    }

    /// Start draining `mailbox` now
    pub fn drain_inbox(&mut self, mailbox: &str) -> DoorResult<()> {
        self.drain.start();
        self.request_next_message(mailbox)
    }

    /// Ask for every node's info and wait for the answer
    ///
    /// Polls in short slices until a snapshot arrives, the channel closes,
    /// or the configured wait elapses. Returns whatever snapshot is cached.
    pub fn get_nodes_info(&mut self) -> DoorResult<&NodeMap> {
        if !self.lnwp_enabled() {
            return Ok(&self.nodes_info);
        }
        self.request_nodes_info(&["*"])?;

        let start = Instant::now();
        while start.elapsed() < self.nodes_info_wait && !self.eof {
            self.poll_events(Some(NODES_INFO_SLICE), self.poll_max_bytes)?;
            if !self.nodes_info.is_empty() {
                break;
            }
        }
        Ok(&self.nodes_info)
    }
}
