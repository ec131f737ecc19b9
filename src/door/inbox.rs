//! Inbox auto-drain handshake
//!
//! idle -> draining when new mail is announced and auto-drain is on;
//! each drained message asks for the next one; the empty-inbox marker
//! returns to idle. Every request is triggered by exactly one incoming event.

/// Auto-drain state for one mailbox
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboxDrain {
    auto_drain: bool,
    target_box: String,
    draining: bool,
}

impl InboxDrain {
    pub fn new(target_box: &str) -> Self {
        Self {
            auto_drain: false,
            target_box: mailbox_or(target_box, "TEMP"),
            draining: false,
        }
    }

    pub fn auto_drain(&self) -> bool {
        self.auto_drain
    }

    pub fn draining(&self) -> bool {
        self.draining
    }

    pub fn target_box(&self) -> &str {
        &self.target_box
    }

    /// Turn auto-drain on or off; turning it off also ends a drain in progress
    pub fn configure(&mut self, enabled: bool, mailbox: &str, fallback: &str) {
        self.auto_drain = enabled;
        self.target_box = mailbox_or(mailbox, fallback);
        if !enabled {
            self.draining = false;
        }
    }

    /// Start draining regardless of the auto-drain setting
    pub fn start(&mut self) {
        self.draining = true;
    }

    /// New mail announced; returns the mailbox to request from, if any
    pub fn on_new_message(&mut self) -> Option<String> {
        if !self.auto_drain {
            return None;
        }
        self.draining = true;
        Some(self.target_box.clone())
    }

    /// A message arrived; returns the mailbox to request the next one from
    pub fn on_message(&mut self) -> Option<String> {
        (self.auto_drain && self.draining).then(|| self.target_box.clone())
    }

    /// Abandon a drain in progress, keeping the auto-drain setting
    pub fn cancel(&mut self) {
        self.draining = false;
    }

    /// The host reported the mailbox empty
    pub fn on_empty(&mut self) {
        self.draining = false;
    }
}

/// Trimmed mailbox name, or `fallback` when blank
pub(crate) fn mailbox_or(mailbox: &str, fallback: &str) -> String {
    let trimmed = mailbox.trim();
    if trimmed.is_empty() {
        let fallback = fallback.trim();
        if fallback.is_empty() {
            "TEMP".to_string()
        } else {
            fallback.to_string()
        }
    } else {
        trimmed.to_string()
    }
}
