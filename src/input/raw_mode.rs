//! Reference-counted terminal raw mode
//!
//! The terminal is switched to raw mode on the first acquisition and restored
//! on the last release, so nested prompts on one descriptor never fight over
//! terminal attributes. Descriptors that are not terminals (pipes, sockets
//! handed over by the host) still count depth but never touch termios.

use std::cell::RefCell;
use std::fmt;
use std::os::fd::BorrowedFd;
use std::os::unix::io::RawFd;
use std::rc::Rc;

use nix::sys::termios::{self, SetArg, Termios};
use nix::unistd::isatty;
use tracing::{debug, warn};

use super::StreamState;

#[derive(Default)]
pub(super) struct RawModeState {
    depth: u32,
    /// Attributes to restore; held only while raw mode is applied
    saved: Option<Termios>,
}

impl RawModeState {
    pub(super) fn depth(&self) -> u32 {
        self.depth
    }

    pub(super) fn enable(&mut self, fd: RawFd) {
        self.depth += 1;
        if self.depth > 1 {
            return;
        }
        if !isatty(fd).unwrap_or(false) {
            debug!(fd, "not a terminal, raw mode is a no-op");
            return;
        }

        // SAFETY: the descriptor outlives the stream state that refers to it
        let borrowed_fd = unsafe { BorrowedFd::borrow_raw(fd) };
        let original = match termios::tcgetattr(borrowed_fd) {
            Ok(t) => t,
            Err(e) => {
                warn!(fd, error = %e, "tcgetattr failed, leaving terminal untouched");
                return;
            }
        };

        let mut raw = original.clone();
        termios::cfmakeraw(&mut raw);
        match termios::tcsetattr(borrowed_fd, SetArg::TCSANOW, &raw) {
            Ok(()) => {
                debug!(fd, "raw mode applied");
                self.saved = Some(original);
            }
            Err(e) => warn!(fd, error = %e, "tcsetattr failed, leaving terminal untouched"),
        }
    }

    pub(super) fn disable(&mut self, fd: RawFd) {
        if self.depth == 0 {
            return;
        }
        self.depth -= 1;
        if self.depth > 0 {
            return;
        }
        let Some(original) = self.saved.take() else {
            return;
        };

        // SAFETY: see enable()
        let borrowed_fd = unsafe { BorrowedFd::borrow_raw(fd) };
        match termios::tcsetattr(borrowed_fd, SetArg::TCSANOW, &original) {
            Ok(()) => debug!(fd, "terminal attributes restored"),
            Err(e) => warn!(fd, error = %e, "failed to restore terminal attributes"),
        }
    }
}

impl fmt::Debug for RawModeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RawModeState")
            .field("depth", &self.depth)
            .field("applied", &self.saved.is_some())
            .finish()
    }
}

/// RAII guard for raw terminal mode
///
/// Acquiring increments the descriptor's raw-mode depth; dropping the guard
/// decrements it, also on early return or unwinding.
pub struct RawModeGuard {
    state: Rc<RefCell<StreamState>>,
}

impl RawModeGuard {
    pub fn acquire(state: &Rc<RefCell<StreamState>>) -> Self {
        {
            let mut st = state.borrow_mut();
            let fd = st.fd;
            st.raw.enable(fd);
        }
        Self {
            state: Rc::clone(state),
        }
    }
}

impl Drop for RawModeGuard {
    fn drop(&mut self) {
        let mut st = self.state.borrow_mut();
        let fd = st.fd;
        st.raw.disable(fd);
    }
}

impl fmt::Debug for RawModeGuard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RawModeGuard")
            .field("fd", &self.state.borrow().fd)
            .finish()
    }
}
