//! Signal handling (SIGINT/SIGTERM)
//!
//! The first signal cancels the running operation through its
//! [`CancelToken`]. The operation stops at its next cancellation check.
//! A second signal exits the process immediately.

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

use tracing::warn;

use crate::cancel::CancelToken;

/// Exit code used when a second signal forces an immediate exit.
pub const EXIT_CODE_INTERRUPTED: i32 = 130;

/// Action to take after receiving a signal
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalAction {
    /// First signal: cancel cooperatively
    Cancel,
    /// Second signal: exit now
    ImmediateExit,
    /// Third+ signal: ignore
    Ignore,
}

/// Signal counter tied to a cancellation token
#[derive(Debug, Default)]
pub struct SignalState {
    token: CancelToken,
    signal_count: AtomicU8,
}

impl SignalState {
    pub fn new(token: CancelToken) -> Self {
        Self {
            token,
            signal_count: AtomicU8::new(0),
        }
    }

    pub fn signal_count(&self) -> u8 {
        self.signal_count.load(Ordering::SeqCst)
    }

    /// Record a signal and decide what to do about it.
    pub fn handle_signal(&self) -> SignalAction {
        match self.signal_count.fetch_add(1, Ordering::SeqCst) {
            0 => {
                self.token.cancel();
                SignalAction::Cancel
            }
            1 => SignalAction::ImmediateExit,
            _ => SignalAction::Ignore,
        }
    }
}

/// Installs the process signal handler.
pub struct SignalHandler {
    state: Arc<SignalState>,
}

impl SignalHandler {
    pub fn new(token: CancelToken) -> Self {
        Self {
            state: Arc::new(SignalState::new(token)),
        }
    }

    pub fn state(&self) -> Arc<SignalState> {
        Arc::clone(&self.state)
    }

    /// Install handlers for SIGINT and SIGTERM. Call once at startup.
    pub fn install(&self) -> Result<(), ctrlc::Error> {
        let state = Arc::clone(&self.state);
        ctrlc::set_handler(move || match state.handle_signal() {
            SignalAction::Cancel => {
                warn!("received interrupt, cancelling after the current step");
            }
            SignalAction::ImmediateExit => {
                eprintln!("\nReceived second interrupt, exiting immediately");
                std::process::exit(EXIT_CODE_INTERRUPTED);
            }
            SignalAction::Ignore => {}
        })
    }
}
