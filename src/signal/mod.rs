//! Signal handling for graceful shutdown (SIGINT/SIGTERM)
//!
//! On the first signal the pipeline stops dispatching new builds and asks
//! running toolchain invocations to terminate; the run then finishes with a
//! cancelled summary. A second signal exits immediately.

use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::Arc;

/// Shared cancellation flag checked by build workers.
///
/// Cloning is cheap; all clones observe the same flag.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag {
    cancelled: Arc<AtomicBool>,
}

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation of all in-flight and pending builds.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// Action taken for a received signal
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalAction {
    /// First signal: cancel the run gracefully
    InitiateCancellation,
    /// Second signal: exit immediately
    ImmediateExit,
    /// Third and later: ignore
    Ignore,
}

/// Signal handler state shared with the ctrlc callback
#[derive(Debug, Default)]
pub struct SignalState {
    cancel: CancelFlag,
    immediate_exit: AtomicBool,
    signal_count: AtomicU8,
}

impl SignalState {
    pub fn new() -> Self {
        Self::default()
    }

    /// The cancel flag to hand to the build pool.
    pub fn cancel_flag(&self) -> CancelFlag {
        self.cancel.clone()
    }

    pub fn is_immediate_exit(&self) -> bool {
        self.immediate_exit.load(Ordering::SeqCst)
    }

    pub fn signal_count(&self) -> u8 {
        self.signal_count.load(Ordering::SeqCst)
    }

    /// Record one received signal and decide what to do about it.
    pub fn handle_signal(&self) -> SignalAction {
        let count = self.signal_count.fetch_add(1, Ordering::SeqCst);
        if count == 0 {
            self.cancel.cancel();
            SignalAction::InitiateCancellation
        } else if count == 1 {
            self.immediate_exit.store(true, Ordering::SeqCst);
            SignalAction::ImmediateExit
        } else {
            SignalAction::Ignore
        }
    }
}

/// Install SIGINT/SIGTERM handlers wired to the given state.
///
/// Must be called at most once per process.
pub fn install(state: Arc<SignalState>) -> Result<(), ctrlc::Error> {
    ctrlc::set_handler(move || match state.handle_signal() {
        SignalAction::InitiateCancellation => {
            eprintln!("\nReceived interrupt, cancelling running builds...");
        }
        SignalAction::ImmediateExit => {
            eprintln!("\nReceived second interrupt, exiting immediately");
            std::process::exit(crate::summary::ExitCode::Cancelled.as_i32());
        }
        SignalAction::Ignore => {}
    })
}
