//! Interrupt-to-main-loop wake flag

use portable_atomic::{AtomicBool, Ordering};

/// "We woke up" flag.
///
/// The button interrupt calls [`WakeSignal::signal`] and nothing else; the
/// sleep routine consumes it with [`WakeSignal::take`] and the control flow
/// then re-reads the pin itself.
pub struct WakeSignal {
    pending: AtomicBool,
}

impl WakeSignal {
    pub const fn new() -> Self {
        Self {
            pending: AtomicBool::new(false),
        }
    }

    pub fn signal(&self) {
        self.pending.store(true, Ordering::Release);
    }

    /// Clear the flag, returning whether it was set
    pub fn take(&self) -> bool {
        self.pending.swap(false, Ordering::AcqRel)
    }

    pub fn is_pending(&self) -> bool {
        self.pending.load(Ordering::Acquire)
    }
}

impl Default for WakeSignal {
    fn default() -> Self {
        Self::new()
    }
}
