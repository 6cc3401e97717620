//! Push signal: tells the calling automation that local files changed.

use std::io::{self, Write};

/// Marker written to stdout when a commit/push is required.
pub const PUSH_MARKER: &str = "push::true";

/// Receiver of "push required" notifications.
pub trait PushSignal {
    /// Called after every change that needs committing.
    fn push_required(&mut self);
}

/// Writes [`PUSH_MARKER`] to stdout once per run.
#[derive(Debug, Default)]
pub struct StdoutSignal {
    emitted: bool,
}

impl StdoutSignal {
    /// Create a signal that has not fired yet.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the marker has been written.
    pub fn emitted(&self) -> bool {
        self.emitted
    }
}

impl PushSignal for StdoutSignal {
    fn push_required(&mut self) {
        if self.emitted {
            return;
        }
        let mut stdout = io::stdout().lock();
        if let Err(e) = writeln!(stdout, "{PUSH_MARKER}").and_then(|()| stdout.flush()) {
            log::error!("Failed to write push signal: {e}");
            return;
        }
        self.emitted = true;
    }
}

/// Counts notifications instead of printing them.
#[derive(Debug, Default)]
pub struct CountingSignal {
    /// Notifications received.
    pub count: usize,
}

impl PushSignal for CountingSignal {
    fn push_required(&mut self) {
        self.count += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stdout_signal_fires_once() {
        let mut signal = StdoutSignal::new();
        assert!(!signal.emitted());
        signal.push_required();
        signal.push_required();
        assert!(signal.emitted());
    }

    #[test]
    fn test_counting_signal() {
        let mut signal = CountingSignal::default();
        signal.push_required();
        signal.push_required();
        assert_eq!(signal.count, 2);
    }
}
