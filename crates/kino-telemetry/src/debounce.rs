//! Post-seek debounce filter
//!
//! Players re-announce buffering and play intent for a few tens of
//! milliseconds after a seek completes, even though nothing new happened.
//! Left alone, every seek would report a spurious buffering/play pair and
//! pollute rebuffer metrics. This filter drops those re-announcements when
//! they land inside a quiet window after the most recent seek completion.

use crate::types::{DiscontinuityReason, RawSignal, SignalKind};
use tracing::debug;

/// Drops play/buffering re-announcements right after a seek completes
#[derive(Debug, Clone)]
pub struct SeekDebounce {
    window_ms: u64,
    /// Observation time of the most recent seek completion, if the window
    /// is open
    seek_completed_at_ms: Option<u64>,
    suppressed: u64,
}

impl SeekDebounce {
    pub fn new(window_ms: u64) -> Self {
        Self {
            window_ms,
            seek_completed_at_ms: None,
            suppressed: 0,
        }
    }

    /// Observe one raw signal; returns it if it should travel downstream.
    pub fn observe(&mut self, signal: RawSignal) -> Option<RawSignal> {
        match &signal.kind {
            SignalKind::SeekProcessed
            | SignalKind::PositionDiscontinuity {
                reason: DiscontinuityReason::Seek,
            } => {
                self.seek_completed_at_ms = Some(signal.observed_at_ms);
            }
            // A new seek supersedes the previous one's window; its own
            // completion will open a fresh one.
            SignalKind::SeekStarted => {
                self.seek_completed_at_ms = None;
            }
            SignalKind::PlayWhenReadyTrue | SignalKind::EnteredBuffering => {
                if self.in_quiet_window(signal.observed_at_ms) {
                    self.suppressed += 1;
                    debug!(
                        signal = signal.kind.name(),
                        observed_at_ms = signal.observed_at_ms,
                        seek_completed_at_ms = ?self.seek_completed_at_ms,
                        "Suppressed post-seek re-announcement"
                    );
                    return None;
                }
            }
            _ => {}
        }
        Some(signal)
    }

    /// True if `at_ms` falls strictly inside the window. Signals observed
    /// before the completion mark (out-of-order delivery inside a burst)
    /// count as inside.
    fn in_quiet_window(&self, at_ms: u64) -> bool {
        match self.seek_completed_at_ms {
            Some(completed) if self.window_ms > 0 => {
                at_ms.saturating_sub(completed) < self.window_ms
            }
            _ => false,
        }
    }

    /// Completion time of the seek whose window is currently open
    pub fn seek_completed_at_ms(&self) -> Option<u64> {
        self.seek_completed_at_ms
    }

    /// Number of signals dropped so far
    pub fn suppressed_count(&self) -> u64 {
        self.suppressed
    }

    pub fn window_ms(&self) -> u64 {
        self.window_ms
    }

    pub fn reset(&mut self) {
        self.seek_completed_at_ms = None;
    }
}
