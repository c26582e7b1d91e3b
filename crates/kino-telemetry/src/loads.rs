//! Segment load accounting

use crate::types::SignalKind;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, trace};

/// Per-session segment load counters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SegmentLoadStats {
    pub started: u64,
    pub completed: u64,
    pub failed: u64,
    pub bytes_loaded: u64,
    /// Completions or failures with no matching start
    pub orphaned: u64,
}

/// Correlates segment load signals by load id
#[derive(Debug, Clone, Default)]
pub struct SegmentLoadTracker {
    pending: HashMap<u64, Option<String>>,
    stats: SegmentLoadStats,
}

impl SegmentLoadTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Account for one signal. Returns false if the signal is not a segment
    /// load signal.
    pub fn observe(&mut self, kind: &SignalKind) -> bool {
        if !kind.is_segment_load() {
            return false;
        }
        match kind {
            SignalKind::SegmentLoadStart { load_id, url } => {
                self.stats.started += 1;
                if self.pending.insert(*load_id, url.clone()).is_some() {
                    debug!(load_id, "Segment load restarted with a reused id");
                }
            }
            SignalKind::SegmentLoadComplete { load_id, bytes } => {
                if self.pending.remove(load_id).is_some() {
                    self.stats.completed += 1;
                    self.stats.bytes_loaded = self.stats.bytes_loaded.saturating_add(*bytes);
                    trace!(load_id, bytes, "Segment loaded");
                } else {
                    self.stats.orphaned += 1;
                    debug!(load_id, "Segment load completed without a start");
                }
            }
            SignalKind::SegmentLoadError { load_id, detail } => {
                match self.pending.remove(load_id) {
                    Some(url) => {
                        self.stats.failed += 1;
                        debug!(load_id, ?url, detail = %detail, "Segment load failed");
                    }
                    None => {
                        self.stats.orphaned += 1;
                        debug!(load_id, detail = %detail, "Segment load failed without a start");
                    }
                }
            }
            _ => {}
        }
        true
    }

    pub fn stats(&self) -> SegmentLoadStats {
        self.stats
    }

    pub fn in_flight(&self) -> usize {
        self.pending.len()
    }
}
