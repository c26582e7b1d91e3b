//! Signal normalization pipeline
//!
//! Raw signals flow through the debounce filter into the playback state
//! machine. Whatever the machine emits is stamped with a session id, a
//! strictly increasing sequence number and a non-decreasing timestamp.

use crate::debounce::SeekDebounce;
use crate::loads::{SegmentLoadStats, SegmentLoadTracker};
use crate::source::PlayerFacts;
use crate::state::{PlaybackState, PlaybackStateMachine};
use crate::types::{DomainEvent, EventKind, RawSignal, SessionId, SignalKind};
use crate::TelemetryConfig;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

/// Pipeline counters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PipelineStats {
    pub signals_received: u64,
    /// Dropped by the debounce filter
    pub signals_suppressed: u64,
    /// Dropped as internally inconsistent
    pub signals_dropped: u64,
    pub events_emitted: u64,
}

/// Debounce filter, state machine and event stamping for one session
#[derive(Debug, Clone)]
pub struct Normalizer {
    session_id: SessionId,
    debounce: SeekDebounce,
    machine: PlaybackStateMachine,
    loads: SegmentLoadTracker,
    sequence: u64,
    last_emitted_at_ms: u64,
    stats: PipelineStats,
}

impl Normalizer {
    pub fn new(session_id: SessionId, config: &TelemetryConfig) -> Self {
        Self {
            session_id,
            debounce: SeekDebounce::new(config.seek_quiet_window_ms),
            machine: PlaybackStateMachine::new(config),
            loads: SegmentLoadTracker::new(),
            sequence: 0,
            last_emitted_at_ms: 0,
            stats: PipelineStats::default(),
        }
    }

    pub fn session_id(&self) -> SessionId {
        self.session_id
    }

    /// Synthesize bootstrap events for a player already in progress
    pub fn bootstrap(&mut self, facts: &dyn PlayerFacts, at_ms: u64) -> Vec<DomainEvent> {
        let mut out = Vec::new();
        self.machine.bootstrap(facts, &mut out);
        self.stamp(out, at_ms)
    }

    /// Process one raw signal and return the events it produced, in order.
    pub fn process(&mut self, signal: RawSignal, facts: &dyn PlayerFacts) -> Vec<DomainEvent> {
        self.stats.signals_received += 1;

        // Load accounting runs even while ads play and never emits
        if self.loads.observe(&signal.kind) {
            return Vec::new();
        }

        // Only a re-announced play intent is noise; a change of intent always
        // reaches the machine
        let intent_change = matches!(signal.kind, SignalKind::PlayWhenReadyTrue)
            && !self.machine.state().play_when_ready;
        let signal = if intent_change {
            signal
        } else {
            let Some(signal) = self.debounce.observe(signal) else {
                self.stats.signals_suppressed += 1;
                return Vec::new();
            };
            signal
        };

        let mut out = Vec::new();
        if let Err(e) = self.machine.apply(&signal, facts, &mut out) {
            self.stats.signals_dropped += 1;
            warn!(
                session_id = %self.session_id,
                signal = signal.kind.name(),
                observed_at_ms = signal.observed_at_ms,
                code = e.error_code(),
                error = %e,
                "Dropping inconsistent signal"
            );
            return Vec::new();
        }

        self.stamp(out, signal.observed_at_ms)
    }

    fn stamp(&mut self, events: Vec<EventKind>, observed_at_ms: u64) -> Vec<DomainEvent> {
        if events.is_empty() {
            return Vec::new();
        }
        let emitted_at_ms = observed_at_ms.max(self.last_emitted_at_ms);
        self.last_emitted_at_ms = emitted_at_ms;

        events
            .into_iter()
            .map(|event| {
                self.sequence += 1;
                self.stats.events_emitted += 1;
                if event.is_terminal() {
                    info!(
                        session_id = %self.session_id,
                        event = event.name(),
                        "Session reached terminal event"
                    );
                }
                DomainEvent {
                    id: Uuid::new_v4(),
                    session_id: self.session_id,
                    sequence: self.sequence,
                    emitted_at_ms,
                    event,
                }
            })
            .collect()
    }

    /// Reset playback tracking for new content. Sequence numbers, timestamps
    /// and counters carry on.
    pub fn restart(&mut self) {
        self.debounce.reset();
        self.machine.reset();
        info!(session_id = %self.session_id, sequence = self.sequence, "Session restarted");
    }

    pub fn state(&self) -> &PlaybackState {
        self.machine.state()
    }

    pub fn machine(&self) -> &PlaybackStateMachine {
        &self.machine
    }

    pub fn stats(&self) -> PipelineStats {
        self.stats
    }

    pub fn load_stats(&self) -> SegmentLoadStats {
        self.loads.stats()
    }

    pub fn loads(&self) -> &SegmentLoadTracker {
        &self.loads
    }
}
