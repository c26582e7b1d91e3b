//! Lifecycle auditing of emitted event streams
//!
//! Replays a sequence of domain events and flags anything an analytics
//! backend would consider an implausible playback lifecycle.

use crate::types::{DomainEvent, EventKind};
use serde::{Deserialize, Serialize};

/// Category of lifecycle violation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViolationKind {
    ContentDuringAdBreak,
    AdEventOutsideBreak,
    PlayingBeforeSeeked,
    EventAfterTerminal,
    DuplicateState,
    SequenceNotIncreasing,
    TimestampDecreasing,
}

impl std::fmt::Display for ViolationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ViolationKind::ContentDuringAdBreak => "content event during ad break",
            ViolationKind::AdEventOutsideBreak => "ad event outside ad break",
            ViolationKind::PlayingBeforeSeeked => "playing while seek unresolved",
            ViolationKind::EventAfterTerminal => "event after terminal event",
            ViolationKind::DuplicateState => "repeated state event",
            ViolationKind::SequenceNotIncreasing => "sequence not increasing",
            ViolationKind::TimestampDecreasing => "timestamp decreasing",
        };
        f.write_str(name)
    }
}

/// A single lifecycle violation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Violation {
    pub kind: ViolationKind,
    pub sequence: u64,
    pub event: String,
}

impl std::fmt::Display for Violation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{} {}: {}", self.sequence, self.event, self.kind)
    }
}

/// Checks event streams against the playback lifecycle rules
#[derive(Debug, Clone, Default)]
pub struct LifecycleAuditor {
    in_ad_break: bool,
    seek_pending: bool,
    terminated: bool,
    player_ready_seen: bool,
    last_state_event: Option<&'static str>,
    last_sequence: Option<u64>,
    last_emitted_at_ms: Option<u64>,
    events_seen: u64,
    violations: Vec<Violation>,
}

impl LifecycleAuditor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Audit a complete stream
    pub fn audit<'a>(events: impl IntoIterator<Item = &'a DomainEvent>) -> Vec<Violation> {
        let mut auditor = Self::new();
        for event in events {
            auditor.observe(event);
        }
        auditor.violations
    }

    pub fn observe(&mut self, event: &DomainEvent) {
        self.events_seen += 1;

        if let Some(last) = self.last_sequence {
            if event.sequence <= last {
                self.flag(ViolationKind::SequenceNotIncreasing, event);
            }
        }
        self.last_sequence = Some(event.sequence);

        if let Some(last) = self.last_emitted_at_ms {
            if event.emitted_at_ms < last {
                self.flag(ViolationKind::TimestampDecreasing, event);
            }
        }
        self.last_emitted_at_ms = Some(event.emitted_at_ms);

        if matches!(event.event, EventKind::PlayerReady) {
            // A repeated playerready means the session restarted
            if self.player_ready_seen || self.terminated {
                self.reset_lifecycle();
            }
            self.player_ready_seen = true;
            return;
        }

        if self.terminated {
            self.flag(ViolationKind::EventAfterTerminal, event);
            return;
        }

        match &event.event {
            EventKind::AdBreakStart { .. } => {
                if self.in_ad_break {
                    self.flag(ViolationKind::AdEventOutsideBreak, event);
                }
                self.in_ad_break = true;
                self.seek_pending = false;
                self.last_state_event = None;
            }
            EventKind::AdBreakEnd { .. } => {
                if !self.in_ad_break {
                    self.flag(ViolationKind::AdEventOutsideBreak, event);
                }
                self.in_ad_break = false;
            }
            kind if kind.is_ad() => {
                if !self.in_ad_break {
                    self.flag(ViolationKind::AdEventOutsideBreak, event);
                }
            }
            kind if kind.is_content() => self.observe_content(event),
            kind if kind.is_terminal() => {
                self.terminated = true;
                self.in_ad_break = false;
            }
            _ => {}
        }
    }

    fn observe_content(&mut self, event: &DomainEvent) {
        if self.in_ad_break {
            self.flag(ViolationKind::ContentDuringAdBreak, event);
        }

        match event.event {
            EventKind::Seeking => self.seek_pending = true,
            EventKind::Seeked => self.seek_pending = false,
            EventKind::Playing if self.seek_pending => {
                self.flag(ViolationKind::PlayingBeforeSeeked, event);
            }
            _ => {}
        }

        let name = event.name();
        if matches!(event.event, EventKind::Pause | EventKind::Buffering | EventKind::Playing)
            && self.last_state_event == Some(name)
        {
            self.flag(ViolationKind::DuplicateState, event);
        }
        self.last_state_event = Some(name);
    }

    fn reset_lifecycle(&mut self) {
        self.in_ad_break = false;
        self.seek_pending = false;
        self.terminated = false;
        self.last_state_event = None;
    }

    fn flag(&mut self, kind: ViolationKind, event: &DomainEvent) {
        self.violations.push(Violation {
            kind,
            sequence: event.sequence,
            event: event.name().to_string(),
        });
    }

    pub fn violations(&self) -> &[Violation] {
        &self.violations
    }

    pub fn is_clean(&self) -> bool {
        self.violations.is_empty()
    }

    pub fn events_seen(&self) -> u64 {
        self.events_seen
    }
}
