//! Playback state machine
//!
//! Turns debounced raw signals into canonical lifecycle events. The machine
//! is synchronous and single-threaded: one signal in, zero or more events
//! out, and the state is only ever mutated while a signal is being applied.
//!
//! ```text
//!            PlayerReady         EnteredBuffering        EnteredReady(pwr)
//!   INIT ──────────────▶ INIT ───────────────────▶ BUFFERING ─────────────▶ PLAYING
//!     │                                               ▲  │                   │  ▲
//!     │ EnteredReady(!pwr)          EnteredBuffering  │  │ EnteredReady(!pwr)│  │
//!     ▼                                               │  ▼                   ▼  │
//!   PAUSED ◀──────────────────────────────────────────┴── PAUSED ◀───────────┘  │
//!     │ SeekStarted                                                             │
//!     ▼          discontinuity (paused)        EnteredReady(pwr)                │
//!   SEEKING ─────────────────────────▶ SEEKED ──────────────────────────────────┘
//!
//!   AdBreakStart ──▶ PLAYING_ADS ── AdBreakEnd ──▶ (replay, then reconcile)
//!   Ended / Error ──▶ ENDED / ERROR (terminal)
//! ```

use crate::ads::AdBreakCoordinator;
use crate::rendition::RenditionTracker;
use crate::source::{PlayerFacts, PlayerPhase};
use crate::types::{
    DiscontinuityReason, EventKind, PlaybackStateKind, RawSignal, Rendition, SignalKind, TrackType,
};
use crate::{Error, Result, TelemetryConfig};
use serde::Serialize;
use tracing::{debug, trace};

/// Progress of the seek currently being tracked
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SeekProgress {
    #[default]
    Idle,
    /// `seeking` was reported, the position has not jumped yet
    InFlight { from_paused: bool },
    /// Position jumped; `seeked` waits for the first ready state
    AwaitingReady,
}

/// Logical playback state of one session
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlaybackState {
    pub current: PlaybackStateKind,
    pub play_when_ready: bool,
    pub last_seeked_at_ms: Option<u64>,
    pub in_ad_break: bool,
    pub missed_play_event: bool,
    pub missed_playing_event: bool,
    pub current_rendition: Option<Rendition>,
    pub has_video_track: bool,
    pub seek: SeekProgress,
    /// `play` was reported and no `pause` has followed
    pub(crate) play_reported: bool,
    pub(crate) player_ready_reported: bool,
}

impl Default for PlaybackState {
    fn default() -> Self {
        Self::new()
    }
}

impl PlaybackState {
    pub fn new() -> Self {
        Self {
            current: PlaybackStateKind::Init,
            play_when_ready: false,
            last_seeked_at_ms: None,
            in_ad_break: false,
            missed_play_event: false,
            missed_playing_event: false,
            current_rendition: None,
            has_video_track: true,
            seek: SeekProgress::Idle,
            play_reported: false,
            player_ready_reported: false,
        }
    }

    fn seek_active(&self) -> bool {
        !matches!(self.seek, SeekProgress::Idle)
    }
}

/// Playback state machine for one session
#[derive(Debug, Clone)]
pub struct PlaybackStateMachine {
    state: PlaybackState,
    ads: Option<AdBreakCoordinator>,
    renditions: RenditionTracker,
}

impl PlaybackStateMachine {
    pub fn new(config: &TelemetryConfig) -> Self {
        Self {
            state: PlaybackState::new(),
            ads: config.ad_tracking.then(AdBreakCoordinator::new),
            renditions: RenditionTracker::new(config.rendition_tracking),
        }
    }

    pub fn state(&self) -> &PlaybackState {
        &self.state
    }

    pub fn renditions(&self) -> &RenditionTracker {
        &self.renditions
    }

    pub fn ads(&self) -> Option<&AdBreakCoordinator> {
        self.ads.as_ref()
    }

    /// Synthesize the opening events for a player that was already playing
    /// when the session attached.
    pub fn bootstrap(&mut self, facts: &dyn PlayerFacts, out: &mut Vec<EventKind>) {
        self.state.player_ready_reported = true;
        self.state.play_reported = true;
        self.state.play_when_ready = facts.play_when_ready();
        out.push(EventKind::PlayerReady);
        out.push(EventKind::Play);
        out.push(EventKind::Buffering);

        if facts.phase() == PlayerPhase::Ready && facts.play_when_ready() {
            self.state.current = PlaybackStateKind::Playing;
            out.push(EventKind::Playing);
        } else {
            self.state.current = PlaybackStateKind::Buffering;
        }
        debug!(state = %self.state.current, "Bootstrapped session from player facts");
    }

    /// Apply one debounced signal.
    ///
    /// On error the state is unchanged and `out` is untouched.
    pub fn apply(
        &mut self,
        signal: &RawSignal,
        facts: &dyn PlayerFacts,
        out: &mut Vec<EventKind>,
    ) -> Result<()> {
        let kind = &signal.kind;

        if self.state.current.is_terminal() {
            return Err(Error::SignalAfterTerminal {
                signal: kind.name().to_string(),
                state: self.state.current.to_string(),
            });
        }

        if kind.is_ad() {
            return self.apply_ad(kind, facts, out);
        }

        if self.state.in_ad_break {
            return self.apply_during_break(kind, facts, out);
        }

        match kind {
            SignalKind::PlayerReady => self.on_player_ready(out),
            SignalKind::PlayWhenReadyTrue => self.state.play_when_ready = true,
            SignalKind::PlayWhenReadyFalse => self.state.play_when_ready = false,
            SignalKind::EnteredBuffering => self.on_entered_buffering(out),
            SignalKind::EnteredReady => self.on_entered_ready(out),
            SignalKind::Ended => self.terminate(PlaybackStateKind::Ended, EventKind::Ended, out),
            SignalKind::Error(error) => {
                self.terminate(PlaybackStateKind::Error, EventKind::error(error), out)
            }
            SignalKind::SeekStarted => self.on_seek_started(out),
            SignalKind::SeekProcessed => trace!("Seek processed"),
            SignalKind::PositionDiscontinuity { reason } => {
                self.on_discontinuity(*reason, signal.observed_at_ms, out)
            }
            SignalKind::FormatChanged(format) => {
                if format.track == TrackType::Video {
                    self.state.has_video_track = true;
                }
                if self.renditions.on_format_observed(format) {
                    let rendition = Rendition::from(format);
                    self.state.current_rendition = Some(rendition.clone());
                    out.push(EventKind::RenditionChange { rendition });
                }
            }
            SignalKind::TracksChanged { has_video } => self.state.has_video_track = *has_video,
            other => debug!(signal = other.name(), "Signal not handled by the state machine"),
        }
        Ok(())
    }

    fn apply_ad(
        &mut self,
        kind: &SignalKind,
        facts: &dyn PlayerFacts,
        out: &mut Vec<EventKind>,
    ) -> Result<()> {
        let Some(ads) = self.ads.as_mut() else {
            debug!(signal = kind.name(), "Ad tracking disabled, dropping ad signal");
            return Ok(());
        };

        match kind {
            SignalKind::AdBreakStart { ad } => {
                ads.start_break(&mut self.state, ad.as_ref(), facts, out)
            }
            SignalKind::AdBreakEnd => {
                ads.end_break(&mut self.state, out)?;
                self.reconcile(facts, out);
                Ok(())
            }
            other => ads.on_ad_signal(&self.state, other, out),
        }
    }

    fn apply_during_break(
        &mut self,
        kind: &SignalKind,
        facts: &dyn PlayerFacts,
        out: &mut Vec<EventKind>,
    ) -> Result<()> {
        match kind {
            SignalKind::Ended => self.terminate(PlaybackStateKind::Ended, EventKind::Ended, out),
            SignalKind::Error(error) => {
                self.terminate(PlaybackStateKind::Error, EventKind::error(error), out)
            }
            // Session readiness is not a content transition
            SignalKind::PlayerReady => self.on_player_ready(out),
            other => {
                if let Some(ads) = self.ads.as_mut() {
                    ads.intercept_content(&mut self.state, other, facts);
                }
            }
        }
        Ok(())
    }

    /// Re-enter the transition table from the player's current situation
    fn reconcile(&mut self, facts: &dyn PlayerFacts, out: &mut Vec<EventKind>) {
        self.state.play_when_ready = facts.play_when_ready();
        match facts.phase() {
            PlayerPhase::Ready => self.on_entered_ready(out),
            PlayerPhase::Buffering => self.on_entered_buffering(out),
            PlayerPhase::Idle | PlayerPhase::Ended => {}
        }
    }

    fn on_player_ready(&mut self, out: &mut Vec<EventKind>) {
        if self.state.player_ready_reported {
            debug!("Duplicate player ready");
            return;
        }
        self.state.player_ready_reported = true;
        out.push(EventKind::PlayerReady);
    }

    fn on_entered_buffering(&mut self, out: &mut Vec<EventKind>) {
        if self.state.seek_active() {
            debug!(seek = ?self.state.seek, "Buffering attributed to seek");
            return;
        }

        let previous = self.state.current;
        let paused = matches!(previous, PlaybackStateKind::Paused | PlaybackStateKind::Seeked);
        if !self.state.play_when_ready && paused {
            // Loading while paused is not a new state
            trace!(state = %previous, "Buffering while paused");
            return;
        }

        if previous != PlaybackStateKind::Buffering {
            out.push(EventKind::Buffering);
        }
        self.state.current = PlaybackStateKind::Buffering;

        if self.state.play_when_ready {
            if !self.state.play_reported {
                out.push(EventKind::Play);
                self.state.play_reported = true;
            }
        } else {
            out.push(EventKind::Pause);
            self.state.play_reported = false;
            self.state.current = PlaybackStateKind::Paused;
        }
    }

    fn on_entered_ready(&mut self, out: &mut Vec<EventKind>) {
        match self.state.seek {
            SeekProgress::InFlight { .. } => {
                debug!("Ready before the seek position was applied");
                return;
            }
            SeekProgress::AwaitingReady => {
                self.state.seek = SeekProgress::Idle;
                self.state.current = PlaybackStateKind::Seeked;
                out.push(EventKind::Seeked);
                if self.state.play_when_ready {
                    self.enter_playing(out);
                }
                return;
            }
            SeekProgress::Idle => {}
        }

        if self.state.play_when_ready {
            if self.state.current != PlaybackStateKind::Playing {
                self.enter_playing(out);
            }
        } else if !matches!(
            self.state.current,
            PlaybackStateKind::Paused | PlaybackStateKind::Seeked
        ) {
            self.state.current = PlaybackStateKind::Paused;
            self.state.play_reported = false;
            out.push(EventKind::Pause);
        }
    }

    fn enter_playing(&mut self, out: &mut Vec<EventKind>) {
        if !self.state.play_reported {
            out.push(EventKind::Play);
            self.state.play_reported = true;
        }
        self.state.current = PlaybackStateKind::Playing;
        out.push(EventKind::Playing);
    }

    fn on_seek_started(&mut self, out: &mut Vec<EventKind>) {
        match self.state.seek {
            SeekProgress::InFlight { .. } => {
                debug!("Seek restarted before completing");
            }
            SeekProgress::AwaitingReady => {
                // Collapse into one seek; the paused flag no longer matters
                // because the position already jumped once.
                debug!("Seek restarted while awaiting ready");
                self.state.seek = SeekProgress::InFlight { from_paused: false };
            }
            SeekProgress::Idle => {
                let from_paused = match self.state.current {
                    PlaybackStateKind::Paused => true,
                    PlaybackStateKind::Seeked => !self.state.play_when_ready,
                    _ => false,
                };
                self.state.seek = SeekProgress::InFlight { from_paused };
                self.state.current = PlaybackStateKind::Seeking;
                out.push(EventKind::Seeking);
            }
        }
    }

    fn on_discontinuity(
        &mut self,
        reason: DiscontinuityReason,
        observed_at_ms: u64,
        out: &mut Vec<EventKind>,
    ) {
        if reason != DiscontinuityReason::Seek {
            trace!(?reason, "Position discontinuity ignored");
            return;
        }
        self.state.last_seeked_at_ms = Some(observed_at_ms);

        match self.state.seek {
            SeekProgress::InFlight { from_paused } => {
                if from_paused || !self.state.has_video_track {
                    // No frame will be rendered to wait for
                    self.state.seek = SeekProgress::Idle;
                    self.state.current = PlaybackStateKind::Seeked;
                    out.push(EventKind::Seeked);
                } else {
                    self.state.seek = SeekProgress::AwaitingReady;
                }
            }
            SeekProgress::AwaitingReady => {
                trace!("Additional seek discontinuity while awaiting ready");
            }
            SeekProgress::Idle => {
                debug!("Seek discontinuity without a seek in progress");
            }
        }
    }

    fn terminate(&mut self, terminal: PlaybackStateKind, event: EventKind, out: &mut Vec<EventKind>) {
        if let Some(ads) = self.ads.as_mut() {
            ads.abandon(&mut self.state);
        }
        self.state.seek = SeekProgress::Idle;
        self.state.current = terminal;
        out.push(event);
    }

    /// Start over for a new video on the same player
    pub fn reset(&mut self) {
        self.state = PlaybackState::new();
        if let Some(ads) = self.ads.as_mut() {
            ads.reset();
        }
        self.renditions.reset();
    }
}
