//! Ad-break coordination
//!
//! Ad SDKs drive the same player instance that plays content, so while a
//! break is active the player's own callbacks are indistinguishable from
//! content callbacks. The coordinator swallows them, remembers any content
//! intent that leaked through, and replays it once the break ends.

use crate::source::PlayerFacts;
use crate::state::{PlaybackState, SeekProgress};
use crate::types::{AdMetadata, EventKind, PlaybackStateKind, SignalKind};
use crate::{Error, Result};
use tracing::{debug, info};

/// Sub-state of the playback state machine active during ad breaks
#[derive(Debug, Clone)]
pub struct AdBreakCoordinator {
    /// Ad captured when the break started
    break_ad: AdMetadata,
    /// Ad currently playing within the pod
    current_ad: AdMetadata,
    /// `adbreakstart` is held back for a paused pre-roll
    start_deferred: bool,
    /// Content state when the break started
    resume_state: PlaybackStateKind,
    breaks_started: u64,
}

impl Default for AdBreakCoordinator {
    fn default() -> Self {
        Self::new()
    }
}

impl AdBreakCoordinator {
    pub fn new() -> Self {
        Self {
            break_ad: AdMetadata::default(),
            current_ad: AdMetadata::default(),
            start_deferred: false,
            resume_state: PlaybackStateKind::Init,
            breaks_started: 0,
        }
    }

    /// Enter an ad break.
    pub(crate) fn start_break(
        &mut self,
        state: &mut PlaybackState,
        ad: Option<&AdMetadata>,
        facts: &dyn PlayerFacts,
        out: &mut Vec<EventKind>,
    ) -> Result<()> {
        if state.in_ad_break {
            return Err(Error::AdBreakAlreadyActive);
        }

        let interrupted_seek = state.current == PlaybackStateKind::Seeking;
        self.break_ad = ad.cloned().unwrap_or_default();
        self.current_ad = self.break_ad.clone();
        self.resume_state = match state.current {
            // An unfinished seek is abandoned by the break
            PlaybackStateKind::Seeking => PlaybackStateKind::Seeked,
            other => other,
        };
        self.breaks_started += 1;

        state.in_ad_break = true;
        state.current = PlaybackStateKind::PlayingAds;
        state.seek = SeekProgress::Idle;

        // A pre-roll loaded before the viewer pressed play: the break is not
        // visible until the ad actually resumes. A break that cuts a reported
        // seek short is always visible.
        if !interrupted_seek && !facts.play_when_ready() && facts.position_ms() == 0 {
            self.start_deferred = true;
            debug!(ad = ?self.break_ad, "Deferring ad break start for paused pre-roll");
            return Ok(());
        }

        info!(ad_id = ?self.break_ad.ad_id, "Ad break started");
        out.push(EventKind::AdBreakStart {
            ad: self.break_ad.clone(),
        });
        Ok(())
    }

    /// Handle an ad sub-event (anything ad-related except break start/end).
    pub(crate) fn on_ad_signal(
        &mut self,
        state: &PlaybackState,
        kind: &SignalKind,
        out: &mut Vec<EventKind>,
    ) -> Result<()> {
        if !state.in_ad_break {
            return Err(Error::AdSignalOutsideBreak {
                signal: kind.name().to_string(),
            });
        }
        if let SignalKind::AdQuartile { n, .. } = kind {
            if !(1..=3).contains(n) {
                return Err(Error::InvalidQuartile(*n));
            }
        }

        if let Some(ad) = ad_of(kind) {
            self.current_ad = ad.clone();
        }

        if self.start_deferred {
            match kind {
                SignalKind::AdPaused { .. } => {
                    debug!("Ignoring ad pause of a deferred pre-roll");
                    return Ok(());
                }
                SignalKind::AdResumed { .. } => {
                    self.start_deferred = false;
                    out.push(EventKind::AdBreakStart {
                        ad: self.break_ad.clone(),
                    });
                    out.push(EventKind::AdPlay {
                        ad: self.current_ad.clone(),
                    });
                    return Ok(());
                }
                _ => {
                    self.start_deferred = false;
                    out.push(EventKind::AdBreakStart {
                        ad: self.break_ad.clone(),
                    });
                }
            }
        }

        let ad = self.current_ad.clone();
        match kind {
            SignalKind::AdRequested { .. } => out.push(EventKind::AdRequest { ad }),
            SignalKind::AdResponded { .. } => out.push(EventKind::AdResponse { ad }),
            SignalKind::AdLoaded { .. } => out.push(EventKind::AdPlay { ad }),
            SignalKind::AdStarted { .. } => out.push(EventKind::AdPlaying { ad }),
            SignalKind::AdPaused { .. } => out.push(EventKind::AdPause { ad }),
            SignalKind::AdResumed { .. } => {
                out.push(EventKind::AdPlay { ad: ad.clone() });
                out.push(EventKind::AdPlaying { ad });
            }
            SignalKind::AdCompleted { .. } => out.push(EventKind::AdEnded { ad }),
            SignalKind::AdQuartile { n: 1, .. } => out.push(EventKind::AdFirstQuartile { ad }),
            SignalKind::AdQuartile { n: 2, .. } => out.push(EventKind::AdMidpoint { ad }),
            SignalKind::AdQuartile { .. } => out.push(EventKind::AdThirdQuartile { ad }),
            SignalKind::AdError { detail, .. } => out.push(EventKind::AdError {
                ad,
                detail: detail.clone(),
            }),
            other => debug!(signal = other.name(), "Not an ad sub-event"),
        }
        Ok(())
    }

    /// Record content intent that leaked through while the ad SDK drives the
    /// player. Nothing is emitted.
    pub(crate) fn intercept_content(
        &mut self,
        state: &mut PlaybackState,
        kind: &SignalKind,
        facts: &dyn PlayerFacts,
    ) {
        let leaked = !facts.is_playing_ad();
        match kind {
            SignalKind::PlayWhenReadyTrue => {
                state.play_when_ready = true;
                if leaked {
                    state.missed_play_event = true;
                }
            }
            SignalKind::PlayWhenReadyFalse => {
                state.play_when_ready = false;
            }
            SignalKind::EnteredBuffering => {
                if leaked && state.play_when_ready {
                    state.missed_play_event = true;
                }
            }
            SignalKind::EnteredReady => {
                if leaked && state.play_when_ready {
                    state.missed_play_event = true;
                    state.missed_playing_event = true;
                }
            }
            other => {
                debug!(signal = other.name(), "Content signal intercepted during ad break");
                return;
            }
        }
        debug!(
            signal = kind.name(),
            leaked,
            missed_play = state.missed_play_event,
            missed_playing = state.missed_playing_event,
            "Content signal captured during ad break"
        );
    }

    /// Leave the ad break, replaying captured content events.
    ///
    /// Leaves `state.current` at the replayed state (or the pre-break state);
    /// the state machine then reconciles it against the player facts.
    pub(crate) fn end_break(
        &mut self,
        state: &mut PlaybackState,
        out: &mut Vec<EventKind>,
    ) -> Result<()> {
        if !state.in_ad_break {
            return Err(Error::AdBreakEndWithoutStart);
        }

        if self.start_deferred {
            debug!("Ad break ended before its deferred start was visible");
            self.start_deferred = false;
        } else {
            out.push(EventKind::AdBreakEnd {
                ad: self.break_ad.clone(),
            });
        }
        state.in_ad_break = false;
        state.current = self.resume_state;

        if state.missed_play_event {
            out.push(EventKind::Play);
            state.play_reported = true;
            state.current = PlaybackStateKind::Play;
        }
        if state.missed_playing_event {
            if !state.missed_play_event && !state.play_reported {
                out.push(EventKind::Play);
                state.play_reported = true;
            }
            out.push(EventKind::Playing);
            state.current = PlaybackStateKind::Playing;
        }
        state.missed_play_event = false;
        state.missed_playing_event = false;

        info!(resume_state = %state.current, "Ad break ended");
        Ok(())
    }

    /// Drop the break without replay because the session terminated.
    pub(crate) fn abandon(&mut self, state: &mut PlaybackState) {
        if state.in_ad_break {
            debug!("Abandoning ad break on terminal signal");
        }
        state.in_ad_break = false;
        state.missed_play_event = false;
        state.missed_playing_event = false;
        self.start_deferred = false;
    }

    pub fn is_start_deferred(&self) -> bool {
        self.start_deferred
    }

    pub fn breaks_started(&self) -> u64 {
        self.breaks_started
    }

    pub fn reset(&mut self) {
        *self = Self::new();
    }
}

fn ad_of(kind: &SignalKind) -> Option<&AdMetadata> {
    match kind {
        SignalKind::AdBreakStart { ad }
        | SignalKind::AdRequested { ad }
        | SignalKind::AdResponded { ad }
        | SignalKind::AdLoaded { ad }
        | SignalKind::AdStarted { ad }
        | SignalKind::AdPaused { ad }
        | SignalKind::AdResumed { ad }
        | SignalKind::AdCompleted { ad }
        | SignalKind::AdQuartile { ad, .. }
        | SignalKind::AdError { ad, .. } => ad.as_ref(),
        _ => None,
    }
}
