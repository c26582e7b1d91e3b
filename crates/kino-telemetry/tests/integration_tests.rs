//! Integration tests for Kino Telemetry

use kino_telemetry::{
    AdMetadata, DecoderFailure, DiscontinuityReason, DomainEvent, LifecycleAuditor, MemorySink,
    Normalizer, PlaybackStateKind, PlayerError, PlayerErrorCategory, PlayerPhase, PlayerSnapshot,
    RawSignal, ReplaySource, SeekProgress, SessionId, SharedPlayerFacts, SignalKind,
    TelemetryConfig, TelemetrySession,
};
use std::sync::Arc;
use tokio_test::{assert_err, assert_ok};

// =============================================================================
// Helpers
// =============================================================================

/// Feeds signals 10ms apart through a normalizer, updating facts as it goes
struct Script {
    normalizer: Normalizer,
    facts: PlayerSnapshot,
    clock: u64,
    events: Vec<DomainEvent>,
}

impl Script {
    fn new() -> Self {
        Self::with_config(TelemetryConfig::default())
    }

    fn with_config(config: TelemetryConfig) -> Self {
        Self {
            normalizer: Normalizer::new(SessionId::new(), &config),
            facts: PlayerSnapshot::default(),
            clock: 0,
            events: Vec::new(),
        }
    }

    fn at(&mut self, at_ms: u64, kind: SignalKind) -> &mut Self {
        self.clock = at_ms;
        let events = self
            .normalizer
            .process(RawSignal::new(kind, at_ms), &self.facts);
        self.events.extend(events);
        self
    }

    fn then(&mut self, kind: SignalKind) -> &mut Self {
        let next = self.clock + 10;
        self.at(next, kind)
    }

    fn names(&self) -> Vec<&'static str> {
        self.events.iter().map(DomainEvent::name).collect()
    }

    fn take_names(&mut self) -> Vec<&'static str> {
        let names = self.names();
        self.events.clear();
        names
    }

    fn start_playback(&mut self) {
        self.facts.play_when_ready = true;
        self.then(SignalKind::PlayerReady)
            .then(SignalKind::PlayWhenReadyTrue)
            .then(SignalKind::EnteredBuffering)
            .then(SignalKind::EnteredReady);
        self.facts.phase = PlayerPhase::Ready;
        self.facts.position_ms = 5_000;
        self.events.clear();
    }
}

fn seek_jump() -> SignalKind {
    SignalKind::PositionDiscontinuity {
        reason: DiscontinuityReason::Seek,
    }
}

// =============================================================================
// Lifecycle Scenarios
// =============================================================================

#[test]
fn test_scenario_normal_start() {
    let mut script = Script::new();
    script
        .then(SignalKind::PlayerReady)
        .then(SignalKind::PlayWhenReadyTrue)
        .then(SignalKind::EnteredBuffering)
        .then(SignalKind::EnteredReady);
    assert_eq!(script.names(), vec!["playerready", "buffering", "play", "playing"]);
}

#[test]
fn test_scenario_seek_while_playing() {
    let mut script = Script::new();
    script.start_playback();
    script
        .at(10_000, SignalKind::SeekStarted)
        .at(10_020, seek_jump())
        .at(10_040, SignalKind::EnteredBuffering)
        .at(10_600, SignalKind::EnteredReady);

    let names = script.names();
    assert_eq!(names, vec!["seeking", "seeked", "playing"]);
    assert!(!names.contains(&"buffering"));
    assert_eq!(script.normalizer.stats().signals_suppressed, 1);
}

#[test]
fn test_buffering_after_quiet_window_is_reported() {
    let mut script = Script::new();
    script.start_playback();
    script
        .at(10_000, SignalKind::SeekStarted)
        .at(10_020, seek_jump())
        .at(10_400, SignalKind::EnteredReady)
        .at(11_000, SignalKind::EnteredBuffering)
        .at(11_500, SignalKind::EnteredReady);
    assert_eq!(
        script.names(),
        vec!["seeking", "seeked", "playing", "buffering", "playing"]
    );
}

#[test]
fn test_second_seek_inside_quiet_window() {
    let mut script = Script::new();
    script.start_playback();
    script
        .at(10_000, SignalKind::SeekStarted)
        .at(10_020, seek_jump())
        .at(10_030, SignalKind::SeekProcessed)
        .at(10_100, SignalKind::SeekStarted)
        .at(10_120, seek_jump())
        .at(10_130, SignalKind::SeekProcessed)
        .at(10_200, SignalKind::EnteredBuffering)
        .at(10_700, SignalKind::EnteredReady);

    // Both seeks collapse into one seeking/seeked pair; the buffering still
    // falls inside the window of the second completion
    assert_eq!(script.names(), vec!["seeking", "seeked", "playing"]);
}

#[test]
fn test_scenario_ad_break_replays_leaked_intent() {
    let mut script = Script::new();
    script.start_playback();

    script.facts.playing_ad = true;
    script
        .then(SignalKind::AdBreakStart {
            ad: Some(AdMetadata::new("midroll-1", "creative-9")),
        })
        .then(SignalKind::AdLoaded { ad: None })
        .then(SignalKind::EnteredBuffering)
        .then(SignalKind::AdStarted { ad: None })
        .then(SignalKind::PlayWhenReadyFalse)
        .then(SignalKind::EnteredReady)
        .then(SignalKind::AdQuartile { n: 1, ad: None })
        .then(SignalKind::AdQuartile { n: 2, ad: None })
        .then(SignalKind::AdQuartile { n: 3, ad: None })
        .then(SignalKind::AdCompleted { ad: None });

    script.facts.playing_ad = false;
    script
        .then(SignalKind::PlayWhenReadyTrue)
        .then(SignalKind::EnteredReady)
        .then(SignalKind::AdBreakEnd);

    assert_eq!(
        script.names(),
        vec![
            "adbreakstart",
            "adplay",
            "adplaying",
            "adfirstquartile",
            "admidpoint",
            "adthirdquartile",
            "adended",
            "adbreakend",
            "play",
            "playing"
        ]
    );
    let state = script.normalizer.state();
    assert!(!state.in_ad_break);
    assert!(!state.missed_play_event);
    assert!(!state.missed_playing_event);
    assert_eq!(state.current, PlaybackStateKind::Playing);
}

#[test]
fn test_paused_preroll() {
    let mut script = Script::new();
    script.then(SignalKind::PlayerReady);
    script.facts.playing_ad = true;
    script
        .then(SignalKind::AdBreakStart { ad: None })
        .then(SignalKind::AdPaused { ad: None })
        .then(SignalKind::AdPaused { ad: None });
    assert_eq!(script.take_names(), vec!["playerready"]);

    // Viewer presses play
    script.facts.play_when_ready = true;
    script
        .then(SignalKind::AdResumed { ad: None })
        .then(SignalKind::AdCompleted { ad: None });
    assert_eq!(script.take_names(), vec!["adbreakstart", "adplay", "adended"]);
}

#[test]
fn test_preroll_start_flushed_by_other_ad_event() {
    let mut script = Script::new();
    script.then(SignalKind::PlayerReady);
    script.facts.playing_ad = true;
    script
        .then(SignalKind::AdBreakStart { ad: None })
        .then(SignalKind::AdLoaded { ad: None })
        .then(SignalKind::AdStarted { ad: None });
    assert_eq!(
        script.names(),
        vec!["playerready", "adbreakstart", "adplay", "adplaying"]
    );
}

#[test]
fn test_scenario_decoder_error_is_terminal() {
    let mut script = Script::new();
    script.start_playback();

    let error = PlayerError::decoder(DecoderFailure::Missing, "video/hevc");
    script
        .then(SignalKind::Error(error))
        .then(SignalKind::PlayWhenReadyTrue)
        .then(SignalKind::EnteredBuffering)
        .then(SignalKind::EnteredReady)
        .then(SignalKind::Ended);

    assert_eq!(script.names(), vec!["error"]);
    let json = serde_json::to_value(&script.events[0]).unwrap();
    assert_eq!(json["event"], "error");
    assert_eq!(json["category"], "renderer");
    assert_eq!(json["code"], PlayerErrorCategory::Renderer.code());
    assert_eq!(json["detail"], "No decoder for video/hevc");
    assert_eq!(script.normalizer.stats().signals_dropped, 4);
}

#[test]
fn test_error_during_ad_break_is_terminal() {
    let mut script = Script::new();
    script.start_playback();
    script.facts.playing_ad = true;

    let error = PlayerError::new(PlayerErrorCategory::Source, "Response code: 404");
    script
        .then(SignalKind::AdBreakStart { ad: None })
        .then(SignalKind::AdStarted { ad: None })
        .then(SignalKind::Error(error))
        .then(SignalKind::AdCompleted { ad: None })
        .then(SignalKind::AdBreakEnd);

    assert_eq!(script.names(), vec!["adbreakstart", "adplaying", "error"]);
    let state = script.normalizer.state();
    assert_eq!(state.current, PlaybackStateKind::Error);
    assert!(!state.in_ad_break);
    assert!(LifecycleAuditor::audit(&script.events).is_empty());
}

#[test]
fn test_error_mid_seek_is_terminal() {
    let mut script = Script::new();
    script.start_playback();

    let error = PlayerError::new(PlayerErrorCategory::Io, "Connection reset");
    script
        .at(10_000, SignalKind::SeekStarted)
        .at(10_010, SignalKind::Error(error))
        .at(10_020, seek_jump())
        .at(10_400, SignalKind::EnteredReady);

    assert_eq!(script.names(), vec!["seeking", "error"]);
    let state = script.normalizer.state();
    assert_eq!(state.current, PlaybackStateKind::Error);
    assert_eq!(state.seek, SeekProgress::Idle);
    assert_eq!(script.normalizer.stats().signals_dropped, 2);
}

#[test]
fn test_buffering_while_paused_reported_once() {
    let mut script = Script::new();
    script
        .then(SignalKind::PlayerReady)
        .then(SignalKind::EnteredBuffering)
        .then(SignalKind::EnteredBuffering)
        .then(SignalKind::EnteredBuffering)
        .then(SignalKind::EnteredReady)
        .then(SignalKind::EnteredBuffering);

    assert_eq!(script.names(), vec!["playerready", "buffering", "pause"]);
    assert!(LifecycleAuditor::audit(&script.events).is_empty());
}

#[test]
fn test_play_pressed_right_after_paused_seek() {
    let mut script = Script::new();
    script.start_playback();
    script.facts.play_when_ready = false;
    script
        .at(6_000, SignalKind::PlayWhenReadyFalse)
        .at(6_010, SignalKind::EnteredReady);
    assert_eq!(script.take_names(), vec!["pause"]);

    script
        .at(8_000, SignalKind::SeekStarted)
        .at(8_010, seek_jump())
        .at(8_020, SignalKind::SeekProcessed);
    script.facts.play_when_ready = true;
    script
        .at(8_100, SignalKind::PlayWhenReadyTrue)
        .at(8_150, SignalKind::EnteredBuffering)
        .at(8_400, SignalKind::EnteredReady)
        .at(12_000, SignalKind::EnteredBuffering)
        .at(12_300, SignalKind::EnteredReady);

    assert_eq!(
        script.names(),
        vec!["seeking", "seeked", "play", "playing", "buffering", "playing"]
    );
    assert!(script.normalizer.state().play_when_ready);
    assert_eq!(script.normalizer.state().current, PlaybackStateKind::Playing);
}

#[test]
fn test_error_code_names_classified() {
    let error = PlayerError::from_code_name("ERROR_CODE_IO_BAD_HTTP_STATUS", "Response code: 404");
    assert_eq!(error.category, PlayerErrorCategory::Source);
    let error = PlayerError::from_code_name("ERROR_CODE_DRM_LICENSE_ACQUISITION_FAILED", "denied");
    assert_eq!(error.category, PlayerErrorCategory::Drm);
}

#[test]
fn test_rendition_changes_only_on_switch() {
    let mut script = Script::new();
    script.start_playback();
    let format = |bitrate: u64, height: u32| {
        SignalKind::FormatChanged(kino_telemetry::MediaFormat {
            mime_type: Some("video/avc".into()),
            container_mime: Some("application/x-mpegURL".into()),
            bitrate: Some(bitrate),
            width: Some(height * 16 / 9),
            height: Some(height),
            ..Default::default()
        })
    };
    script
        .then(format(800_000, 360))
        .then(format(800_000, 360))
        .then(format(800_000, 360))
        .then(format(3_000_000, 1080))
        .then(format(3_000_000, 1080));
    assert_eq!(script.names(), vec!["renditionchange", "renditionchange"]);
    assert_eq!(
        script.normalizer.machine().renditions().container_mime(),
        Some("application/x-mpegURL")
    );
}

#[test]
fn test_rendition_tracking_disabled() {
    let mut script = Script::with_config(TelemetryConfig {
        rendition_tracking: false,
        ..Default::default()
    });
    script.start_playback();
    script.then(SignalKind::FormatChanged(kino_telemetry::MediaFormat {
        bitrate: Some(800_000),
        width: Some(640),
        height: Some(360),
        ..Default::default()
    }));
    assert!(script.names().is_empty());
}

// =============================================================================
// Lifecycle Properties
// =============================================================================

/// Small deterministic generator so property runs are reproducible
struct Lcg(u64);

impl Lcg {
    fn next(&mut self) -> u64 {
        self.0 = self.0.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
        self.0 >> 33
    }

    fn pick<T: Clone>(&mut self, items: &[T]) -> T {
        items[(self.next() as usize) % items.len()].clone()
    }
}

fn signal_palette() -> Vec<SignalKind> {
    vec![
        SignalKind::PlayerReady,
        SignalKind::PlayWhenReadyTrue,
        SignalKind::PlayWhenReadyFalse,
        SignalKind::EnteredBuffering,
        SignalKind::EnteredReady,
        SignalKind::EnteredReady,
        SignalKind::SeekStarted,
        SignalKind::SeekProcessed,
        seek_jump(),
        SignalKind::PositionDiscontinuity {
            reason: DiscontinuityReason::AutoTransition,
        },
        SignalKind::TracksChanged { has_video: true },
        SignalKind::AdBreakStart { ad: None },
        SignalKind::AdBreakEnd,
        SignalKind::AdLoaded { ad: None },
        SignalKind::AdStarted { ad: None },
        SignalKind::AdPaused { ad: None },
        SignalKind::AdResumed { ad: None },
        SignalKind::AdCompleted { ad: None },
        SignalKind::AdQuartile { n: 2, ad: None },
        SignalKind::SegmentLoadStart { load_id: 1, url: None },
        SignalKind::SegmentLoadComplete { load_id: 1, bytes: 100 },
    ]
}

#[test]
fn test_random_sequences_keep_lifecycle_invariants() {
    let palette = signal_palette();

    for seed in 0..200u64 {
        let mut rng = Lcg(seed);
        let mut script = Script::new();
        let mut at = 0;

        for _ in 0..120 {
            at += rng.next() % 400;
            script.facts.play_when_ready = rng.next() % 2 == 0;
            script.facts.playing_ad = rng.next() % 3 == 0;
            script.facts.position_ms = at;
            script.facts.phase = if rng.next() % 2 == 0 {
                PlayerPhase::Ready
            } else {
                PlayerPhase::Buffering
            };
            // Errors are rare so most runs exercise a long lifecycle
            let kind = if rng.next() % 100 == 0 {
                SignalKind::Error(PlayerError::new(PlayerErrorCategory::Unexpected, "fault"))
            } else {
                rng.pick(&palette)
            };
            script.at(at, kind);

            let state = script.normalizer.state();
            assert!(
                !(state.in_ad_break && state.current == PlaybackStateKind::Seeking),
                "seed {seed}: seeking during ad break"
            );
            if !state.in_ad_break {
                assert!(!state.missed_play_event, "seed {seed}: stale missed play flag");
                assert!(!state.missed_playing_event, "seed {seed}: stale missed playing flag");
            }
        }

        let violations = LifecycleAuditor::audit(&script.events);
        assert!(
            violations.is_empty(),
            "seed {seed}: {:?}\nevents: {:?}",
            violations,
            script.names()
        );
    }
}

/// Signals around pausing, seeking and resuming, delivered in tight bursts
fn pause_seek_palette() -> Vec<SignalKind> {
    vec![
        SignalKind::PlayWhenReadyTrue,
        SignalKind::PlayWhenReadyFalse,
        SignalKind::EnteredBuffering,
        SignalKind::EnteredBuffering,
        SignalKind::EnteredReady,
        SignalKind::SeekStarted,
        SignalKind::SeekProcessed,
        seek_jump(),
    ]
}

#[test]
fn test_random_pause_and_seek_bursts_track_intent() {
    let palette = pause_seek_palette();

    for seed in 0..200u64 {
        let mut rng = Lcg(seed ^ 0xbeef);
        let mut script = Script::new();
        script.then(SignalKind::PlayerReady);
        let mut at = script.clock;
        let mut intent = false;

        for _ in 0..150 {
            at += rng.next() % 200;
            let kind = rng.pick(&palette);
            match kind {
                SignalKind::PlayWhenReadyTrue => intent = true,
                SignalKind::PlayWhenReadyFalse => intent = false,
                _ => {}
            }
            script.facts.play_when_ready = intent;
            let ready = kind == SignalKind::EnteredReady;
            script.at(at, kind);

            let state = script.normalizer.state();
            assert_eq!(state.play_when_ready, intent, "seed {seed}: play intent lost");
            if ready && intent && state.seek == SeekProgress::Idle {
                assert_eq!(
                    state.current,
                    PlaybackStateKind::Playing,
                    "seed {seed}: ready with play intent but not playing"
                );
            }
        }

        let violations = LifecycleAuditor::audit(&script.events);
        assert!(
            violations.is_empty(),
            "seed {seed}: {:?}\nevents: {:?}",
            violations,
            script.names()
        );
    }
}

#[test]
fn test_random_sequences_end_at_terminal() {
    let palette = signal_palette();
    for seed in 0..50u64 {
        let mut rng = Lcg(seed ^ 0xfeed);
        let mut script = Script::new();
        for _ in 0..40 {
            let kind = rng.pick(&palette);
            script.then(kind);
        }
        script.then(SignalKind::Ended);
        let emitted = script.events.len();
        for _ in 0..40 {
            let kind = rng.pick(&palette);
            script.then(kind);
        }
        assert!(script.events[..emitted]
            .last()
            .is_some_and(|e| e.name() == "ended"));
        // Nothing is emitted once the session has ended
        assert!(script.events[emitted..].is_empty(), "seed {seed}");
    }
}

// =============================================================================
// Session Actor
// =============================================================================

#[tokio::test]
async fn test_session_with_shared_facts() {
    let facts = SharedPlayerFacts::default();
    let sink = MemorySink::new();
    let mut session = assert_ok!(TelemetrySession::spawn(
        TelemetryConfig::default(),
        Arc::new(facts.clone()),
        Arc::new(sink.clone()),
    ));

    assert_ok!(session.observe(SignalKind::PlayerReady));
    assert_ok!(session.observe(SignalKind::PlayWhenReadyTrue));
    assert_ok!(session.observe(SignalKind::EnteredBuffering));
    assert_ok!(session.observe(SignalKind::EnteredReady));
    assert_ok!(session.sync().await);

    facts.update(|s| {
        s.play_when_ready = true;
        s.phase = PlayerPhase::Ready;
        s.position_ms = 20_000;
        s.playing_ad = true;
    });
    assert_ok!(session.observe(SignalKind::AdBreakStart { ad: None }));
    assert_ok!(session.observe(SignalKind::AdStarted { ad: None }));
    assert_ok!(session.observe(SignalKind::AdCompleted { ad: None }));
    assert_ok!(session.sync().await);

    facts.update(|s| s.playing_ad = false);
    assert_ok!(session.observe(SignalKind::EnteredReady));
    assert_ok!(session.observe(SignalKind::AdBreakEnd));
    let state = assert_ok!(session.sync().await);
    assert_eq!(state.current, PlaybackStateKind::Playing);

    let summary = assert_ok!(session.release().await);
    assert_eq!(summary.final_state, PlaybackStateKind::Playing);
    assert_eq!(
        sink.names(),
        vec![
            "playerready",
            "buffering",
            "play",
            "playing",
            "adbreakstart",
            "adplaying",
            "adended",
            "adbreakend",
            "play",
            "playing"
        ]
    );
    assert!(LifecycleAuditor::audit(&sink.events()).is_empty());
    assert_err!(session.observe(SignalKind::Ended));
}

#[tokio::test]
async fn test_session_state_subscription() {
    let sink = MemorySink::new();
    let mut session = assert_ok!(TelemetrySession::spawn(
        TelemetryConfig::default(),
        Arc::new(PlayerSnapshot::default()),
        Arc::new(sink.clone()),
    ));
    let mut state_rx = session.subscribe_state();

    assert_ok!(session.observe(SignalKind::Error(PlayerError::new(
        PlayerErrorCategory::Source,
        "manifest unreachable",
    ))));
    assert_ok!(state_rx.changed().await);
    assert_eq!(*state_rx.borrow(), PlaybackStateKind::Error);

    let summary = assert_ok!(session.release().await);
    assert_eq!(summary.pipeline.events_emitted, 1);
}

#[tokio::test]
async fn test_session_drives_replay_source() {
    let sink = MemorySink::new();
    let mut session = assert_ok!(TelemetrySession::spawn(
        TelemetryConfig::default(),
        Arc::new(PlayerSnapshot::default()),
        Arc::new(sink.clone()),
    ));
    let signals = vec![
        RawSignal::new(SignalKind::PlayerReady, 0),
        RawSignal::new(SignalKind::SegmentLoadStart { load_id: 7, url: None }, 5),
        RawSignal::new(SignalKind::EnteredBuffering, 10),
        RawSignal::new(SignalKind::SegmentLoadComplete { load_id: 7, bytes: 4096 }, 50),
        RawSignal::new(SignalKind::EnteredReady, 60),
    ];
    assert_eq!(assert_ok!(session.drive(ReplaySource::new(signals)).await), 5);

    let summary = assert_ok!(session.release().await);
    assert_eq!(sink.names(), vec!["playerready", "buffering", "pause"]);
    assert_eq!(summary.segment_loads.completed, 1);
    assert_eq!(summary.segment_loads.bytes_loaded, 4096);
    assert_eq!(summary.pipeline.signals_received, 5);
    assert_eq!(summary.segments_in_flight, 0);
}
