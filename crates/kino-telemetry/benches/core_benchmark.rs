//! Benchmark tests for kino-telemetry operations
//!
//! Run with: cargo bench -p kino-telemetry

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use std::sync::Arc;

use kino_telemetry::{
    DiscontinuityReason, DomainEvent, LifecycleAuditor, MediaFormat, Normalizer, PlayerPhase,
    PlayerSnapshot, RawSignal, SeekDebounce, SessionId, SignalKind, TelemetryConfig,
    TelemetrySession,
};

// ============================================================================
// Helpers
// ============================================================================

/// A realistic session: startup, renditions, seeks, a mid-roll, rebuffers
fn session_script(cycles: usize) -> Vec<RawSignal> {
    let mut signals = Vec::new();
    let mut at = 0;
    let mut push = |kind: SignalKind, step: u64| {
        at += step;
        signals.push(RawSignal::new(kind, at));
    };

    push(SignalKind::PlayerReady, 0);
    push(SignalKind::PlayWhenReadyTrue, 5);
    push(SignalKind::EnteredBuffering, 5);
    push(SignalKind::EnteredReady, 400);

    for i in 0..cycles {
        let height = [360u32, 720, 1080][i % 3];
        push(
            SignalKind::FormatChanged(MediaFormat {
                bitrate: Some(height as u64 * 3_000),
                width: Some(height * 16 / 9),
                height: Some(height),
                ..Default::default()
            }),
            2_000,
        );
        push(SignalKind::SegmentLoadStart { load_id: i as u64, url: None }, 10);
        push(SignalKind::SegmentLoadComplete { load_id: i as u64, bytes: 250_000 }, 200);
        push(SignalKind::SeekStarted, 1_000);
        push(
            SignalKind::PositionDiscontinuity {
                reason: DiscontinuityReason::Seek,
            },
            20,
        );
        push(SignalKind::SeekProcessed, 10);
        push(SignalKind::EnteredBuffering, 30);
        push(SignalKind::EnteredReady, 400);
        push(SignalKind::AdBreakStart { ad: None }, 5_000);
        push(SignalKind::AdStarted { ad: None }, 100);
        push(SignalKind::AdQuartile { n: 1, ad: None }, 5_000);
        push(SignalKind::AdQuartile { n: 2, ad: None }, 5_000);
        push(SignalKind::AdQuartile { n: 3, ad: None }, 5_000);
        push(SignalKind::AdCompleted { ad: None }, 5_000);
        push(SignalKind::EnteredReady, 50);
        push(SignalKind::AdBreakEnd, 10);
        push(SignalKind::EnteredBuffering, 3_000);
        push(SignalKind::EnteredReady, 800);
    }
    push(SignalKind::Ended, 10_000);
    signals
}

fn playing_facts() -> PlayerSnapshot {
    PlayerSnapshot {
        position_ms: 60_000,
        playing_ad: false,
        play_when_ready: true,
        phase: PlayerPhase::Ready,
    }
}

// ============================================================================
// Normalizer Benchmarks
// ============================================================================

fn bench_normalizer(c: &mut Criterion) {
    let mut group = c.benchmark_group("Normalizer");
    let facts = playing_facts();

    for &cycles in &[1, 10, 100] {
        let script = session_script(cycles);
        group.throughput(Throughput::Elements(script.len() as u64));
        group.bench_with_input(BenchmarkId::new("process", cycles), &script, |b, script| {
            b.iter(|| {
                let mut normalizer = Normalizer::new(SessionId::new(), &TelemetryConfig::default());
                let mut emitted = 0;
                for signal in script.iter().cloned() {
                    emitted += normalizer.process(signal, &facts).len();
                }
                black_box(emitted)
            });
        });
    }

    group.finish();
}

fn bench_debounce(c: &mut Criterion) {
    let script = session_script(100);
    c.bench_function("SeekDebounce::observe", |b| {
        b.iter(|| {
            let mut filter = SeekDebounce::new(300);
            let passed = script
                .iter()
                .cloned()
                .filter_map(|s| filter.observe(s))
                .count();
            black_box(passed)
        });
    });
}

fn bench_auditor(c: &mut Criterion) {
    let facts = playing_facts();
    let mut normalizer = Normalizer::new(SessionId::new(), &TelemetryConfig::default());
    let events: Vec<_> = session_script(100)
        .into_iter()
        .flat_map(|s| normalizer.process(s, &facts))
        .collect();

    c.bench_function("LifecycleAuditor::audit", |b| {
        b.iter(|| black_box(LifecycleAuditor::audit(&events).len()));
    });
}

// ============================================================================
// Session Benchmarks
// ============================================================================

fn bench_session(c: &mut Criterion) {
    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap();
    let script = session_script(10);

    c.bench_function("TelemetrySession round trip", |b| {
        b.iter(|| {
            rt.block_on(async {
                let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel::<DomainEvent>();
                let mut session = TelemetrySession::spawn(
                    TelemetryConfig::default(),
                    Arc::new(playing_facts()),
                    Arc::new(tx),
                )
                .unwrap();
                for signal in script.iter().cloned() {
                    session.submit(signal).unwrap();
                }
                let summary = session.release().await.unwrap();
                let mut received = 0;
                while rx.try_recv().is_ok() {
                    received += 1;
                }
                black_box((summary.pipeline.events_emitted, received))
            })
        });
    });
}

criterion_group!(normalizer_benches, bench_normalizer, bench_debounce, bench_auditor);

criterion_group!(session_benches, bench_session);

criterion_main!(normalizer_benches, session_benches);
