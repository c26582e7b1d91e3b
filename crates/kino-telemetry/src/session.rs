//! Telemetry Session - single-consumer actor around the normalizer
//!
//! Coordinates:
//! - Serialized signal processing on one tokio task
//! - Bootstrap of sessions attached mid-playback
//! - Delivery to the event sink
//! - Restart and teardown

use crate::{
    loads::SegmentLoadStats,
    normalizer::{Normalizer, PipelineStats},
    sink::EventSink,
    source::{PlayerFacts, SignalSource},
    state::PlaybackState,
    types::*,
    Error, Result, TelemetryConfig,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, instrument};

/// Monotonic millisecond clock anchored at session start
#[derive(Debug, Clone, Copy)]
pub struct MonotonicClock {
    origin: Instant,
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }

    pub fn now_ms(&self) -> u64 {
        self.origin.elapsed().as_millis() as u64
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

/// What a session observed over its lifetime
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSummary {
    pub session_id: SessionId,
    pub started_at: DateTime<Utc>,
    pub released_at: DateTime<Utc>,
    #[serde(flatten)]
    pub pipeline: PipelineStats,
    pub final_state: PlaybackStateKind,
    pub container_mime: Option<String>,
    pub rendition: Option<Rendition>,
    pub segment_loads: SegmentLoadStats,
    /// Loads started but neither completed nor failed at release
    pub segments_in_flight: usize,
    /// Format callbacks seen, including re-announcements
    pub formats_observed: u64,
    pub restarts: u32,
}

impl SessionSummary {
    pub fn from_normalizer(normalizer: &Normalizer, started_at: DateTime<Utc>, restarts: u32) -> Self {
        let machine = normalizer.machine();
        Self {
            session_id: normalizer.session_id(),
            started_at,
            released_at: Utc::now(),
            pipeline: normalizer.stats(),
            final_state: machine.state().current,
            container_mime: machine.renditions().container_mime().map(str::to_string),
            rendition: machine.renditions().current().cloned(),
            segment_loads: normalizer.load_stats(),
            segments_in_flight: normalizer.loads().in_flight(),
            formats_observed: machine.renditions().observed_count(),
            restarts,
        }
    }
}

enum Command {
    Signal(RawSignal),
    Restart,
    Sync(oneshot::Sender<PlaybackState>),
    Shutdown,
}

/// Handle to a running telemetry session
pub struct TelemetrySession {
    id: SessionId,
    tx: mpsc::UnboundedSender<Command>,
    state_rx: watch::Receiver<PlaybackStateKind>,
    clock: MonotonicClock,
    task: Option<JoinHandle<SessionSummary>>,
}

impl TelemetrySession {
    /// Spawn the session task on the current tokio runtime
    pub fn spawn(
        config: TelemetryConfig,
        facts: Arc<dyn PlayerFacts>,
        sink: Arc<dyn EventSink>,
    ) -> Result<Self> {
        config.validate()?;
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| Error::SessionTask(e.to_string()))?;

        let id = SessionId::new();
        let clock = MonotonicClock::new();
        let (tx, rx) = mpsc::unbounded_channel();
        let (state_tx, state_rx) = watch::channel(PlaybackStateKind::Init);

        info!(
            session_id = %id,
            quiet_window_ms = config.seek_quiet_window_ms,
            ad_tracking = config.ad_tracking,
            already_playing = config.already_playing,
            "Starting telemetry session"
        );

        let worker = SessionWorker {
            normalizer: Normalizer::new(id, &config),
            facts,
            sink,
            state_tx,
            started_at: Utc::now(),
            restarts: 0,
        };
        let bootstrap_at = config.already_playing.then(|| clock.now_ms());
        let task = runtime.spawn(worker.run(rx, bootstrap_at));

        Ok(Self {
            id,
            tx,
            state_rx,
            clock,
            task: Some(task),
        })
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn clock(&self) -> MonotonicClock {
        self.clock
    }

    /// Queue a signal. Never blocks.
    pub fn submit(&self, signal: RawSignal) -> Result<()> {
        self.send(Command::Signal(signal))
    }

    /// Queue a signal stamped with the session clock
    pub fn observe(&self, kind: SignalKind) -> Result<()> {
        self.submit(RawSignal::new(kind, self.clock.now_ms()))
    }

    /// Start over for new content in the same player
    pub fn restart(&self) -> Result<()> {
        self.send(Command::Restart)
    }

    /// Wait until everything queued so far has been processed and return the
    /// resulting playback state
    pub async fn sync(&self) -> Result<PlaybackState> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.send(Command::Sync(reply_tx))?;
        reply_rx
            .await
            .map_err(|_| Error::SessionReleased(self.id.to_string()))
    }

    /// Latest logical state published by the session task
    pub fn current_state(&self) -> PlaybackStateKind {
        *self.state_rx.borrow()
    }

    /// Subscribe to state changes
    pub fn subscribe_state(&self) -> watch::Receiver<PlaybackStateKind> {
        self.state_rx.clone()
    }

    /// Pump a signal source into the session until it is exhausted.
    /// Returns the number of signals forwarded.
    #[instrument(skip(self, source), fields(session_id = %self.id))]
    pub async fn drive<S: SignalSource>(&self, mut source: S) -> Result<u64> {
        let mut forwarded = 0;
        while let Some(signal) = source.next_signal().await {
            self.submit(signal)?;
            forwarded += 1;
        }
        debug!(forwarded, "Signal source exhausted");
        Ok(forwarded)
    }

    /// Stop accepting signals, finish the queued ones, and return the
    /// summary. No `ended` event is synthesized.
    #[instrument(skip(self), fields(session_id = %self.id))]
    pub async fn release(&mut self) -> Result<SessionSummary> {
        let task = self
            .task
            .take()
            .ok_or_else(|| Error::SessionReleased(self.id.to_string()))?;
        // The task may already be gone if it panicked; the join reports that
        let _ = self.tx.send(Command::Shutdown);

        let summary = task.await.map_err(|e| Error::SessionTask(e.to_string()))?;
        info!(
            events = summary.pipeline.events_emitted,
            final_state = %summary.final_state,
            "Telemetry session released"
        );
        Ok(summary)
    }

    fn send(&self, command: Command) -> Result<()> {
        if self.task.is_none() {
            return Err(Error::SessionReleased(self.id.to_string()));
        }
        self.tx
            .send(command)
            .map_err(|_| Error::SessionReleased(self.id.to_string()))
    }
}

struct SessionWorker {
    normalizer: Normalizer,
    facts: Arc<dyn PlayerFacts>,
    sink: Arc<dyn EventSink>,
    state_tx: watch::Sender<PlaybackStateKind>,
    started_at: DateTime<Utc>,
    restarts: u32,
}

impl SessionWorker {
    async fn run(
        mut self,
        mut rx: mpsc::UnboundedReceiver<Command>,
        bootstrap_at: Option<u64>,
    ) -> SessionSummary {
        if let Some(at_ms) = bootstrap_at {
            let events = self.normalizer.bootstrap(self.facts.as_ref(), at_ms);
            self.deliver(events);
        }

        while let Some(command) = rx.recv().await {
            match command {
                Command::Signal(signal) => {
                    let events = self.normalizer.process(signal, self.facts.as_ref());
                    self.deliver(events);
                }
                Command::Restart => {
                    self.normalizer.restart();
                    self.restarts += 1;
                    self.publish_state();
                }
                Command::Sync(reply) => {
                    let _ = reply.send(self.normalizer.state().clone());
                }
                Command::Shutdown => break,
            }
        }

        SessionSummary::from_normalizer(&self.normalizer, self.started_at, self.restarts)
    }

    fn deliver(&self, events: Vec<DomainEvent>) {
        if events.is_empty() {
            return;
        }
        for event in events {
            self.sink.deliver(event);
        }
        self.publish_state();
    }

    fn publish_state(&self) {
        let current = self.normalizer.state().current;
        self.state_tx.send_if_modified(|state| {
            if *state != current {
                *state = current;
                true
            } else {
                false
            }
        });
    }
}
