//! Kino Telemetry - Playback event normalization for Kino
//!
//! This crate turns the noisy callback stream of a media player and its ad
//! SDK into a clean, ordered stream of analytics events:
//! - Post-seek debounce of spurious buffering/play re-announcements
//! - Playback lifecycle state machine with canonical event names
//! - Ad-break coordination with replay of missed content events
//! - Rendition change deduplication
//! - Player error classification
//! - Segment load accounting and session summaries
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                       Kino Telemetry                            │
//! ├─────────────────────────────────────────────────────────────────┤
//! │                                                                 │
//! │  ┌──────────────┐          ┌──────────────┐                     │
//! │  │    Signal    │  facts   │    Player    │                     │
//! │  │    Source    │◀────────▶│    Facts     │                     │
//! │  └──────┬───────┘          └──────┬───────┘                     │
//! │         │ RawSignal               │                             │
//! │  ┌──────┴───────┐                 │                             │
//! │  │   Session    │   single consumer queue                       │
//! │  │    Actor     │                 │                             │
//! │  └──────┬───────┘                 │                             │
//! │  ┌──────┴───────┐  ┌──────────────┴┐  ┌──────────────┐          │
//! │  │  Debounce    │─▶│   Playback    │─▶│  Normalizer  │          │
//! │  │   Filter     │  │ State Machine │  │   (stamping) │          │
//! │  └──────────────┘  └──┬─────────┬──┘  └──────┬───────┘          │
//! │             ┌─────────┴──┐  ┌───┴────────┐   │ DomainEvent      │
//! │             │  Ad Break  │  │ Rendition  │   ▼                  │
//! │             │ Coordinator│  │  Tracker   │  ┌──────────────┐    │
//! │             └────────────┘  └────────────┘  │  Event Sink  │    │
//! │                                             └──────────────┘    │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

pub mod ads;
pub mod audit;
pub mod config;
pub mod debounce;
pub mod error;
pub mod loads;
pub mod normalizer;
pub mod player_error;
pub mod rendition;
pub mod session;
pub mod sink;
pub mod source;
pub mod state;
pub mod types;

pub use ads::AdBreakCoordinator;
pub use audit::{LifecycleAuditor, Violation, ViolationKind};
pub use config::TelemetryConfig;
pub use debounce::SeekDebounce;
pub use error::{Error, Result};
pub use loads::{SegmentLoadStats, SegmentLoadTracker};
pub use normalizer::{Normalizer, PipelineStats};
pub use player_error::{DecoderFailure, PlayerError, PlayerErrorCategory};
pub use rendition::RenditionTracker;
pub use session::{MonotonicClock, SessionSummary, TelemetrySession};
pub use sink::{ChannelSink, EventSink, MemorySink};
pub use source::{
    PlayerFacts, PlayerPhase, PlayerSnapshot, ReplaySource, SharedPlayerFacts, SignalSource,
};
pub use state::{PlaybackState, PlaybackStateMachine, SeekProgress};
pub use types::*;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Initialize the telemetry library
pub fn init() {
    tracing::info!(version = VERSION, "Kino Telemetry initialized");
}
