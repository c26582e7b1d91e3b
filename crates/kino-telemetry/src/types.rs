//! Core types for Kino Telemetry

use crate::player_error::PlayerError;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a telemetry session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub Uuid);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Logical playback state as reported to analytics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PlaybackStateKind {
    Init,
    Play,
    Buffering,
    Paused,
    Seeking,
    Seeked,
    Playing,
    PlayingAds,
    Ended,
    Error,
}

impl PlaybackStateKind {
    /// `Ended` and `Error` close the session; nothing is emitted afterwards
    pub fn is_terminal(&self) -> bool {
        matches!(self, PlaybackStateKind::Ended | PlaybackStateKind::Error)
    }
}

impl std::fmt::Display for PlaybackStateKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PlaybackStateKind::Init => write!(f, "INIT"),
            PlaybackStateKind::Play => write!(f, "PLAY"),
            PlaybackStateKind::Buffering => write!(f, "BUFFERING"),
            PlaybackStateKind::Paused => write!(f, "PAUSED"),
            PlaybackStateKind::Seeking => write!(f, "SEEKING"),
            PlaybackStateKind::Seeked => write!(f, "SEEKED"),
            PlaybackStateKind::Playing => write!(f, "PLAYING"),
            PlaybackStateKind::PlayingAds => write!(f, "PLAYING_ADS"),
            PlaybackStateKind::Ended => write!(f, "ENDED"),
            PlaybackStateKind::Error => write!(f, "ERROR"),
        }
    }
}

/// Why the playback position jumped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiscontinuityReason {
    Seek,
    SeekAdjustment,
    AutoTransition,
    PeriodTransition,
    AdInsertion,
    Skip,
    Remove,
    Internal,
}

/// Track type a format belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TrackType {
    #[default]
    Video,
    Audio,
    Text,
    Unknown,
}

/// Video resolution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

impl Resolution {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Returns quality tier name
    pub fn quality_name(&self) -> &'static str {
        match self.height {
            0..=240 => "240p",
            241..=360 => "360p",
            361..=480 => "480p",
            481..=720 => "720p",
            721..=1080 => "1080p",
            1081..=1440 => "1440p",
            _ => "4K",
        }
    }
}

impl std::fmt::Display for Resolution {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// A media format announced by the player
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct MediaFormat {
    /// Track the format belongs to
    #[serde(default)]
    pub track: TrackType,
    /// Sample MIME type, e.g. `video/avc`
    pub mime_type: Option<String>,
    /// Container MIME type, e.g. `application/x-mpegURL`
    pub container_mime: Option<String>,
    /// Advertised bitrate in bits per second
    pub bitrate: Option<u64>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub frame_rate: Option<f32>,
}

/// The rendition last reported to analytics
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Rendition {
    pub bitrate: Option<u64>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub frame_rate: Option<f32>,
    pub mime_type: Option<String>,
}

impl Rendition {
    pub fn resolution(&self) -> Option<Resolution> {
        match (self.width, self.height) {
            (Some(w), Some(h)) if w > 0 && h > 0 => Some(Resolution::new(w, h)),
            _ => None,
        }
    }
}

impl From<&MediaFormat> for Rendition {
    fn from(format: &MediaFormat) -> Self {
        Self {
            bitrate: format.bitrate.filter(|b| *b > 0),
            width: format.width.filter(|w| *w > 0),
            height: format.height.filter(|h| *h > 0),
            // Players announce unknown frame rates as 0 or -1
            frame_rate: format.frame_rate.filter(|f| *f > 0.0),
            mime_type: format.mime_type.clone(),
        }
    }
}

impl std::fmt::Display for Rendition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.resolution() {
            Some(res) => write!(f, "{} ({})", res, res.quality_name())?,
            None => write!(f, "audio/unknown")?,
        }
        if let Some(bitrate) = self.bitrate {
            write!(f, " @ {}bps", bitrate)?;
        }
        Ok(())
    }
}

/// Identifiers of the ad being played
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AdMetadata {
    pub ad_id: Option<String>,
    pub creative_id: Option<String>,
}

impl AdMetadata {
    pub fn new(ad_id: impl Into<String>, creative_id: impl Into<String>) -> Self {
        Self {
            ad_id: Some(ad_id.into()),
            creative_id: Some(creative_id.into()),
        }
    }
}

/// Kind of raw signal reported by the signal source adapter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SignalKind {
    PlayerReady,
    PlayWhenReadyTrue,
    PlayWhenReadyFalse,
    EnteredBuffering,
    EnteredReady,
    Ended,
    Error(PlayerError),
    SeekStarted,
    SeekProcessed,
    PositionDiscontinuity { reason: DiscontinuityReason },
    FormatChanged(MediaFormat),
    TracksChanged { has_video: bool },

    AdBreakStart { ad: Option<AdMetadata> },
    AdBreakEnd,
    AdRequested { ad: Option<AdMetadata> },
    AdResponded { ad: Option<AdMetadata> },
    AdLoaded { ad: Option<AdMetadata> },
    AdStarted { ad: Option<AdMetadata> },
    AdPaused { ad: Option<AdMetadata> },
    AdResumed { ad: Option<AdMetadata> },
    AdCompleted { ad: Option<AdMetadata> },
    AdQuartile { n: u8, ad: Option<AdMetadata> },
    AdError { detail: String, ad: Option<AdMetadata> },

    SegmentLoadStart { load_id: u64, url: Option<String> },
    SegmentLoadComplete { load_id: u64, bytes: u64 },
    SegmentLoadError { load_id: u64, detail: String },
}

impl SignalKind {
    /// Short name used in logs and error messages
    pub fn name(&self) -> &'static str {
        match self {
            SignalKind::PlayerReady => "player_ready",
            SignalKind::PlayWhenReadyTrue => "play_when_ready_true",
            SignalKind::PlayWhenReadyFalse => "play_when_ready_false",
            SignalKind::EnteredBuffering => "entered_buffering",
            SignalKind::EnteredReady => "entered_ready",
            SignalKind::Ended => "ended",
            SignalKind::Error(_) => "error",
            SignalKind::SeekStarted => "seek_started",
            SignalKind::SeekProcessed => "seek_processed",
            SignalKind::PositionDiscontinuity { .. } => "position_discontinuity",
            SignalKind::FormatChanged(_) => "format_changed",
            SignalKind::TracksChanged { .. } => "tracks_changed",
            SignalKind::AdBreakStart { .. } => "ad_break_start",
            SignalKind::AdBreakEnd => "ad_break_end",
            SignalKind::AdRequested { .. } => "ad_requested",
            SignalKind::AdResponded { .. } => "ad_responded",
            SignalKind::AdLoaded { .. } => "ad_loaded",
            SignalKind::AdStarted { .. } => "ad_started",
            SignalKind::AdPaused { .. } => "ad_paused",
            SignalKind::AdResumed { .. } => "ad_resumed",
            SignalKind::AdCompleted { .. } => "ad_completed",
            SignalKind::AdQuartile { .. } => "ad_quartile",
            SignalKind::AdError { .. } => "ad_error",
            SignalKind::SegmentLoadStart { .. } => "segment_load_start",
            SignalKind::SegmentLoadComplete { .. } => "segment_load_complete",
            SignalKind::SegmentLoadError { .. } => "segment_load_error",
        }
    }

    /// Signals fed by the ad subsystem
    pub fn is_ad(&self) -> bool {
        matches!(
            self,
            SignalKind::AdBreakStart { .. }
                | SignalKind::AdBreakEnd
                | SignalKind::AdRequested { .. }
                | SignalKind::AdResponded { .. }
                | SignalKind::AdLoaded { .. }
                | SignalKind::AdStarted { .. }
                | SignalKind::AdPaused { .. }
                | SignalKind::AdResumed { .. }
                | SignalKind::AdCompleted { .. }
                | SignalKind::AdQuartile { .. }
                | SignalKind::AdError { .. }
        )
    }

    /// Segment load bookkeeping signals
    pub fn is_segment_load(&self) -> bool {
        matches!(
            self,
            SignalKind::SegmentLoadStart { .. }
                | SignalKind::SegmentLoadComplete { .. }
                | SignalKind::SegmentLoadError { .. }
        )
    }
}

/// An input event from the player/ad adapter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawSignal {
    #[serde(flatten)]
    pub kind: SignalKind,
    /// Monotonic capture time in milliseconds
    pub observed_at_ms: u64,
    /// Opaque adapter payload, never interpreted by the core
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<serde_json::Value>,
}

impl RawSignal {
    pub fn new(kind: SignalKind, observed_at_ms: u64) -> Self {
        Self {
            kind,
            observed_at_ms,
            payload: None,
        }
    }
}

/// Canonical analytics event payloads
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "lowercase")]
pub enum EventKind {
    PlayerReady,
    Play,
    Playing,
    Pause,
    Buffering,
    Seeking,
    Seeked,
    Ended,
    Error {
        category: crate::player_error::PlayerErrorCategory,
        code: i32,
        detail: String,
    },
    RenditionChange {
        rendition: Rendition,
    },
    AdBreakStart { ad: AdMetadata },
    AdBreakEnd { ad: AdMetadata },
    AdRequest { ad: AdMetadata },
    AdResponse { ad: AdMetadata },
    AdPlay { ad: AdMetadata },
    AdPlaying { ad: AdMetadata },
    AdPause { ad: AdMetadata },
    AdEnded { ad: AdMetadata },
    AdFirstQuartile { ad: AdMetadata },
    AdMidpoint { ad: AdMetadata },
    AdThirdQuartile { ad: AdMetadata },
    AdError { ad: AdMetadata, detail: String },
}

impl EventKind {
    /// Canonical lowercase event name
    pub fn name(&self) -> &'static str {
        match self {
            EventKind::PlayerReady => "playerready",
            EventKind::Play => "play",
            EventKind::Playing => "playing",
            EventKind::Pause => "pause",
            EventKind::Buffering => "buffering",
            EventKind::Seeking => "seeking",
            EventKind::Seeked => "seeked",
            EventKind::Ended => "ended",
            EventKind::Error { .. } => "error",
            EventKind::RenditionChange { .. } => "renditionchange",
            EventKind::AdBreakStart { .. } => "adbreakstart",
            EventKind::AdBreakEnd { .. } => "adbreakend",
            EventKind::AdRequest { .. } => "adrequest",
            EventKind::AdResponse { .. } => "adresponse",
            EventKind::AdPlay { .. } => "adplay",
            EventKind::AdPlaying { .. } => "adplaying",
            EventKind::AdPause { .. } => "adpause",
            EventKind::AdEnded { .. } => "adended",
            EventKind::AdFirstQuartile { .. } => "adfirstquartile",
            EventKind::AdMidpoint { .. } => "admidpoint",
            EventKind::AdThirdQuartile { .. } => "adthirdquartile",
            EventKind::AdError { .. } => "aderror",
        }
    }

    /// Content lifecycle events that must never appear inside an ad break
    pub fn is_content(&self) -> bool {
        matches!(
            self,
            EventKind::Play
                | EventKind::Playing
                | EventKind::Pause
                | EventKind::Buffering
                | EventKind::Seeking
                | EventKind::Seeked
        )
    }

    pub fn is_ad(&self) -> bool {
        matches!(
            self,
            EventKind::AdBreakStart { .. }
                | EventKind::AdBreakEnd { .. }
                | EventKind::AdRequest { .. }
                | EventKind::AdResponse { .. }
                | EventKind::AdPlay { .. }
                | EventKind::AdPlaying { .. }
                | EventKind::AdPause { .. }
                | EventKind::AdEnded { .. }
                | EventKind::AdFirstQuartile { .. }
                | EventKind::AdMidpoint { .. }
                | EventKind::AdThirdQuartile { .. }
                | EventKind::AdError { .. }
        )
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, EventKind::Ended | EventKind::Error { .. })
    }

    pub(crate) fn error(error: &PlayerError) -> Self {
        EventKind::Error {
            category: error.category,
            code: error.code(),
            detail: error.detail.clone(),
        }
    }
}

/// Canonical analytics event with metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DomainEvent {
    /// Unique event ID
    pub id: Uuid,
    /// Session ID
    pub session_id: SessionId,
    /// Sequence number, strictly increasing within a session
    pub sequence: u64,
    /// Monotonic emission time in milliseconds
    pub emitted_at_ms: u64,
    /// The event
    #[serde(flatten)]
    pub event: EventKind,
}

impl DomainEvent {
    pub fn name(&self) -> &'static str {
        self.event.name()
    }
}
