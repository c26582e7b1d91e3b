//! Player-reported error classification
//!
//! Every failure the player reports is folded into one of a handful of
//! categories, each with a stable numeric code, plus a human-readable detail
//! string. Renderer failures caused by decoder initialization get fixed
//! detail strings so that dashboards can group them reliably.

use serde::{Deserialize, Serialize};

/// Error category for player-reported failures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlayerErrorCategory {
    /// Source / network failure
    Source,
    /// Renderer or decoder failure
    Renderer,
    /// Unexpected internal player failure
    Unexpected,
    /// Failure reported by a remote (cast) player
    Remote,
    /// DRM session failure
    Drm,
    /// I/O failure
    Io,
    /// Anything that could not be classified
    Unknown,
}

impl PlayerErrorCategory {
    /// Stable numeric code reported with the `error` event
    pub fn code(&self) -> i32 {
        match self {
            PlayerErrorCategory::Source => 0,
            PlayerErrorCategory::Renderer => 1,
            PlayerErrorCategory::Unexpected => 2,
            PlayerErrorCategory::Remote => 3,
            PlayerErrorCategory::Unknown => -1,
            PlayerErrorCategory::Drm => -2,
            PlayerErrorCategory::Io => -3,
        }
    }

    /// Classify a platform error-code name such as
    /// `ERROR_CODE_IO_BAD_HTTP_STATUS` or `ERROR_CODE_DECODER_INIT_FAILED`.
    pub fn from_error_code_name(name: &str) -> Self {
        let upper = name.trim().to_ascii_uppercase();
        let name = upper.strip_prefix("ERROR_CODE_").unwrap_or(upper.as_str());

        if name == "REMOTE_ERROR" {
            PlayerErrorCategory::Remote
        } else if name.starts_with("IO_") || name.starts_with("PARSING_") {
            PlayerErrorCategory::Source
        } else if name.starts_with("DRM_") {
            PlayerErrorCategory::Drm
        } else if name.starts_with("DECODER_")
            || name.starts_with("DECODING_")
            || name.starts_with("AUDIO_TRACK_")
        {
            PlayerErrorCategory::Renderer
        } else {
            PlayerErrorCategory::Unexpected
        }
    }
}

impl std::fmt::Display for PlayerErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PlayerErrorCategory::Source => write!(f, "source"),
            PlayerErrorCategory::Renderer => write!(f, "renderer"),
            PlayerErrorCategory::Unexpected => write!(f, "unexpected"),
            PlayerErrorCategory::Remote => write!(f, "remote"),
            PlayerErrorCategory::Drm => write!(f, "drm"),
            PlayerErrorCategory::Io => write!(f, "io"),
            PlayerErrorCategory::Unknown => write!(f, "unknown"),
        }
    }
}

/// How a decoder failed to come up
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecoderFailure {
    /// Querying the device for decoders failed
    QueryFailed,
    /// Content requires a secure decoder and none exists
    SecureDecoderRequired,
    /// No decoder exists for the MIME type
    Missing,
    /// A decoder exists but could not be instantiated
    InstantiationFailed,
}

/// A classified player failure
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerError {
    pub category: PlayerErrorCategory,
    pub detail: String,
}

impl PlayerError {
    pub fn new(category: PlayerErrorCategory, detail: impl Into<String>) -> Self {
        Self {
            category,
            detail: detail.into(),
        }
    }

    /// Renderer error raised while initializing a decoder for `mime_type`
    pub fn decoder(failure: DecoderFailure, mime_type: &str) -> Self {
        let detail = match failure {
            DecoderFailure::QueryFailed => "Unable to query device decoders".to_string(),
            DecoderFailure::SecureDecoderRequired => format!("No secure decoder for {mime_type}"),
            DecoderFailure::Missing => format!("No decoder for {mime_type}"),
            DecoderFailure::InstantiationFailed => {
                format!("Unable to instantiate decoder for {mime_type}")
            }
        };
        Self::new(PlayerErrorCategory::Renderer, detail)
    }

    /// Error described only by a platform error-code name and message
    pub fn from_code_name(code_name: &str, message: &str) -> Self {
        Self::new(
            PlayerErrorCategory::from_error_code_name(code_name),
            format!("{code_name}: {message}"),
        )
    }

    pub fn code(&self) -> i32 {
        self.category.code()
    }
}

impl std::fmt::Display for PlayerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.category, self.detail)
    }
}
