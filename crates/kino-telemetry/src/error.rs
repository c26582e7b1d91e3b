//! Error types for Kino Telemetry

use thiserror::Error;

/// Result type alias for telemetry operations
pub type Result<T> = std::result::Result<T, Error>;

/// Telemetry error types
///
/// Player-reported failures are not represented here: those become `error`
/// domain events (see [`crate::player_error`]). This enum covers configuration
/// problems, signals that make no sense for the current state, and session
/// lifecycle misuse.
#[derive(Error, Debug)]
pub enum Error {
    // Configuration errors
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Failed to parse configuration: {0}")]
    ConfigParse(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // Internal consistency errors
    #[error("Ad break ended without a matching start")]
    AdBreakEndWithoutStart,

    #[error("Ad break started while another ad break is active")]
    AdBreakAlreadyActive,

    #[error("Ad signal {signal} received outside of an ad break")]
    AdSignalOutsideBreak { signal: String },

    #[error("Ad quartile {0} is out of range (expected 1-3)")]
    InvalidQuartile(u8),

    #[error("Signal {signal} received after terminal state {state}")]
    SignalAfterTerminal { signal: String, state: String },

    // Session errors
    #[error("Session {0} has been released")]
    SessionReleased(String),

    #[error("Session task failed: {0}")]
    SessionTask(String),
}

impl Error {
    /// Returns true for internal consistency errors.
    ///
    /// These are recovered locally: the offending signal is logged and
    /// dropped, the playback state is left unchanged, and nothing reaches the
    /// event sink.
    pub fn is_internal(&self) -> bool {
        matches!(
            self,
            Error::AdBreakEndWithoutStart
                | Error::AdBreakAlreadyActive
                | Error::AdSignalOutsideBreak { .. }
                | Error::InvalidQuartile(_)
                | Error::SignalAfterTerminal { .. }
        )
    }

    /// Returns the error code for logs
    pub fn error_code(&self) -> &'static str {
        match self {
            Error::InvalidConfig(_) => "INVALID_CONFIG",
            Error::ConfigParse(_) => "CONFIG_PARSE",
            Error::Io(_) => "IO",
            Error::AdBreakEndWithoutStart => "AD_BREAK_END_WITHOUT_START",
            Error::AdBreakAlreadyActive => "AD_BREAK_ALREADY_ACTIVE",
            Error::AdSignalOutsideBreak { .. } => "AD_SIGNAL_OUTSIDE_BREAK",
            Error::InvalidQuartile(_) => "INVALID_QUARTILE",
            Error::SignalAfterTerminal { .. } => "SIGNAL_AFTER_TERMINAL",
            Error::SessionReleased(_) => "SESSION_RELEASED",
            Error::SessionTask(_) => "SESSION_TASK",
        }
    }
}
