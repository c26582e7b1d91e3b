//! Rendition tracking
//!
//! Some players re-announce the current format at every segment boundary.
//! Changes are therefore measured against the last *reported* rendition, not
//! the last observed format.

use crate::types::{MediaFormat, Rendition, TrackType};
use tracing::debug;

/// Deduplicates format announcements into genuine rendition switches
#[derive(Debug, Clone, Default)]
pub struct RenditionTracker {
    enabled: bool,
    last_reported: Option<Rendition>,
    container_mime: Option<String>,
    observed: u64,
}

impl RenditionTracker {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            ..Default::default()
        }
    }

    /// Observe a format; returns true if it is a rendition change that should
    /// be reported.
    ///
    /// The container MIME type is recorded for every format, whatever its
    /// track and whether or not a change fires.
    pub fn on_format_observed(&mut self, format: &MediaFormat) -> bool {
        self.observed += 1;
        if let Some(mime) = &format.container_mime {
            self.container_mime = Some(mime.clone());
        }

        if !self.enabled || format.track != TrackType::Video {
            return false;
        }

        let candidate = Rendition::from(format);
        if self.last_reported.as_ref() == Some(&candidate) {
            return false;
        }

        debug!(
            from = ?self.last_reported,
            to = %candidate,
            "Rendition change"
        );
        self.last_reported = Some(candidate);
        true
    }

    /// Last rendition that was reported as a change
    pub fn current(&self) -> Option<&Rendition> {
        self.last_reported.as_ref()
    }

    /// Container MIME type detected so far, for session metadata
    pub fn container_mime(&self) -> Option<&str> {
        self.container_mime.as_deref()
    }

    pub fn observed_count(&self) -> u64 {
        self.observed
    }

    pub fn reset(&mut self) {
        self.last_reported = None;
        self.container_mime = None;
        self.observed = 0;
    }
}
