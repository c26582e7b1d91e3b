//! Signal source seam
//!
//! The core never talks to a player directly. Version-specific adapters turn
//! player and ad SDK callbacks into [`RawSignal`]s and answer point-in-time
//! questions through [`PlayerFacts`].

use crate::types::RawSignal;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::{Arc, RwLock};
use tokio::sync::mpsc;

/// Coarse playback phase of the underlying player
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PlayerPhase {
    #[default]
    Idle,
    Buffering,
    Ready,
    Ended,
}

/// Point-in-time view of the player
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct PlayerSnapshot {
    pub position_ms: u64,
    pub playing_ad: bool,
    pub play_when_ready: bool,
    pub phase: PlayerPhase,
}

/// On-demand queries answered by the adapter
///
/// Implementations must answer without blocking; the state machine calls
/// these while processing a signal.
pub trait PlayerFacts: Send + Sync {
    fn position_ms(&self) -> u64;

    /// True while the ad SDK is driving the player
    fn is_playing_ad(&self) -> bool;

    fn play_when_ready(&self) -> bool;

    fn phase(&self) -> PlayerPhase;

    fn snapshot(&self) -> PlayerSnapshot {
        PlayerSnapshot {
            position_ms: self.position_ms(),
            playing_ad: self.is_playing_ad(),
            play_when_ready: self.play_when_ready(),
            phase: self.phase(),
        }
    }
}

impl PlayerFacts for PlayerSnapshot {
    fn position_ms(&self) -> u64 {
        self.position_ms
    }

    fn is_playing_ad(&self) -> bool {
        self.playing_ad
    }

    fn play_when_ready(&self) -> bool {
        self.play_when_ready
    }

    fn phase(&self) -> PlayerPhase {
        self.phase
    }

    fn snapshot(&self) -> PlayerSnapshot {
        *self
    }
}

/// Facts shared between an adapter that updates them and a session that
/// reads them
#[derive(Debug, Clone, Default)]
pub struct SharedPlayerFacts {
    inner: Arc<RwLock<PlayerSnapshot>>,
}

impl SharedPlayerFacts {
    pub fn new(snapshot: PlayerSnapshot) -> Self {
        Self {
            inner: Arc::new(RwLock::new(snapshot)),
        }
    }

    /// Replace the whole snapshot
    pub fn set(&self, snapshot: PlayerSnapshot) {
        self.update(|s| *s = snapshot);
    }

    pub fn update(&self, f: impl FnOnce(&mut PlayerSnapshot)) {
        // A poisoned lock still holds a plain-data snapshot
        let mut guard = self.inner.write().unwrap_or_else(|e| e.into_inner());
        f(&mut guard);
    }

    fn read(&self) -> PlayerSnapshot {
        *self.inner.read().unwrap_or_else(|e| e.into_inner())
    }
}

impl PlayerFacts for SharedPlayerFacts {
    fn position_ms(&self) -> u64 {
        self.read().position_ms
    }

    fn is_playing_ad(&self) -> bool {
        self.read().playing_ad
    }

    fn play_when_ready(&self) -> bool {
        self.read().play_when_ready
    }

    fn phase(&self) -> PlayerPhase {
        self.read().phase
    }

    fn snapshot(&self) -> PlayerSnapshot {
        self.read()
    }
}

/// Delivers raw signals in arrival order
#[async_trait]
pub trait SignalSource: Send {
    /// Next signal, or `None` once the adapter is detached
    async fn next_signal(&mut self) -> Option<RawSignal>;
}

#[async_trait]
impl SignalSource for mpsc::Receiver<RawSignal> {
    async fn next_signal(&mut self) -> Option<RawSignal> {
        self.recv().await
    }
}

#[async_trait]
impl SignalSource for mpsc::UnboundedReceiver<RawSignal> {
    async fn next_signal(&mut self) -> Option<RawSignal> {
        self.recv().await
    }
}

/// Replays a pre-recorded list of signals
#[derive(Debug, Clone, Default)]
pub struct ReplaySource {
    signals: VecDeque<RawSignal>,
}

impl ReplaySource {
    pub fn new(signals: impl IntoIterator<Item = RawSignal>) -> Self {
        Self {
            signals: signals.into_iter().collect(),
        }
    }

    pub fn remaining(&self) -> usize {
        self.signals.len()
    }
}

#[async_trait]
impl SignalSource for ReplaySource {
    async fn next_signal(&mut self) -> Option<RawSignal> {
        self.signals.pop_front()
    }
}
