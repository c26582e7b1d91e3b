//! Event sink seam
//!
//! Sinks receive canonical events in emission order. Delivery is
//! fire-and-forget: a sink that cannot keep up buffers or drops on its own
//! side and never blocks the state machine.

use crate::types::DomainEvent;
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// Receives canonical domain events
pub trait EventSink: Send + Sync {
    fn deliver(&self, event: DomainEvent);
}

impl<F> EventSink for F
where
    F: Fn(DomainEvent) + Send + Sync,
{
    fn deliver(&self, event: DomainEvent) {
        self(event)
    }
}

impl EventSink for mpsc::UnboundedSender<DomainEvent> {
    fn deliver(&self, event: DomainEvent) {
        if let Err(e) = self.send(event) {
            debug!(event = e.0.name(), "Event receiver gone, dropping event");
        }
    }
}

/// Bounded channel sink that drops events when the consumer lags
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::Sender<DomainEvent>,
}

impl ChannelSink {
    /// Create the sink and the receiving half
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<DomainEvent>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self { tx }, rx)
    }
}

impl EventSink for ChannelSink {
    fn deliver(&self, event: DomainEvent) {
        match self.tx.try_send(event) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(event)) => {
                warn!(
                    event = event.name(),
                    sequence = event.sequence,
                    "Event channel full, dropping event"
                );
            }
            Err(mpsc::error::TrySendError::Closed(event)) => {
                debug!(event = event.name(), "Event channel closed, dropping event");
            }
        }
    }
}

/// Collects events in memory
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    events: Arc<Mutex<Vec<DomainEvent>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of everything delivered so far
    pub fn events(&self) -> Vec<DomainEvent> {
        self.events.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Event names in delivery order
    pub fn names(&self) -> Vec<&'static str> {
        self.events
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .map(DomainEvent::name)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.events.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.events.lock().unwrap_or_else(|e| e.into_inner()).clear();
    }
}

impl EventSink for MemorySink {
    fn deliver(&self, event: DomainEvent) {
        self.events
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(event);
    }
}
