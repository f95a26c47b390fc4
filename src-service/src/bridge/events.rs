//! Single-slot event bridge.
//!
//! At most one sink is attached at a time; attaching replaces the previous
//! sink. Forwarding never blocks and never fails: with no sink attached, or
//! with the sink's queue full, events are dropped.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use assistlens_common::ipc::EventPayload;
use assistlens_common::{ErrorCode, RecognitionEvent};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tracing::{debug, warn};

/// Events queued per sink before new ones are dropped.
pub const EVENT_QUEUE_CAPACITY: usize = 64;

/// Receiving end of an event sink, owned by the consumer.
pub type EventReceiver = mpsc::Receiver<EventPayload>;

/// Sending end of an event sink, held by the bridge.
pub type EventSink = mpsc::Sender<EventPayload>;

/// Identifies one attachment so a stale consumer cannot detach its successor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SinkId(u64);

struct Slot {
    id: SinkId,
    sink: EventSink,
}

/// Shared handle to the event sink slot.
///
/// Cloning is cheap; all clones publish into the same slot.
#[derive(Clone, Default)]
pub struct EventBridge {
    slot: Arc<Mutex<Option<Slot>>>,
    next_id: Arc<AtomicU64>,
}

impl EventBridge {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a sink/receiver pair suitable for [`EventBridge::attach`].
    pub fn channel() -> (EventSink, EventReceiver) {
        mpsc::channel(EVENT_QUEUE_CAPACITY)
    }

    fn lock(&self) -> MutexGuard<'_, Option<Slot>> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Attach a sink, replacing any previous one.
    pub fn attach(&self, sink: EventSink) -> SinkId {
        let id = SinkId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let previous = self.lock().replace(Slot { id, sink });
        if let Some(previous) = previous {
            debug!("Event sink {:?} replaced by {:?}", previous.id, id);
        } else {
            debug!("Event sink {:?} attached", id);
        }
        id
    }

    /// Detach whatever sink is attached.
    pub fn detach(&self) {
        if let Some(slot) = self.lock().take() {
            debug!("Event sink {:?} detached", slot.id);
        }
    }

    /// Detach `id` if it is still the attached sink.
    ///
    /// Returns whether anything was detached.
    pub fn detach_sink(&self, id: SinkId) -> bool {
        let mut slot = self.lock();
        if slot.as_ref().is_some_and(|s| s.id == id) {
            *slot = None;
            debug!("Event sink {:?} detached", id);
            true
        } else {
            false
        }
    }

    /// Whether a sink is currently attached.
    #[cfg(test)]
    pub fn is_attached(&self) -> bool {
        self.lock().is_some()
    }

    /// Forward a success value (`LISTENING_STARTED` or a transcript).
    pub fn success(&self, value: impl Into<String>) {
        self.forward(EventPayload::Success {
            value: value.into(),
        });
    }

    /// Forward an error triple.
    pub fn error(&self, code: ErrorCode, message: impl Into<String>, details: Option<i32>) {
        self.forward(EventPayload::Error {
            code,
            message: message.into(),
            details,
        });
    }

    /// Forward a recognition event verbatim.
    pub fn publish(&self, event: RecognitionEvent) {
        self.forward(event.into());
    }

    fn forward(&self, payload: EventPayload) {
        let mut slot = self.lock();
        let Some(active) = slot.as_ref() else {
            return;
        };
        match active.sink.try_send(payload) {
            Ok(()) => {}
            Err(TrySendError::Full(dropped)) => {
                warn!("Event sink {:?} is full, dropping {:?}", active.id, dropped);
            }
            Err(TrySendError::Closed(_)) => {
                // Receiver dropped without detaching
                debug!("Event sink {:?} closed, detaching", active.id);
                *slot = None;
            }
        }
    }
}
