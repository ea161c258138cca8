//! In-process event bus backed by a `tokio::sync::broadcast` channel.
//!
//! [`EventBus`] is the publish/subscribe hub for [`StudioEvent`]s. It is
//! shared via `Arc<EventBus>` across the stores, the orchestrator, and the
//! UI subscription layer.

use serde::Serialize;
use tokio::sync::broadcast;
use uuid::Uuid;

use atelier_core::batch::{BatchOutcome, BatchProgress};
use atelier_core::types::DbId;

// ---------------------------------------------------------------------------
// StudioEvent
// ---------------------------------------------------------------------------

/// A state change the UI may need to re-render from.
///
/// Version events identify the entity axis with `entity` (for example
/// `"character_profile"` vs `"character_image"`) so subscribers can ignore
/// axes they do not display.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StudioEvent {
    VersionCreated {
        entity: &'static str,
        parent_id: DbId,
        version_id: DbId,
        is_active: bool,
    },
    VersionActivated {
        entity: &'static str,
        parent_id: DbId,
        version_id: DbId,
    },
    VersionRenamed {
        entity: &'static str,
        parent_id: DbId,
        version_id: DbId,
    },
    VersionDeleted {
        entity: &'static str,
        parent_id: DbId,
        version_id: DbId,
        /// The version promoted in its place, when one remains.
        new_active_id: Option<DbId>,
    },
    VersionRestored {
        entity: &'static str,
        parent_id: DbId,
        version_id: DbId,
    },
    BatchStarted {
        run_id: Uuid,
        total_count: usize,
    },
    /// Emitted before the worker call for the item, so a hanging item is
    /// visibly in progress.
    BatchItemStarted {
        run_id: Uuid,
        progress: BatchProgress,
    },
    BatchItemCompleted {
        run_id: Uuid,
        index: usize,
        label: String,
        version_id: DbId,
    },
    BatchItemFailed {
        run_id: Uuid,
        index: usize,
        label: String,
        error: String,
    },
    BatchCompleted {
        run_id: Uuid,
        outcome: BatchOutcome,
    },
}

// ---------------------------------------------------------------------------
// EventBus
// ---------------------------------------------------------------------------

/// Default buffer capacity for the broadcast channel.
const DEFAULT_CAPACITY: usize = 1024;

/// In-process fan-out event bus.
///
/// Wraps a [`broadcast::Sender`] so any number of subscribers independently
/// receive every published event. Publishing with zero subscribers is a
/// silent no-op.
pub struct EventBus {
    sender: broadcast::Sender<StudioEvent>,
}

impl EventBus {
    /// Create a bus with a specific channel capacity.
    ///
    /// When the buffer is full the oldest un-consumed events are dropped and
    /// slow receivers observe `RecvError::Lagged`.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish an event to all current subscribers.
    pub fn publish(&self, event: StudioEvent) {
        // SendError only means there are zero receivers.
        let _ = self.sender.send(event);
    }

    /// Subscribe to all events published on this bus.
    pub fn subscribe(&self) -> broadcast::Receiver<StudioEvent> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
