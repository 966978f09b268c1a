//! # Event Bus System
//!
//! Event-driven notifications built on `tokio::sync::broadcast`. Transfer
//! batches and recovery operations run on background tasks; the host
//! subscribes here to observe progress and completion without the core ever
//! calling back into UI code.
//!
//! ## Usage
//!
//! ```rust
//! use core_runtime::events::{CoreEvent, EventBus, TransferEvent};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let event_bus = EventBus::new(100);
//! let mut subscriber = event_bus.subscribe();
//!
//! event_bus
//!     .emit(CoreEvent::Transfer(TransferEvent::Started {
//!         batch_id: "b-1".to_string(),
//!         total: 3,
//!     }))
//!     .ok();
//!
//! let event = subscriber.recv().await.unwrap();
//! assert!(matches!(event, CoreEvent::Transfer(TransferEvent::Started { .. })));
//! # }
//! ```
//!
//! ## Error Handling
//!
//! `RecvError::Lagged(n)` means a slow subscriber missed `n` events and can
//! keep receiving; `RecvError::Closed` means all senders are gone and the
//! subscriber should exit.

use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::sync::broadcast;

// Re-export commonly used types
pub use tokio::sync::broadcast::error::{RecvError, SendError};
pub use tokio::sync::broadcast::Receiver;

/// Default buffer size for the event bus channel.
pub const DEFAULT_EVENT_BUFFER_SIZE: usize = 100;

// ============================================================================
// Core Event Types
// ============================================================================

/// Top-level event enum encompassing all event categories.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", content = "payload")]
pub enum CoreEvent {
    /// Transfer batch events
    Transfer(TransferEvent),
    /// Catalog recovery events
    Recovery(RecoveryEvent),
}

impl CoreEvent {
    /// Returns a human-readable description of the event.
    pub fn description(&self) -> &str {
        match self {
            CoreEvent::Transfer(e) => e.description(),
            CoreEvent::Recovery(e) => e.description(),
        }
    }

    /// Returns the severity level of the event.
    pub fn severity(&self) -> EventSeverity {
        match self {
            CoreEvent::Transfer(TransferEvent::Failed { .. }) => EventSeverity::Error,
            CoreEvent::Transfer(TransferEvent::Completed { .. }) => EventSeverity::Info,
            CoreEvent::Recovery(_) => EventSeverity::Info,
            _ => EventSeverity::Debug,
        }
    }
}

/// Event severity levels for filtering and logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EventSeverity {
    Debug,
    Info,
    Warning,
    Error,
}

// ============================================================================
// Transfer Events
// ============================================================================

/// Events emitted while a transfer batch runs.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum TransferEvent {
    /// Batch accepted and started on a background task.
    Started {
        /// Unique identifier for this batch.
        batch_id: String,
        /// Number of tasks in the batch.
        total: u64,
    },
    /// Progress update; `current / total` is the batch fraction. Fractions
    /// are strictly non-decreasing over the life of a batch.
    Progress {
        batch_id: String,
        /// Tasks fully processed so far.
        current: u64,
        /// Total tasks in the batch.
        total: u64,
        /// Human-readable phase message.
        message: String,
    },
    /// Batch finished; per-task outcomes are in the batch report.
    Completed {
        batch_id: String,
        succeeded: u64,
        failed: u64,
    },
    /// Batch could not run at all (device gone, worker lost).
    Failed { batch_id: String, message: String },
    /// Batch stopped early at a task boundary; prior outcomes are kept.
    Cancelled {
        batch_id: String,
        /// Tasks processed before cancellation.
        completed: u64,
    },
}

impl TransferEvent {
    fn description(&self) -> &str {
        match self {
            TransferEvent::Started { .. } => "Transfer batch started",
            TransferEvent::Progress { .. } => "Transfer in progress",
            TransferEvent::Completed { .. } => "Transfer batch completed",
            TransferEvent::Failed { .. } => "Transfer batch failed",
            TransferEvent::Cancelled { .. } => "Transfer batch cancelled",
        }
    }

    /// Progress fraction in `[0.0, 1.0]` for progress events, `None` for the
    /// other variants.
    pub fn fraction(&self) -> Option<f64> {
        match self {
            TransferEvent::Progress { current, total, .. } if *total > 0 => {
                Some((*current as f64 / *total as f64).min(1.0))
            }
            TransferEvent::Progress { .. } => Some(0.0),
            _ => None,
        }
    }
}

// ============================================================================
// Recovery Events
// ============================================================================

/// Events emitted by the catalog cache recovery paths.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum RecoveryEvent {
    /// The host-side catalog cache copies were purged.
    LocalCachePurged {
        /// Number of cache files deleted.
        deleted: u64,
        /// Number of files that could not be deleted.
        failed: u64,
    },
    /// The device-side catalog file was overwritten and removed.
    RemoteCatalogReset {
        /// Device-relative path that was reset.
        lpath: String,
    },
}

impl RecoveryEvent {
    fn description(&self) -> &str {
        match self {
            RecoveryEvent::LocalCachePurged { .. } => "Local catalog cache purged",
            RecoveryEvent::RemoteCatalogReset { .. } => "Remote catalog reset",
        }
    }
}

// ============================================================================
// Event Bus
// ============================================================================

/// Central event bus for publishing and subscribing to events.
///
/// Uses `tokio::sync::broadcast` internally: multiple producers (clone the
/// bus), multiple independent consumers (each `subscribe()` creates a new
/// receiver), non-blocking sends, lagging detection for slow subscribers.
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<CoreEvent>,
}

impl EventBus {
    /// Creates a new event bus with the specified buffer capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publishes an event to all subscribers.
    ///
    /// Returns the number of subscribers that received the event, or an error
    /// when there are none. Emitting into an empty bus is not a failure the
    /// caller needs to handle; `.ok()` is the usual idiom.
    pub fn emit(&self, event: CoreEvent) -> Result<usize, SendError<CoreEvent>> {
        self.sender.send(event)
    }

    /// Creates a new subscriber receiving all future events.
    pub fn subscribe(&self) -> Receiver<CoreEvent> {
        self.sender.subscribe()
    }

    /// Returns the number of active subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_BUFFER_SIZE)
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("subscriber_count", &self.subscriber_count())
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================
