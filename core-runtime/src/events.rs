//! # Event Bus System
//!
//! Typed change notifications for the playback session, fanned out with a
//! `broadcast` channel.
//!
//! ## Overview
//!
//! The session controller publishes its authoritative state as `watch`
//! snapshots. The event bus complements that with a log of *what changed*:
//! track transitions, queue edits, focus changes and rejected commands. UI
//! clients, analytics and the host logger subscribe independently.
//!
//! ```text
//! ┌────────────────────┐   emit    ┌───────────┐   subscribe   ┌────────────┐
//! │ Session controller ├──────────>│ EventBus  ├──────────────>│ Subscriber │
//! └────────────────────┘           │ (broadcast│               └────────────┘
//! ┌────────────────────┐   emit    │  channel) │   subscribe   ┌────────────┐
//! │ Service facade     ├──────────>│           ├──────────────>│ Subscriber │
//! └────────────────────┘           └───────────┘               └────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust
//! use core_runtime::events::{CoreEvent, EventBus, SessionEvent};
//!
//! let bus = EventBus::new(100);
//! let mut subscriber = bus.subscribe();
//!
//! bus.emit(CoreEvent::Session(SessionEvent::Activated)).ok();
//! assert_eq!(
//!     subscriber.try_recv().unwrap(),
//!     CoreEvent::Session(SessionEvent::Activated)
//! );
//! ```
//!
//! ## Error Handling
//!
//! - **`RecvError::Lagged(n)`**: the subscriber missed `n` events. Non-fatal;
//!   snapshot consumers should re-read the latest `watch` value.
//! - **`RecvError::Closed`**: every sender is gone, i.e. the session shut down.
//!
//! Emitting with no subscribers returns an error; publishers treat that as
//! fire-and-forget (`emit(..).ok()`).

use bridge_traits::focus::FocusChange;
use core_async::sync::broadcast;
use serde::{Deserialize, Serialize};
use std::fmt;

pub use core_async::sync::broadcast::error::{RecvError, SendError};
pub use core_async::sync::broadcast::Receiver;

/// Default buffer size for the event bus channel.
pub const DEFAULT_EVENT_BUFFER_SIZE: usize = 100;

// ============================================================================
// Core Event Types
// ============================================================================

/// Top-level event published on the bus.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", content = "payload")]
pub enum CoreEvent {
    /// Transport state and track transitions.
    Playback(PlaybackEvent),
    /// Play queue edits.
    Queue(QueueEvent),
    /// Session lifecycle, focus and access control.
    Session(SessionEvent),
}

impl CoreEvent {
    /// Returns a human-readable description of the event.
    pub fn description(&self) -> &str {
        match self {
            CoreEvent::Playback(e) => e.description(),
            CoreEvent::Queue(e) => e.description(),
            CoreEvent::Session(e) => e.description(),
        }
    }

    /// Returns the severity level of the event.
    pub fn severity(&self) -> EventSeverity {
        match self {
            CoreEvent::Playback(PlaybackEvent::Error {
                recoverable: false, ..
            }) => EventSeverity::Error,
            CoreEvent::Playback(PlaybackEvent::Error { .. }) => EventSeverity::Warning,
            CoreEvent::Session(SessionEvent::CommandRejected { .. })
            | CoreEvent::Session(SessionEvent::ClientRejected { .. }) => EventSeverity::Warning,
            CoreEvent::Session(SessionEvent::Activated)
            | CoreEvent::Session(SessionEvent::Deactivated)
            | CoreEvent::Session(SessionEvent::DelayedStopFired)
            | CoreEvent::Playback(PlaybackEvent::TrackChanged { .. })
            | CoreEvent::Queue(QueueEvent::Replaced { .. }) => EventSeverity::Info,
            _ => EventSeverity::Debug,
        }
    }
}

impl From<PlaybackEvent> for CoreEvent {
    fn from(event: PlaybackEvent) -> Self {
        CoreEvent::Playback(event)
    }
}

impl From<QueueEvent> for CoreEvent {
    fn from(event: QueueEvent) -> Self {
        CoreEvent::Queue(event)
    }
}

impl From<SessionEvent> for CoreEvent {
    fn from(event: SessionEvent) -> Self {
        CoreEvent::Session(event)
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
// Playback Events
// ============================================================================

/// Transport-level changes.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum PlaybackEvent {
    /// A new state snapshot was published.
    StateChanged {
        /// `stopped`, `paused`, `playing` or `error`.
        state: String,
        position_ms: u64,
        /// Queue item id of the active entry, if any.
        active_queue_id: Option<u64>,
    },
    /// The active queue entry changed.
    TrackChanged { media_id: String, title: String },
    /// The engine reached the end of the active entry.
    TrackEnded { media_id: String },
    /// Engine or session failure.
    Error {
        message: String,
        /// Whether the session can continue after this error.
        recoverable: bool,
    },
}

impl PlaybackEvent {
    fn description(&self) -> &str {
        match self {
            PlaybackEvent::StateChanged { .. } => "Playback state changed",
            PlaybackEvent::TrackChanged { .. } => "Active track changed",
            PlaybackEvent::TrackEnded { .. } => "Track reached its end",
            PlaybackEvent::Error { .. } => "Playback error",
        }
    }
}

// ============================================================================
// Queue Events
// ============================================================================

/// Play queue edits.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum QueueEvent {
    /// The queue was replaced wholesale.
    Replaced {
        len: usize,
        /// `-1` when the new queue has no active entry.
        active_index: i64,
    },
    /// An entry was inserted.
    EntryAdded { media_id: String, index: usize },
    /// An entry was removed.
    EntryRemoved { media_id: String },
}

impl QueueEvent {
    fn description(&self) -> &str {
        match self {
            QueueEvent::Replaced { .. } => "Queue replaced",
            QueueEvent::EntryAdded { .. } => "Queue entry added",
            QueueEvent::EntryRemoved { .. } => "Queue entry removed",
        }
    }
}

// ============================================================================
// Session Events
// ============================================================================

/// Session lifecycle, audio focus and access control.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum SessionEvent {
    /// The session became active (clients may show it as current).
    Activated,
    /// The session became inactive.
    Deactivated,
    /// The OS audio policy changed our focus.
    FocusChanged { change: FocusChange },
    /// A delayed stop was armed after a permanent focus loss.
    DelayedStopArmed { timeout_ms: u64 },
    /// The delayed stop fired and stopped the session.
    DelayedStopFired,
    /// A later command cancelled the delayed stop.
    DelayedStopCancelled,
    /// A transport command was refused.
    CommandRejected { command: String, reason: String },
    /// A UI client failed the access check.
    ClientRejected { package: String },
}

impl SessionEvent {
    fn description(&self) -> &str {
        match self {
            SessionEvent::Activated => "Session activated",
            SessionEvent::Deactivated => "Session deactivated",
            SessionEvent::FocusChanged { .. } => "Audio focus changed",
            SessionEvent::DelayedStopArmed { .. } => "Delayed stop armed",
            SessionEvent::DelayedStopFired => "Delayed stop fired",
            SessionEvent::DelayedStopCancelled => "Delayed stop cancelled",
            SessionEvent::CommandRejected { .. } => "Command rejected",
            SessionEvent::ClientRejected { .. } => "Client rejected",
        }
    }
}

// ============================================================================
// Event Bus
// ============================================================================

/// Central broadcast channel for [`CoreEvent`]s.
///
/// Cloning the bus is cheap; all clones publish into the same channel.
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<CoreEvent>,
}

impl EventBus {
    /// Creates a new event bus.
    ///
    /// `capacity` is the number of events buffered per subscriber before it
    /// starts receiving `RecvError::Lagged`.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Publishes an event to all subscribers.
    ///
    /// Returns the number of subscribers that received the event, or an
    /// error if there are none.
    pub fn emit(&self, event: CoreEvent) -> Result<usize, SendError<CoreEvent>> {
        self.sender.send(event)
    }

    /// Creates a new subscriber. Past events are not replayed.
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
// Event Stream Wrapper
// ============================================================================

type EventFilter = Box<dyn Fn(&CoreEvent) -> bool + Send + Sync>;

/// A `broadcast::Receiver` with optional filtering.
///
/// ```rust
/// use core_runtime::events::{CoreEvent, EventBus, EventStream};
///
/// let bus = EventBus::new(100);
/// let queue_only = EventStream::new(bus.subscribe())
///     .filter(|event| matches!(event, CoreEvent::Queue(_)));
/// ```
pub struct EventStream {
    receiver: Receiver<CoreEvent>,
    filter: Option<EventFilter>,
}

impl EventStream {
    pub fn new(receiver: Receiver<CoreEvent>) -> Self {
        Self {
            receiver,
            filter: None,
        }
    }

    /// Only events matching `predicate` will be returned.
    pub fn filter<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&CoreEvent) -> bool + Send + Sync + 'static,
    {
        self.filter = Some(Box::new(predicate));
        self
    }

    fn accepts(&self, event: &CoreEvent) -> bool {
        self.filter.as_ref().map_or(true, |filter| filter(event))
    }

    /// Receives the next event that passes the filter.
    ///
    /// # Errors
    ///
    /// `RecvError::Lagged(n)` if the subscriber fell behind by `n` events,
    /// `RecvError::Closed` once all senders have been dropped.
    pub async fn recv(&mut self) -> Result<CoreEvent, RecvError> {
        loop {
            let event = self.receiver.recv().await?;
            if self.accepts(&event) {
                return Ok(event);
            }
        }
    }

    /// Attempts to receive an event without waiting.
    ///
    /// Returns `None` if no matching event is currently buffered.
    pub fn try_recv(&mut self) -> Option<Result<CoreEvent, RecvError>> {
        loop {
            match self.receiver.try_recv() {
                Ok(event) => {
                    if self.accepts(&event) {
                        return Some(Ok(event));
                    }
                }
                Err(broadcast::error::TryRecvError::Empty) => return None,
                Err(broadcast::error::TryRecvError::Lagged(n)) => {
                    return Some(Err(RecvError::Lagged(n)))
                }
                Err(broadcast::error::TryRecvError::Closed) => return Some(Err(RecvError::Closed)),
            }
        }
    }
}

impl fmt::Debug for EventStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventStream")
            .field("has_filter", &self.filter.is_some())
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================
