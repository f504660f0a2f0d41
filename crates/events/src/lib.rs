#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Event system for async communication in lockyard
//!
//! Every state transition of the lock manager (acquire, queue, wake,
//! release, reserve, claim) and of the resource registry is published as a
//! domain event. The CLI turns them into tracing records; library users can
//! subscribe to the channel for auditing.
//!
//! ## Architecture
//!
//! - **Domain-driven events**: `LockEvent`, `RegistryEvent`
//! - **Unified `EventEmitter` trait**: one API for raw senders and for
//!   structs that carry an optional sender
//! - **Metadata envelope**: each event travels with an `EventMeta`

pub mod meta;
pub use meta::{EventLevel, EventMeta, EventSource};

pub mod events;
pub use events::{AppEvent, FailureContext, LockEvent, QueueReason, RegistryEvent};

pub use uuid::Uuid;

use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};

/// An event together with its metadata envelope
#[derive(Debug, Clone)]
pub struct EventMessage {
    pub meta: EventMeta,
    pub event: AppEvent,
}

impl EventMessage {
    #[must_use]
    pub fn new(meta: EventMeta, event: AppEvent) -> Self {
        Self { meta, event }
    }

    /// Wrap an event with metadata derived from its domain and level
    #[must_use]
    pub fn from_event(event: AppEvent) -> Self {
        let level = EventLevel::from(event.log_level());
        let mut meta = EventMeta::new(level, event.event_source());
        meta.correlation_id = event.correlation_id();
        Self { meta, event }
    }
}

/// Sender half of the event channel
pub type EventSender = UnboundedSender<EventMessage>;

/// Receiver half of the event channel
pub type EventReceiver = UnboundedReceiver<EventMessage>;

/// Create a new event channel
#[must_use]
pub fn channel() -> (EventSender, EventReceiver) {
    tokio::sync::mpsc::unbounded_channel()
}

/// The unified trait for emitting events throughout lockyard
///
/// Implemented by the raw `EventSender` and by any component that holds an
/// optional sender. Emission never fails: a dropped receiver is ignored.
pub trait EventEmitter {
    /// Get the event sender for this emitter
    fn event_sender(&self) -> Option<&EventSender>;

    /// Emit an event with explicit metadata
    fn emit_with_meta(&self, meta: EventMeta, event: AppEvent) {
        if let Some(sender) = self.event_sender() {
            let _ = sender.send(EventMessage::new(meta, event));
        }
    }

    /// Emit an event through this emitter
    fn emit(&self, event: AppEvent) {
        self.emit_linked(event, None);
    }

    /// Emit an event as a follow-up of `parent`, returning its id
    ///
    /// The id is minted even when no receiver is attached, so callers can
    /// store it and link later events to it.
    fn emit_linked(&self, event: AppEvent, parent: Option<Uuid>) -> Uuid {
        let EventMessage { meta, event } = EventMessage::from_event(event);
        let meta = meta.with_parent(parent);
        let id = meta.event_id;
        self.emit_with_meta(meta, event);
        id
    }

    /// Emit a lock domain event
    fn emit_lock(&self, event: LockEvent) {
        self.emit(AppEvent::Lock(event));
    }

    /// Emit a registry domain event
    fn emit_registry(&self, event: RegistryEvent) {
        self.emit(AppEvent::Registry(event));
    }
}

/// Implementation of `EventEmitter` for the raw `EventSender`
impl EventEmitter for EventSender {
    fn event_sender(&self) -> Option<&EventSender> {
        Some(self)
    }
}

impl EventEmitter for Option<EventSender> {
    fn event_sender(&self) -> Option<&EventSender> {
        self.as_ref()
    }
}
