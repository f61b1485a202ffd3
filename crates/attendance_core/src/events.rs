//! In-process notification bus.
//!
//! # Responsibility
//! - Let stores announce mutations to presentation-layer subscribers.
//! - Keep roster and attendance event taxonomies as distinct types so a
//!   subscriber always knows which store spoke.
//!
//! # Invariants
//! - Publishing is synchronous and fans out in registration order.
//! - Each successful mutation publishes its own event. Marking on a new date
//!   publishes `session_created` before `attendance_marked`.
//! - No queuing, no background dispatch.

use std::fmt::{Debug, Formatter};

/// Mutation events raised by the roster store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RosterEvent {
    Added(String),
    Updated(String),
    Deleted(String),
    Loaded,
}

impl RosterEvent {
    /// Stable event name used in logs.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Added(_) => "add",
            Self::Updated(_) => "update",
            Self::Deleted(_) => "delete",
            Self::Loaded => "load",
        }
    }

    /// Affected student id, `None` for bulk loads.
    pub fn student_id(&self) -> Option<&str> {
        match self {
            Self::Added(id) | Self::Updated(id) | Self::Deleted(id) => Some(id.as_str()),
            Self::Loaded => None,
        }
    }
}

/// Mutation events raised by the attendance store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttendanceEvent {
    SessionCreated(String),
    AttendanceMarked(String),
    SessionDeleted(String),
    AttendanceDeleted(String),
    Loaded,
}

impl AttendanceEvent {
    /// Stable event name used in logs.
    pub fn name(&self) -> &'static str {
        match self {
            Self::SessionCreated(_) => "session_created",
            Self::AttendanceMarked(_) => "attendance_marked",
            Self::SessionDeleted(_) => "session_deleted",
            Self::AttendanceDeleted(_) => "attendance_deleted",
            Self::Loaded => "load",
        }
    }

    /// Affected session date, `None` for bulk loads.
    pub fn date(&self) -> Option<&str> {
        match self {
            Self::SessionCreated(date)
            | Self::AttendanceMarked(date)
            | Self::SessionDeleted(date)
            | Self::AttendanceDeleted(date) => Some(date.as_str()),
            Self::Loaded => None,
        }
    }
}

/// Typed subscriber contract.
///
/// Closures taking `&E` implement this automatically.
pub trait EventSubscriber<E> {
    fn on_event(&mut self, event: &E);
}

impl<E, F> EventSubscriber<E> for F
where
    F: FnMut(&E),
{
    fn on_event(&mut self, event: &E) {
        self(event)
    }
}

/// Handle returned by `EventBus::subscribe`, used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SubscriptionId(u64);

/// Ordered fan-out list of subscribers for one event type.
pub struct EventBus<E> {
    subscribers: Vec<(SubscriptionId, Box<dyn EventSubscriber<E> + Send>)>,
    next_id: u64,
}

impl<E> Default for EventBus<E> {
    fn default() -> Self {
        Self {
            subscribers: Vec::new(),
            next_id: 0,
        }
    }
}

impl<E> Debug for EventBus<E> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("subscribers", &self.subscribers.len())
            .finish()
    }
}

impl<E> EventBus<E> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers one subscriber at the end of the fan-out order.
    pub fn subscribe(
        &mut self,
        subscriber: impl EventSubscriber<E> + Send + 'static,
    ) -> SubscriptionId {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        self.subscribers.push((id, Box::new(subscriber)));
        id
    }

    /// Removes one subscriber; returns whether it was registered.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.subscribers.len();
        self.subscribers.retain(|(existing, _)| *existing != id);
        before != self.subscribers.len()
    }

    pub fn len(&self) -> usize {
        self.subscribers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subscribers.is_empty()
    }

    /// Delivers `event` to every subscriber, in registration order.
    pub fn publish(&mut self, event: &E) {
        for (_, subscriber) in &mut self.subscribers {
            subscriber.on_event(event);
        }
    }
}
