//! Units of deferred work held by the scheduler queue.
//!
//! Every effect in a loopback run is a `ScheduledItem`: a delivery of
//! written data to a peer, a timer, or a bare notification. Items are plain
//! owned values; the queue moves them, never clones them.

use crate::endpoint::{EndpointId, Io, Payload};
use crate::time::VirtualTime;

/// Zero-argument callback fired after an item is processed.
///
/// It runs with the `Io` of the endpoint that scheduled the item, so a
/// completion can write, shut down, or arm another timer.
pub type Completion = Box<dyn FnOnce(&mut Io<'_>)>;

// ── Item ID ───────────────────────────────────────────────────────────

/// A strictly increasing item identifier, assigned at enqueue time.
///
/// A timer that is pushed back to the end of the queue keeps its id, so the
/// id reflects creation order, not processing order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct ItemId(u64);

impl ItemId {
    /// Wrap a raw u64.
    #[inline]
    pub fn new(raw: u64) -> Self {
        ItemId(raw)
    }

    /// Return the raw value.
    #[inline]
    pub fn raw(self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for ItemId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Monotonic `ItemId` generator. One per scheduler.
#[derive(Debug, Clone, Default)]
pub struct ItemIdGen {
    next: u64,
}

impl ItemIdGen {
    /// Create a generator starting at 0.
    pub fn new() -> Self {
        ItemIdGen { next: 0 }
    }

    /// Mint the next id.
    pub fn next_id(&mut self) -> ItemId {
        let id = ItemId(self.next);
        self.next += 1;
        id
    }

    /// Peek at the next id without consuming it.
    pub fn peek(&self) -> ItemId {
        ItemId(self.next)
    }
}

// ── Item kind ─────────────────────────────────────────────────────────

/// What the loop does with an item when it reaches the front.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemKind {
    /// Hand `payload` to the reader of endpoint `to`, then fire the
    /// completion.
    Delivery {
        to: EndpointId,
        payload: Payload,
    },
    /// A time-gated completion. Never carries data.
    Timer { deadline: VirtualTime },
    /// No action and no payload: the completion fires as soon as the item
    /// is dequeued. `shutdown` uses this to order a close behind every
    /// delivery queued before it.
    Notify,
}

impl std::fmt::Display for ItemKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ItemKind::Delivery { to, payload } => write!(f, "Deliver(→ {}, {})", to, payload),
            ItemKind::Timer { deadline } => write!(f, "Timer({})", deadline),
            ItemKind::Notify => write!(f, "Notify"),
        }
    }
}

// ── ScheduledItem ─────────────────────────────────────────────────────

/// A single entry of the scheduler queue.
pub struct ScheduledItem {
    /// Creation-order identifier.
    pub id: ItemId,
    /// Endpoint that scheduled the item; its `Io` is handed to `completion`.
    pub origin: EndpointId,
    /// Action selector.
    pub kind: ItemKind,
    /// Callback fired once the item is done.
    pub completion: Option<Completion>,
}

impl ScheduledItem {
    /// Returns `true` for delivery items, the only kind with an action.
    pub fn has_action(&self) -> bool {
        matches!(self.kind, ItemKind::Delivery { .. })
    }
}

impl std::fmt::Debug for ScheduledItem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScheduledItem")
            .field("id", &self.id)
            .field("origin", &self.origin)
            .field("kind", &self.kind)
            .field("completion", &self.completion.is_some())
            .finish()
    }
}
