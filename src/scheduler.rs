//! Callback queue and the scheduler that owns it.
//!
//! The queue is a plain FIFO: append at the back, pop from the front, nothing
//! else. All ordering guarantees of a loopback run follow from that, plus the
//! single exception of a timer being moved to the back by the loop.

use std::collections::VecDeque;

use tracing::trace;

use crate::config::SchedulerConfig;
use crate::endpoint::{EndpointId, Payload};
use crate::error::{LoopbackError, LoopbackResult};
use crate::item::{Completion, ItemId, ItemIdGen, ItemKind, ScheduledItem};
use crate::time::VirtualTime;

// ── Queue ─────────────────────────────────────────────────────────────

/// Ordered sequence of pending items. Insertion order is processing order.
#[derive(Debug, Default)]
pub struct Queue {
    items: VecDeque<ScheduledItem>,
}

impl Queue {
    /// Create an empty queue.
    pub fn new() -> Self {
        Queue { items: VecDeque::new() }
    }

    /// Append an item at the back.
    pub fn push_back(&mut self, item: ScheduledItem) {
        self.items.push_back(item);
    }

    /// Remove and return the front item.
    pub fn pop_front(&mut self) -> Option<ScheduledItem> {
        self.items.pop_front()
    }

    /// Returns `true` if nothing is pending.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Number of pending items.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Pending items front to back.
    pub fn iter(&self) -> impl Iterator<Item = &ScheduledItem> {
        self.items.iter()
    }
}

// ── Scheduler ─────────────────────────────────────────────────────────

/// Owns the queue, the logical clock and the id generator of one run.
///
/// Each `Simulation` holds exactly one scheduler, so independent
/// simulations never share pending work.
#[derive(Debug, Default)]
pub struct Scheduler {
    queue: Queue,
    now: VirtualTime,
    ids: ItemIdGen,
    config: SchedulerConfig,
}

impl Scheduler {
    /// Create an empty scheduler at `T=0`.
    pub fn new(config: SchedulerConfig) -> Self {
        Scheduler {
            queue: Queue::new(),
            now: VirtualTime::ZERO,
            ids: ItemIdGen::new(),
            config,
        }
    }

    /// Active configuration.
    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    /// Current clock value.
    #[inline]
    pub fn now(&self) -> VirtualTime {
        self.now
    }

    /// Enqueue a delivery of `payload` from `origin` to `to`.
    pub fn schedule_delivery(
        &mut self,
        origin: EndpointId,
        to: EndpointId,
        payload: Payload,
        completion: Option<Completion>,
    ) -> ItemId {
        self.push(origin, ItemKind::Delivery { to, payload }, completion)
    }

    /// Enqueue a timer that becomes due `delay` ticks from now.
    pub fn schedule_timer(
        &mut self,
        origin: EndpointId,
        delay: u64,
        completion: Completion,
    ) -> LoopbackResult<ItemId> {
        let deadline = self.now.plus(delay).ok_or(LoopbackError::TimeOverflow {
            now: self.now.ticks(),
            delay,
        })?;
        Ok(self.push(origin, ItemKind::Timer { deadline }, Some(completion)))
    }

    /// Enqueue a bare notification whose completion fires when dequeued.
    pub fn schedule_notify(&mut self, origin: EndpointId, completion: Completion) -> ItemId {
        self.push(origin, ItemKind::Notify, Some(completion))
    }

    /// Remove the front item and advance the clock by one tick.
    pub fn pop_next(&mut self) -> Option<ScheduledItem> {
        let item = self.queue.pop_front()?;
        self.now = self.now.next();
        Some(item)
    }

    /// Put an already-dequeued item back at the end of the queue.
    pub fn requeue(&mut self, item: ScheduledItem) {
        trace!(item = %item.id, kind = %item.kind, "requeue");
        self.queue.push_back(item);
    }

    /// Move the clock forward to `at`. Never moves it backward.
    pub fn advance_to(&mut self, at: VirtualTime) {
        if self.now.is_before(at) {
            trace!(from = %self.now, to = %at, "clock jump");
            self.now = at;
        }
    }

    /// Returns `true` if nothing is pending.
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Number of pending items.
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    /// Read-only view of the queue.
    pub fn queue(&self) -> &Queue {
        &self.queue
    }

    /// The id the next scheduled item will receive.
    pub fn next_item_id(&self) -> ItemId {
        self.ids.peek()
    }

    fn push(
        &mut self,
        origin: EndpointId,
        kind: ItemKind,
        completion: Option<Completion>,
    ) -> ItemId {
        let id = self.ids.next_id();
        self.queue.push_back(ScheduledItem { id, origin, kind, completion });
        id
    }
}
