//! Endpoint state and the `Io` context handed to handlers.
//!
//! An `Endpoint` stands in for a socket: it has a name, an optional peer, a
//! reader and a close hook. Handlers never hold an `Endpoint` directly. For
//! the duration of a callback they get an `Io`, which borrows their endpoint
//! together with the scheduler and the transcript, and exposes the endpoint
//! operations: attach a reader, write, register a close hook, shut down,
//! close, arm a timer.

use tracing::{debug, info};

use crate::error::{LoopbackError, LoopbackResult};
use crate::item::{Completion, ItemId};
use crate::scheduler::Scheduler;
use crate::time::VirtualTime;

use super::id::EndpointId;
use super::payload::Payload;
use super::trace::{TraceEntry, TraceKind};
use super::traits::Handler;

/// Close notification. Kept after it runs, so closing twice calls it twice.
pub type CloseHook = Box<dyn FnMut(&mut Io<'_>)>;

// ── Endpoint ──────────────────────────────────────────────────────────

/// One side of a simulated transport.
pub struct Endpoint {
    pub(crate) id: EndpointId,
    pub(crate) name: String,
    pub(crate) peer: Option<EndpointId>,
    pub(crate) reader: Option<Box<dyn Handler>>,
    /// Bumped on every attach or detach, so the loop can tell whether a
    /// callback swapped the reader it is running.
    pub(crate) reader_epoch: u64,
    pub(crate) close_hook: Option<CloseHook>,
    /// Bumped whenever the close hook is set or cleared.
    pub(crate) close_epoch: u64,
    pub(crate) closed: bool,
    pub(crate) writes: u64,
    pub(crate) deliveries: u64,
}

impl Endpoint {
    pub(crate) fn new(id: EndpointId, name: String, peer: Option<EndpointId>) -> Self {
        Endpoint {
            id,
            name,
            peer,
            reader: None,
            reader_epoch: 0,
            close_hook: None,
            close_epoch: 0,
            closed: false,
            writes: 0,
            deliveries: 0,
        }
    }

    /// Registry id.
    pub fn id(&self) -> EndpointId {
        self.id
    }

    /// Identity used in diagnostics.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Where writes are forwarded, if anywhere.
    pub fn peer(&self) -> Option<EndpointId> {
        self.peer
    }

    /// Returns `true` once a close trigger has run.
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Returns `true` if a reader is attached.
    pub fn has_reader(&self) -> bool {
        self.reader.is_some()
    }

    /// Number of `write` calls, forwarded or not.
    pub fn writes(&self) -> u64 {
        self.writes
    }

    /// Number of payloads handed to a reader on this endpoint.
    pub fn deliveries(&self) -> u64 {
        self.deliveries
    }
}

impl std::fmt::Debug for Endpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Endpoint")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("peer", &self.peer)
            .field("reader", &self.reader.is_some())
            .field("close_hook", &self.close_hook.is_some())
            .field("closed", &self.closed)
            .finish()
    }
}

// ── Io ────────────────────────────────────────────────────────────────

/// Mutable view of one endpoint, passed to every handler callback.
///
/// The context borrows the scheduler mutably, so anything a handler wants
/// to happen later has to go through the queue.
pub struct Io<'a> {
    pub(crate) scheduler: &'a mut Scheduler,
    pub(crate) endpoint: &'a mut Endpoint,
    pub(crate) transcript: &'a mut Vec<TraceEntry>,
    pub(crate) fault: &'a mut Option<LoopbackError>,
}

impl<'a> Io<'a> {
    /// Id of the endpoint this context belongs to.
    pub fn id(&self) -> EndpointId {
        self.endpoint.id
    }

    /// Identity of the endpoint.
    pub fn name(&self) -> &str {
        &self.endpoint.name
    }

    /// Peer the endpoint forwards to.
    pub fn peer(&self) -> Option<EndpointId> {
        self.endpoint.peer
    }

    /// Current clock value.
    pub fn now(&self) -> VirtualTime {
        self.scheduler.now()
    }

    /// Number of items still queued.
    pub fn pending(&self) -> usize {
        self.scheduler.len()
    }

    /// Record the reader invoked when data arrives. Replaces any previous
    /// reader, including the one currently running.
    pub fn attach_reader(&mut self, reader: impl Handler + 'static) -> &mut Self {
        self.endpoint.reader = Some(Box::new(reader));
        self.endpoint.reader_epoch += 1;
        self
    }

    /// Remove the reader. Deliveries that arrive afterwards are dropped.
    pub fn detach_reader(&mut self) -> &mut Self {
        self.endpoint.reader = None;
        self.endpoint.reader_epoch += 1;
        self
    }

    /// Write `payload` to the peer.
    ///
    /// The line is always traced. Without a peer nothing else happens.
    pub fn write(&mut self, payload: impl Into<Payload>) -> &mut Self {
        self.send(payload.into(), None)
    }

    /// Write `payload` and run `completion` right after the peer's reader
    /// has consumed it.
    pub fn write_then(
        &mut self,
        payload: impl Into<Payload>,
        completion: impl FnOnce(&mut Io<'_>) + 'static,
    ) -> &mut Self {
        self.send(payload.into(), Some(Box::new(completion)))
    }

    /// Record the close notification. Last writer wins.
    pub fn on_close(&mut self, hook: impl FnMut(&mut Io<'_>) + 'static) -> &mut Self {
        self.endpoint.close_hook = Some(Box::new(hook));
        self.endpoint.close_epoch += 1;
        self
    }

    /// Close the endpoint after everything queued so far has run.
    ///
    /// A shutdown without a hook clears any hook registered earlier through
    /// `on_close`.
    pub fn shutdown(&mut self) -> ItemId {
        self.endpoint.close_hook = None;
        self.endpoint.close_epoch += 1;
        self.schedule_close()
    }

    /// Close the endpoint after everything queued so far has run, then call
    /// `hook`.
    pub fn shutdown_with(&mut self, hook: impl FnMut(&mut Io<'_>) + 'static) -> ItemId {
        self.endpoint.close_hook = Some(Box::new(hook));
        self.endpoint.close_epoch += 1;
        self.schedule_close()
    }

    /// Close immediately: trace the line, mark the endpoint closed and run
    /// the close hook if one is registered.
    ///
    /// Not idempotent. Every call traces and runs the hook again.
    pub fn close(&mut self) {
        self.endpoint.closed = true;
        self.emit(TraceKind::Closed);
        if let Some(mut hook) = self.endpoint.close_hook.take() {
            let epoch = self.endpoint.close_epoch;
            hook(self);
            // A hook that set or cleared the hook while running is not restored.
            if self.endpoint.close_epoch == epoch {
                self.endpoint.close_hook = Some(hook);
            }
        }
    }

    /// Arm a timer that becomes due `delay` ticks from now.
    pub fn set_timeout(
        &mut self,
        delay: u64,
        completion: impl FnOnce(&mut Io<'_>) + 'static,
    ) -> LoopbackResult<ItemId> {
        self.scheduler.schedule_timer(self.endpoint.id, delay, Box::new(completion))
    }

    /// Report a handler fault. The run stops after the current iteration and
    /// `Simulation::step` returns `LoopbackError::Aborted`. Only the first
    /// fault is kept.
    pub fn abort(&mut self, reason: impl Into<String>) {
        if self.fault.is_none() {
            *self.fault = Some(LoopbackError::Aborted {
                endpoint: self.endpoint.name.clone(),
                reason: reason.into(),
            });
        }
    }

    fn send(&mut self, payload: Payload, completion: Option<Completion>) -> &mut Self {
        self.endpoint.writes += 1;
        self.emit(TraceKind::Write(payload.clone()));
        match self.endpoint.peer {
            Some(to) => {
                self.scheduler.schedule_delivery(self.endpoint.id, to, payload, completion);
            }
            None => debug!(endpoint = %self.endpoint.name, "no peer, write not forwarded"),
        }
        self
    }

    fn schedule_close(&mut self) -> ItemId {
        let close: Completion = Box::new(|io: &mut Io<'_>| io.close());
        self.scheduler.schedule_notify(self.endpoint.id, close)
    }

    pub(crate) fn emit(&mut self, kind: TraceKind) {
        let entry = TraceEntry {
            time: self.scheduler.now(),
            endpoint: self.endpoint.id,
            name: self.endpoint.name.clone(),
            kind,
        };
        info!(target: "loopback::endpoint", "{}", entry);
        self.transcript.push(entry);
    }
}
