//! Simulation execution loop.
//!
//! Drains the scheduler queue one item per iteration, synchronously, on the
//! caller's thread. Deliveries go to the peer's reader, notifications fire
//! their completion, and timers are either fired or pushed to the back of
//! the queue. The run is over exactly when the queue is empty.

use std::collections::BTreeMap;

use tracing::{debug, trace};

use crate::config::{SchedulerConfig, TimerPolicy};
use crate::endpoint::{Endpoint, EndpointId, Handler, Io, Payload, TraceEntry, TraceKind};
use crate::endpoint::trace::hash_combine;
use crate::error::{LoopbackError, LoopbackResult};
use crate::item::{Completion, ItemId, ItemKind, ScheduledItem};
use crate::scheduler::Scheduler;
use crate::time::VirtualTime;

// ── Dispatch record ───────────────────────────────────────────────────

/// What one loop iteration did with the item it dequeued.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// A payload reached endpoint `to`. `read` is `false` when that endpoint
    /// had no reader and the payload was dropped.
    Delivered { to: EndpointId, read: bool },
    /// A timer went back to the end of the queue.
    TimerRequeued { deadline: VirtualTime },
    /// A timer's completion ran.
    TimerFired { deadline: VirtualTime },
    /// A bare notification's completion ran.
    Notified,
}

/// Record of a single loop iteration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dispatch {
    pub id: ItemId,
    pub origin: EndpointId,
    /// Clock value after the iteration.
    pub time: VirtualTime,
    pub outcome: Outcome,
}

// ── Simulation ────────────────────────────────────────────────────────

/// Top-level driver: one scheduler, the endpoints it serves, and the
/// transcript they produce.
///
/// Every simulation owns its own queue, so any number can run side by side
/// without seeing each other's work.
#[derive(Debug, Default)]
pub struct Simulation {
    scheduler: Scheduler,
    endpoints: BTreeMap<EndpointId, Endpoint>,
    next_endpoint: u64,
    transcript: Vec<TraceEntry>,
    fault: Option<LoopbackError>,
    steps: u64,
}

impl Simulation {
    /// Create a simulation with the default configuration.
    pub fn new() -> Self {
        Self::with_config(SchedulerConfig::default())
    }

    /// Create a simulation with an explicit configuration.
    pub fn with_config(config: SchedulerConfig) -> Self {
        Simulation {
            scheduler: Scheduler::new(config),
            endpoints: BTreeMap::new(),
            next_endpoint: 0,
            transcript: Vec::new(),
            fault: None,
            steps: 0,
        }
    }

    // ── Endpoints ─────────────────────────────────────────────

    /// Create an endpoint bound to `handler` and open it.
    ///
    /// `peer`, if given, must already exist. To build two endpoints that
    /// point at each other use [`Simulation::connect`].
    pub fn open(
        &mut self,
        name: impl Into<String>,
        peer: Option<EndpointId>,
        handler: impl Handler + 'static,
    ) -> LoopbackResult<EndpointId> {
        if let Some(p) = peer {
            self.require(p)?;
        }
        let id = self.allocate(name.into(), peer);
        self.start(id, Box::new(handler))?;
        Ok(id)
    }

    /// Create two endpoints that forward to each other, then open `a`
    /// followed by `b`.
    ///
    /// Both peers are linked before either handler runs, so an initial write
    /// from `a`'s `on_open` is delivered to `b`.
    pub fn connect(
        &mut self,
        a_name: impl Into<String>,
        a_handler: impl Handler + 'static,
        b_name: impl Into<String>,
        b_handler: impl Handler + 'static,
    ) -> LoopbackResult<(EndpointId, EndpointId)> {
        let a = self.allocate(a_name.into(), None);
        let b = self.allocate(b_name.into(), Some(a));
        self.set_peer(a, Some(b))?;
        self.start(a, Box::new(a_handler))?;
        self.start(b, Box::new(b_handler))?;
        Ok((a, b))
    }

    /// Point `id` at a new peer, or at none.
    pub fn set_peer(&mut self, id: EndpointId, peer: Option<EndpointId>) -> LoopbackResult<()> {
        if let Some(p) = peer {
            self.require(p)?;
        }
        let endpoint = self.endpoints.get_mut(&id).ok_or(LoopbackError::UnknownEndpoint(id))?;
        endpoint.peer = peer;
        Ok(())
    }

    /// Run `f` against endpoint `id` from outside the loop, e.g. to start a
    /// shutdown from a test driver.
    pub fn with_io<R>(
        &mut self,
        id: EndpointId,
        f: impl FnOnce(&mut Io<'_>) -> R,
    ) -> LoopbackResult<R> {
        let endpoint = self.endpoints.get_mut(&id).ok_or(LoopbackError::UnknownEndpoint(id))?;
        let mut io = Io {
            scheduler: &mut self.scheduler,
            endpoint,
            transcript: &mut self.transcript,
            fault: &mut self.fault,
        };
        Ok(f(&mut io))
    }

    /// Look up an endpoint.
    pub fn endpoint(&self, id: EndpointId) -> Option<&Endpoint> {
        self.endpoints.get(&id)
    }

    /// All endpoints in id order.
    pub fn endpoints(&self) -> impl Iterator<Item = &Endpoint> {
        self.endpoints.values()
    }

    /// Downcast the reader of `id` for inspection.
    ///
    /// Returns `None` if the endpoint does not exist, has no reader, or its
    /// reader is not a `T` that opted into `Handler::as_any`.
    pub fn handler<T: 'static>(&self, id: EndpointId) -> Option<&T> {
        self.endpoints.get(&id)?.reader.as_ref()?.as_any()?.downcast_ref::<T>()
    }

    // ── Loop ──────────────────────────────────────────────────

    /// Execute one iteration.
    ///
    /// Returns `Ok(None)` when the queue is empty. Once a handler has called
    /// `Io::abort`, this and every later call return the fault.
    pub fn step(&mut self) -> LoopbackResult<Option<Dispatch>> {
        if let Some(fault) = &self.fault {
            return Err(fault.clone());
        }
        let Some(item) = self.scheduler.pop_next() else {
            return Ok(None);
        };
        self.steps += 1;

        let id = item.id;
        let origin = item.origin;
        trace!(item = %id, kind = %item.kind, now = %self.scheduler.now(), "dispatch");

        let outcome = match item.kind {
            ItemKind::Timer { deadline } => self.run_timer(item, deadline)?,
            ItemKind::Delivery { to, payload } => {
                let read = self.deliver(to, payload)?;
                // A reader fault ends the iteration before the completion.
                if let Some(fault) = &self.fault {
                    return Err(fault.clone());
                }
                if let Some(done) = item.completion {
                    self.complete(origin, done)?;
                }
                Outcome::Delivered { to, read }
            }
            ItemKind::Notify => {
                if let Some(done) = item.completion {
                    self.complete(origin, done)?;
                }
                Outcome::Notified
            }
        };

        if let Some(fault) = &self.fault {
            return Err(fault.clone());
        }
        Ok(Some(Dispatch { id, origin, time: self.scheduler.now(), outcome }))
    }

    /// Run until the queue is empty.
    ///
    /// Returns the number of iterations executed by this call. Without a
    /// configured step limit a schedule that never drains never returns.
    pub fn run(&mut self) -> LoopbackResult<u64> {
        let start = self.steps;
        let limit = self.scheduler.config().step_limit;
        while self.step()?.is_some() {
            if let Some(limit) = limit {
                if self.steps - start >= limit && !self.scheduler.is_empty() {
                    return Err(LoopbackError::StepLimitExceeded { limit });
                }
            }
        }
        Ok(self.steps - start)
    }

    /// Run until the queue is empty **or** `max_steps` iterations have
    /// executed, whichever comes first.
    pub fn run_for(&mut self, max_steps: u64) -> LoopbackResult<u64> {
        let start = self.steps;
        while self.steps - start < max_steps {
            if self.step()?.is_none() {
                break;
            }
        }
        Ok(self.steps - start)
    }

    // ── Inspection ────────────────────────────────────────────

    /// Current clock value.
    pub fn now(&self) -> VirtualTime {
        self.scheduler.now()
    }

    /// Total iterations executed.
    pub fn steps(&self) -> u64 {
        self.steps
    }

    /// Items still queued.
    pub fn pending(&self) -> usize {
        self.scheduler.len()
    }

    /// Returns `true` if the queue is empty.
    pub fn is_finished(&self) -> bool {
        self.scheduler.is_empty()
    }

    /// The fault that halted the run, if any.
    pub fn fault(&self) -> Option<&LoopbackError> {
        self.fault.as_ref()
    }

    /// The scheduler, read-only.
    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    /// Every diagnostic line so far.
    pub fn transcript(&self) -> &[TraceEntry] {
        &self.transcript
    }

    /// The transcript rendered as text lines (`C: OPEN`, `C: <ping/>`, ...).
    pub fn transcript_lines(&self) -> Vec<String> {
        self.transcript.iter().map(ToString::to_string).collect()
    }

    /// Deterministic hash of the transcript. Two runs of the same scenario
    /// produce the same fingerprint.
    pub fn fingerprint(&self) -> u64 {
        self.transcript
            .iter()
            .fold(self.transcript.len() as u64, |h, entry| hash_combine(h, entry.hash()))
    }

    // ── Internals ─────────────────────────────────────────────

    fn require(&self, id: EndpointId) -> LoopbackResult<()> {
        if self.endpoints.contains_key(&id) {
            Ok(())
        } else {
            Err(LoopbackError::UnknownEndpoint(id))
        }
    }

    fn allocate(&mut self, name: String, peer: Option<EndpointId>) -> EndpointId {
        let id = EndpointId::new(self.next_endpoint);
        self.next_endpoint += 1;
        self.endpoints.insert(id, Endpoint::new(id, name, peer));
        id
    }

    /// Trace `OPEN`, bind the handler and let it run `on_open`.
    fn start(&mut self, id: EndpointId, mut handler: Box<dyn Handler>) -> LoopbackResult<()> {
        self.with_io(id, |io| {
            io.emit(TraceKind::Open);
            let epoch = io.endpoint.reader_epoch;
            handler.on_open(io);
            // A reader attached or detached during on_open wins.
            if io.endpoint.reader_epoch == epoch {
                io.endpoint.reader = Some(handler);
            }
        })?;
        match &self.fault {
            Some(fault) => Err(fault.clone()),
            None => Ok(()),
        }
    }

    fn deliver(&mut self, to: EndpointId, payload: Payload) -> LoopbackResult<bool> {
        self.with_io(to, |io| match io.endpoint.reader.take() {
            Some(mut reader) => {
                io.endpoint.deliveries += 1;
                let epoch = io.endpoint.reader_epoch;
                reader.on_data(io, payload);
                if io.endpoint.reader_epoch == epoch {
                    io.endpoint.reader = Some(reader);
                }
                true
            }
            None => {
                debug!(endpoint = %io.endpoint.name, %payload, "no reader, delivery dropped");
                false
            }
        })
    }

    fn complete(&mut self, origin: EndpointId, done: Completion) -> LoopbackResult<()> {
        self.with_io(origin, |io| done(io))
    }

    fn run_timer(&mut self, item: ScheduledItem, deadline: VirtualTime) -> LoopbackResult<Outcome> {
        let now = self.scheduler.now();
        let expired = deadline.is_before(now);
        let policy = self.scheduler.config().timer_policy;

        if expired || policy == TimerPolicy::Deadline {
            if !self.scheduler.is_empty() {
                self.scheduler.requeue(item);
                return Ok(Outcome::TimerRequeued { deadline });
            }
            if !expired {
                self.scheduler.advance_to(deadline);
            }
        }

        if let Some(done) = item.completion {
            self.complete(item.origin, done)?;
        }
        Ok(Outcome::TimerFired { deadline })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::endpoint::{from_fn, Recorder};

    #[test]
    fn test_empty_simulation_terminates_immediately() {
        let mut sim = Simulation::new();
        assert_eq!(sim.run().unwrap(), 0);
        assert!(sim.is_finished());
        assert_eq!(sim.now(), VirtualTime::ZERO);
    }

    #[test]
    fn test_idle_endpoints_do_not_schedule() {
        let mut sim = Simulation::new();
        sim.connect("A", Recorder::new(), "B", Recorder::new()).unwrap();
        assert_eq!(sim.pending(), 0);
        assert_eq!(sim.run().unwrap(), 0);
        assert_eq!(sim.transcript_lines(), vec!["A: OPEN", "B: OPEN"]);
    }

    #[test]
    fn test_step_by_step() {
        let mut sim = Simulation::new();
        let (a, b) = sim
            .connect("A", Recorder::with_greeting(["one", "two"]), "B", Recorder::new())
            .unwrap();

        let first = sim.step().unwrap().unwrap();
        assert_eq!(first.origin, a);
        assert_eq!(first.outcome, Outcome::Delivered { to: b, read: true });
        assert_eq!(first.time, VirtualTime::new(1));

        let second = sim.step().unwrap().unwrap();
        assert!(first.id < second.id);
        assert!(sim.step().unwrap().is_none());
    }

    #[test]
    fn test_run_for_limits_steps() {
        let mut sim = Simulation::new();
        let greeting: Vec<String> = (0..20).map(|i| format!("m{}", i)).collect();
        sim.connect("A", Recorder::with_greeting(greeting), "B", Recorder::new()).unwrap();

        assert_eq!(sim.run_for(5).unwrap(), 5);
        assert_eq!(sim.steps(), 5);
        assert!(!sim.is_finished());
        assert_eq!(sim.run().unwrap(), 15);
    }

    #[test]
    fn test_step_limit_guards_runaway_schedules() {
        let config = SchedulerConfig::default().with_step_limit(50);
        let mut sim = Simulation::with_config(config);
        // Both sides answer everything: never drains.
        sim.connect(
            "A",
            from_fn(|io: &mut Io<'_>, p: Payload| {
                io.write(p);
            }),
            "B",
            from_fn(|io: &mut Io<'_>, p: Payload| {
                io.write(p);
            }),
        )
        .unwrap();
        sim.with_io(EndpointId::new(0), |io| {
            io.write("ball");
        })
        .unwrap();

        let err = sim.run().unwrap_err();
        assert_eq!(err, LoopbackError::StepLimitExceeded { limit: 50 });
        assert_eq!(sim.steps(), 50);
    }

    #[test]
    fn test_open_rejects_unknown_peer() {
        let mut sim = Simulation::new();
        let err = sim.open("A", Some(EndpointId::new(7)), Recorder::new()).unwrap_err();
        assert_eq!(err, LoopbackError::UnknownEndpoint(EndpointId::new(7)));
        assert!(sim.endpoints().next().is_none());
    }

    #[test]
    fn test_set_peer_rewires_forwarding() {
        let mut sim = Simulation::new();
        let sink = sim.open("sink", None, Recorder::new()).unwrap();
        let src = sim.open("src", None, Recorder::new()).unwrap();

        sim.with_io(src, |io| {
            io.write("lost");
        })
        .unwrap();
        sim.set_peer(src, Some(sink)).unwrap();
        sim.with_io(src, |io| {
            io.write("kept");
        })
        .unwrap();
        sim.run().unwrap();

        let rec = sim.handler::<Recorder>(sink).unwrap();
        assert_eq!(rec.payloads(), vec![Payload::text("kept")]);
        assert_eq!(sim.endpoint(src).unwrap().writes(), 2);
        assert_eq!(
            sim.set_peer(src, Some(EndpointId::new(99))),
            Err(LoopbackError::UnknownEndpoint(EndpointId::new(99)))
        );
    }

    #[test]
    fn test_handler_downcast_mismatch() {
        let mut sim = Simulation::new();
        let a = sim.open("A", None, Recorder::new()).unwrap();
        assert!(sim.handler::<Recorder>(a).is_some());
        assert!(sim.handler::<crate::endpoint::Echo>(a).is_none());
        assert!(sim.handler::<Recorder>(EndpointId::new(5)).is_none());
    }

    #[test]
    fn test_fingerprint_is_deterministic() {
        fn run() -> u64 {
            let mut sim = Simulation::new();
            sim.connect("A", Recorder::with_greeting(["x", "y"]), "B", crate::endpoint::Echo::new())
                .unwrap();
            sim.run().unwrap();
            sim.fingerprint()
        }
        assert_eq!(run(), run());
    }

    #[test]
    fn test_independent_simulations_do_not_share_queues() {
        let mut one = Simulation::new();
        let mut two = Simulation::new();
        one.connect("A", Recorder::with_greeting(["only-one"]), "B", Recorder::new()).unwrap();
        two.connect("A", Recorder::new(), "B", Recorder::new()).unwrap();

        assert_eq!(one.pending(), 1);
        assert_eq!(two.pending(), 0);
        assert_eq!(two.run().unwrap(), 0);
        assert_eq!(one.run().unwrap(), 1);
    }
}
