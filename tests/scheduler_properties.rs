//! Property-based tests for the loopback scheduler.
//!
//! These tests use proptest to verify invariants hold for arbitrary inputs:
//! - Writes arrive in write order
//! - Echoed data makes a full round trip
//! - A shutdown fires only after everything queued before it
//! - Timers never starve other work, and never fire early by default
//! - Identical scenarios produce identical transcripts

use std::cell::Cell;
use std::rc::Rc;

use loopback::{
    Echo, Io, Outcome, Payload, PingPong, Recorder, SchedulerConfig, Simulation, TimerPolicy,
    VirtualTime,
};
use proptest::prelude::*;

// Strategy for generating payload texts
fn messages_strategy() -> impl Strategy<Value = Vec<String>> {
    prop::collection::vec("[a-z0-9<>/]{1,12}", 0..40)
}

// Strategy for generating timer policies
fn policy_strategy() -> impl Strategy<Value = TimerPolicy> {
    prop_oneof![Just(TimerPolicy::Parity), Just(TimerPolicy::Deadline)]
}

fn received(sim: &Simulation, id: loopback::EndpointId) -> Vec<Payload> {
    sim.handler::<Recorder>(id).map(Recorder::payloads).unwrap_or_default()
}

#[test]
fn prop_writes_arrive_in_order() {
    proptest!(|(messages in messages_strategy(), policy in policy_strategy())| {
        let config = SchedulerConfig::default().with_timer_policy(policy);
        let mut sim = Simulation::with_config(config);
        let (_, b) = sim
            .connect("A", Recorder::with_greeting(messages.clone()), "B", Recorder::new())
            .unwrap();

        let steps = sim.run().unwrap();

        let expected: Vec<Payload> = messages.into_iter().map(Payload::from).collect();
        prop_assert_eq!(steps as usize, expected.len());
        prop_assert_eq!(received(&sim, b), expected);
    });
}

#[test]
fn prop_echo_round_trip() {
    proptest!(|(messages in messages_strategy())| {
        let mut sim = Simulation::new();
        let (a, b) = sim
            .connect("A", Recorder::with_greeting(messages.clone()), "B", Echo::new())
            .unwrap();

        let steps = sim.run().unwrap();

        let expected: Vec<Payload> = messages.into_iter().map(Payload::from).collect();
        prop_assert_eq!(steps as usize, 2 * expected.len());
        prop_assert_eq!(sim.handler::<Echo>(b).unwrap().echo_count as usize, expected.len());
        prop_assert_eq!(received(&sim, a), expected);
    });
}

#[test]
fn prop_close_fires_after_prior_work() {
    proptest!(|(messages in messages_strategy())| {
        let mut sim = Simulation::new();
        let (a, b) = sim.connect("A", Recorder::new(), "B", Recorder::new()).unwrap();
        let hook_runs = Rc::new(Cell::new(0u32));
        let hits = hook_runs.clone();

        let count = messages.len() as u64;
        sim.with_io(a, move |io| {
            for m in messages {
                io.write(m);
            }
            io.shutdown_with(move |_io: &mut Io<'_>| hits.set(hits.get() + 1));
        })
        .unwrap();

        while let Some(dispatch) = sim.step().unwrap() {
            if dispatch.outcome == Outcome::Notified {
                prop_assert_eq!(sim.endpoint(b).unwrap().deliveries(), count);
                prop_assert!(sim.is_finished());
            } else {
                prop_assert_eq!(hook_runs.get(), 0);
            }
        }
        prop_assert_eq!(hook_runs.get(), 1);
        prop_assert!(sim.endpoint(a).unwrap().is_closed());
    });
}

#[test]
fn prop_timer_does_not_starve_deliveries() {
    proptest!(|(messages in messages_strategy(), delay in 0u64..16)| {
        let mut sim = Simulation::new();
        let (a, b) = sim.connect("A", Recorder::new(), "B", Recorder::new()).unwrap();
        let fired_at = Rc::new(Cell::new(None));
        let slot = fired_at.clone();

        let expected: Vec<Payload> = messages
            .iter()
            .cloned()
            .map(Payload::from)
            .chain(std::iter::once(Payload::text("timer")))
            .collect();

        sim.with_io(a, move |io| {
            io.set_timeout(delay, move |io: &mut Io<'_>| {
                slot.set(Some(io.now()));
                io.write("timer");
            })
            .unwrap();
            for m in messages {
                io.write(m);
            }
        })
        .unwrap();
        sim.run().unwrap();

        // Deadline policy: all deliveries first, and never before the deadline.
        prop_assert_eq!(received(&sim, b), expected);
        let fired = fired_at.get().unwrap();
        prop_assert!(fired >= VirtualTime::new(delay));
    });
}

#[test]
fn prop_expired_timer_waits_under_parity() {
    proptest!(|(messages in messages_strategy())| {
        let mut sim = Simulation::with_config(SchedulerConfig::parity());
        let (a, b) = sim.connect("A", Recorder::new(), "B", Recorder::new()).unwrap();

        let expected: Vec<Payload> = messages
            .iter()
            .cloned()
            .map(Payload::from)
            .chain(std::iter::once(Payload::text("timer")))
            .collect();

        sim.with_io(a, move |io| {
            io.set_timeout(0, |io: &mut Io<'_>| {
                io.write("timer");
            })
            .unwrap();
            for m in messages {
                io.write(m);
            }
        })
        .unwrap();
        sim.run().unwrap();

        prop_assert_eq!(received(&sim, b), expected);
    });
}

#[test]
fn prop_pingpong_exchange_length() {
    proptest!(|(limit in 0u64..30, policy in policy_strategy())| {
        let config = SchedulerConfig::default().with_timer_policy(policy);
        let mut sim = Simulation::with_config(config);
        let (c, s) = sim.connect("C", PingPong::client(limit), "S", PingPong::new()).unwrap();

        let steps = sim.run().unwrap();

        // limit + 1 pings and pongs, one end-of-stream, two closes.
        prop_assert_eq!(steps, 2 * (limit + 1) + 1 + 2);
        prop_assert_eq!(sim.handler::<PingPong>(c).unwrap().state().pongs_received(), limit + 1);
        prop_assert_eq!(sim.handler::<PingPong>(s).unwrap().state().pings_received(), limit + 1);

        let lines = sim.transcript_lines();
        prop_assert_eq!(lines.len() as u64, 2 + 2 * (limit + 1) + 1 + 2);
        prop_assert_eq!(&lines[lines.len() - 2..], &["C: CLOSED".to_string(), "S: CLOSED".to_string()]);
    });
}

#[test]
fn prop_identical_runs_are_identical() {
    proptest!(|(messages in messages_strategy(), limit in 0u64..10)| {
        let run = |messages: Vec<String>| {
            let mut sim = Simulation::new();
            sim.connect("C", PingPong::client(limit), "S", PingPong::new()).unwrap();
            sim.connect("A", Recorder::with_greeting(messages), "B", Echo::new()).unwrap();
            sim.run().unwrap();
            (sim.transcript_lines(), sim.fingerprint(), sim.now())
        };
        prop_assert_eq!(run(messages.clone()), run(messages));
    });
}
