//! # Loopback: deterministic callback scheduler
//!
//! A single-threaded event loop for exercising protocol code without a
//! network. Two simulated endpoints are wired back to back; whatever one
//! writes becomes a delivery on a FIFO queue, and the loop hands it to the
//! other side's reader on a later iteration. No threads, no sockets, no
//! wall-clock time.
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────────────────────────┐
//! │          Simulation            │ ← execution loop, endpoint registry
//! │  ┌──────────────────────────┐  │
//! │  │        Scheduler         │  │ ← FIFO queue + logical clock
//! │  │  ┌────────────────────┐  │  │
//! │  │  │  ScheduledItem     │  │  │ ← delivery / timer / notify
//! │  │  └────────────────────┘  │  │
//! │  └──────────────────────────┘  │
//! │  ┌──────────┐  ┌──────────┐    │
//! │  │ Endpoint │⇄ │ Endpoint │    │ ← peers; readers are `Handler`s
//! │  └──────────┘  └──────────┘    │
//! └────────────────────────────────┘
//! ```
//!
//! ## Example
//!
//! ```rust
//! use loopback::{PingPong, Simulation};
//!
//! let mut sim = Simulation::new();
//! sim.connect("C", PingPong::client(2), "S", PingPong::new()).unwrap();
//! sim.run().unwrap();
//!
//! let lines = sim.transcript_lines();
//! assert_eq!(lines.first().map(String::as_str), Some("C: OPEN"));
//! assert_eq!(lines.last().map(String::as_str), Some("S: CLOSED"));
//! ```

pub mod config;
pub mod endpoint;
pub mod error;
pub mod item;
pub mod scheduler;
pub mod simulation;
pub mod time;

// Re-exports for convenience.
pub use config::{SchedulerConfig, TimerPolicy};
pub use endpoint::builtin::{Listener, PingPongEvent, PingPongState, PongLimit};
pub use endpoint::{
    from_fn, CloseHook, Echo, Endpoint, EndpointId, FnHandler, Handler, Io, Payload, PingPong,
    Recorder, TraceEntry, TraceKind,
};
pub use error::{LoopbackError, LoopbackResult};
pub use item::{Completion, ItemId, ItemKind, ScheduledItem};
pub use scheduler::{Queue, Scheduler};
pub use simulation::{Dispatch, Outcome, Simulation};
pub use time::VirtualTime;
