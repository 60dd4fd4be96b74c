//! Simulated endpoints and the handlers bound to them.
//!
//! An endpoint is one half of a loopback connection. Writes on one half
//! become delivery items on the scheduler queue; the loop later hands them
//! to the reader of the other half.
//!
//! # Module structure
//!
//! | Sub-module | Contents |
//! |---|---|
//! | [`id`] | [`EndpointId`] newtype |
//! | [`payload`] | [`Payload`] |
//! | [`traits`] | [`Handler`] trait, [`from_fn`] |
//! | [`io`] | [`Endpoint`] state, [`Io`] callback context |
//! | [`trace`] | [`TraceEntry`] transcript lines |
//! | [`builtin`] | [`Echo`], [`Recorder`], [`PingPong`] |

pub mod builtin;
pub mod id;
pub mod io;
pub mod payload;
pub mod trace;
pub mod traits;

pub use builtin::{Echo, PingPong, Recorder};
pub use id::EndpointId;
pub use io::{CloseHook, Endpoint, Io};
pub use payload::Payload;
pub use trace::{TraceEntry, TraceKind};
pub use traits::{from_fn, FnHandler, Handler};
