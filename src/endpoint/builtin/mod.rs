//! Built-in handlers: Echo, Recorder and the PingPong plugin.
//!
//! `Echo` and `Recorder` are minimal reference handlers for tests.
//! `PingPong` is the stanza exchange the demo binary runs.

pub mod echo;
pub mod pingpong;
pub mod recorder;

pub use echo::Echo;
pub use pingpong::{Listener, PingPong, PingPongEvent, PingPongState, PongLimit};
pub use recorder::Recorder;
