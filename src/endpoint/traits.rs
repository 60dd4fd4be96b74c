//! `Handler` trait: the protocol side of an endpoint.

use std::any::Any;

use super::io::Io;
use super::payload::Payload;

/// Trait implemented by whatever speaks a protocol over an endpoint.
///
/// A handler is bound to exactly one endpoint. The simulation calls
/// `on_open` once, synchronously, while the endpoint is being created, and
/// `on_data` every time a delivery addressed to the endpoint is dequeued.
///
/// # Contract
///
/// Implementations **must**:
/// - Route every side effect through `io` (write, shut down, arm a timer).
/// - Return promptly. There is one thread of control; a handler that
///   blocks or spins stalls the whole run.
/// - Be deterministic for equal inputs.
///
/// # Example
///
/// ```rust
/// use loopback::{Handler, Io, Payload};
///
/// struct Upper;
///
/// impl Handler for Upper {
///     fn on_data(&mut self, io: &mut Io<'_>, payload: Payload) {
///         if let Some(text) = payload.as_text() {
///             io.write(text.to_uppercase());
///         }
///     }
/// }
/// ```
pub trait Handler {
    /// Called once when the endpoint is created. Initiating sides perform
    /// their first write here.
    fn on_open(&mut self, _io: &mut Io<'_>) {}

    /// Called with every payload delivered to the endpoint.
    fn on_data(&mut self, io: &mut Io<'_>, payload: Payload);

    /// Downcast hook for `Simulation::handler`. Handlers that want to be
    /// inspected after a run return `Some(self)`.
    fn as_any(&self) -> Option<&dyn Any> {
        None
    }
}

/// A handler backed by a closure. Build one with [`from_fn`].
pub struct FnHandler<F>(F);

impl<F> Handler for FnHandler<F>
where
    F: FnMut(&mut Io<'_>, Payload),
{
    fn on_data(&mut self, io: &mut Io<'_>, payload: Payload) {
        (self.0)(io, payload)
    }
}

/// Wrap a closure as a reader.
pub fn from_fn<F>(f: F) -> FnHandler<F>
where
    F: FnMut(&mut Io<'_>, Payload),
{
    FnHandler(f)
}
