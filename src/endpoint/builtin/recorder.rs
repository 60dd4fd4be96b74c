//! `Recorder`: keeps every delivered payload for test assertions.

use std::any::Any;

use crate::endpoint::io::Io;
use crate::endpoint::payload::Payload;
use crate::endpoint::traits::Handler;
use crate::time::VirtualTime;

/// A sink that records what it receives and never replies.
///
/// Optionally writes a fixed set of payloads when opened, which makes it a
/// convenient initiator for ordering tests.
#[derive(Debug, Clone, Default)]
pub struct Recorder {
    /// Payloads to write from `on_open`, in order.
    pub greeting: Vec<Payload>,
    /// Every delivery, in order: `(time, payload)`.
    pub received: Vec<(VirtualTime, Payload)>,
}

impl Recorder {
    /// A silent recorder.
    pub fn new() -> Self {
        Recorder::default()
    }

    /// A recorder that writes `payloads` as soon as it is opened.
    pub fn with_greeting<I, P>(payloads: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<Payload>,
    {
        Recorder {
            greeting: payloads.into_iter().map(Into::into).collect(),
            received: Vec::new(),
        }
    }

    /// Received payloads without timestamps.
    pub fn payloads(&self) -> Vec<Payload> {
        self.received.iter().map(|(_, p)| p.clone()).collect()
    }
}

impl Handler for Recorder {
    fn on_open(&mut self, io: &mut Io<'_>) {
        for payload in &self.greeting {
            io.write(payload.clone());
        }
    }

    fn on_data(&mut self, io: &mut Io<'_>, payload: Payload) {
        self.received.push((io.now(), payload));
    }

    fn as_any(&self) -> Option<&dyn Any> {
        Some(self)
    }
}
