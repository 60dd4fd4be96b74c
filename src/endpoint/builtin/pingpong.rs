//! `PingPong`: a plugin that bats `<ping/>` and `<pong/>` stanzas around.
//!
//! The plugin watches for stanzas, updates its state, triggers an event that
//! bound listeners can react to, and then checks whether a listener asked it
//! to stop. A stopped plugin ends the stream instead of replying.

use std::any::Any;

use tracing::debug;

use crate::endpoint::io::Io;
use crate::endpoint::payload::Payload;
use crate::endpoint::traits::Handler;

/// Ping stanza.
pub const PING: &str = "<ping/>";
/// Pong stanza.
pub const PONG: &str = "<pong/>";
/// End-of-stream marker written by the side that closes first.
pub const END_OF_STREAM: &str = "</stream>";

/// Events triggered by `PingPong` before it replies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub enum PingPongEvent {
    ReceivedPing,
    ReceivedPong,
}

/// The part of a `PingPong` that listeners may inspect and change.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PingPongState {
    stopped: bool,
    pings: u64,
    pongs: u64,
}

impl PingPongState {
    /// Ask the plugin to end the stream at its next stanza.
    pub fn stop(&mut self) {
        self.stopped = true;
    }

    /// Returns `true` once `stop` has been called.
    pub fn is_stopped(&self) -> bool {
        self.stopped
    }

    /// Pings received so far.
    pub fn pings_received(&self) -> u64 {
        self.pings
    }

    /// Pongs received so far.
    pub fn pongs_received(&self) -> u64 {
        self.pongs
    }
}

/// Observer of `PingPong` events. Any number may be bound to one plugin;
/// they are notified in bind order.
pub trait Listener {
    fn on_event(&mut self, event: PingPongEvent, state: &mut PingPongState);
}

/// The client plugin: stops the exchange once more than `limit` pongs have
/// arrived.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PongLimit {
    pub limit: u64,
    pub pongs: u64,
}

impl PongLimit {
    /// Default pong limit of the demo client.
    pub const DEFAULT_LIMIT: u64 = 2;

    pub fn new(limit: u64) -> Self {
        PongLimit { limit, pongs: 0 }
    }
}

impl Default for PongLimit {
    fn default() -> Self {
        PongLimit::new(Self::DEFAULT_LIMIT)
    }
}

impl Listener for PongLimit {
    fn on_event(&mut self, event: PingPongEvent, state: &mut PingPongState) {
        if event == PingPongEvent::ReceivedPong {
            self.pongs += 1;
            if self.pongs > self.limit {
                state.stop();
            }
        }
    }
}

/// Ping/pong plugin.
///
/// The initiating side writes `<ping/>` when opened. Each side answers a ping
/// with a pong and a pong with a ping until stopped. A stopped side writes
/// `</stream>` and shuts down; the other side shuts down when the marker
/// arrives.
pub struct PingPong {
    initiator: bool,
    state: PingPongState,
    listeners: Vec<Box<dyn Listener>>,
    /// Every event triggered, in order.
    pub events: Vec<PingPongEvent>,
}

impl PingPong {
    /// A responding side: waits for the first ping.
    pub fn new() -> Self {
        PingPong {
            initiator: false,
            state: PingPongState::default(),
            listeners: Vec::new(),
            events: Vec::new(),
        }
    }

    /// An initiating side: pings as soon as it is opened.
    pub fn initiator() -> Self {
        PingPong { initiator: true, ..PingPong::new() }
    }

    /// The demo client: an initiator bound to a [`PongLimit`].
    pub fn client(pong_limit: u64) -> Self {
        PingPong::initiator().bind(PongLimit::new(pong_limit))
    }

    /// Bind a listener.
    pub fn bind(mut self, listener: impl Listener + 'static) -> Self {
        self.listeners.push(Box::new(listener));
        self
    }

    /// End the exchange at the next stanza.
    pub fn stop(&mut self) -> &mut Self {
        self.state.stop();
        self
    }

    /// Current plugin state.
    pub fn state(&self) -> &PingPongState {
        &self.state
    }

    pub fn send_ping(&self, io: &mut Io<'_>) {
        io.write(PING);
    }

    pub fn send_pong(&self, io: &mut Io<'_>) {
        io.write(PONG);
    }

    fn trigger(&mut self, event: PingPongEvent) {
        self.events.push(event);
        for listener in self.listeners.iter_mut() {
            listener.on_event(event, &mut self.state);
        }
    }

    fn close(&self, io: &mut Io<'_>) {
        io.write(END_OF_STREAM);
        io.shutdown();
    }
}

impl Default for PingPong {
    fn default() -> Self {
        Self::new()
    }
}

impl Handler for PingPong {
    fn on_open(&mut self, io: &mut Io<'_>) {
        if self.initiator {
            self.send_ping(io);
        }
    }

    fn on_data(&mut self, io: &mut Io<'_>, payload: Payload) {
        match payload.as_text() {
            Some(PING) => {
                self.state.pings += 1;
                self.trigger(PingPongEvent::ReceivedPing);
                if self.state.stopped {
                    self.close(io);
                } else {
                    self.send_pong(io);
                }
            }
            Some(PONG) => {
                self.state.pongs += 1;
                self.trigger(PingPongEvent::ReceivedPong);
                if self.state.stopped {
                    self.close(io);
                } else {
                    self.send_ping(io);
                }
            }
            Some(END_OF_STREAM) => {
                self.state.stop();
                io.shutdown();
            }
            _ => debug!(endpoint = %io.name(), %payload, "no handler for stanza"),
        }
    }

    fn as_any(&self) -> Option<&dyn Any> {
        Some(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pong_limit_stops_after_exceeding() {
        let mut limit = PongLimit::new(2);
        let mut state = PingPongState::default();
        for _ in 0..2 {
            limit.on_event(PingPongEvent::ReceivedPong, &mut state);
            assert!(!state.is_stopped());
        }
        limit.on_event(PingPongEvent::ReceivedPong, &mut state);
        assert!(state.is_stopped());
        assert_eq!(limit.pongs, 3);
    }

    #[test]
    fn test_pong_limit_ignores_pings() {
        let mut limit = PongLimit::default();
        let mut state = PingPongState::default();
        for _ in 0..10 {
            limit.on_event(PingPongEvent::ReceivedPing, &mut state);
        }
        assert!(!state.is_stopped());
        assert_eq!(limit.pongs, 0);
    }

    #[test]
    fn test_listeners_notified_in_bind_order() {
        struct Log(std::rc::Rc<std::cell::RefCell<Vec<&'static str>>>, &'static str);
        impl Listener for Log {
            fn on_event(&mut self, _event: PingPongEvent, _state: &mut PingPongState) {
                self.0.borrow_mut().push(self.1);
            }
        }

        let seen = std::rc::Rc::new(std::cell::RefCell::new(Vec::new()));
        let mut pp = PingPong::new().bind(Log(seen.clone(), "first")).bind(Log(seen.clone(), "second"));
        pp.trigger(PingPongEvent::ReceivedPing);
        assert_eq!(*seen.borrow(), vec!["first", "second"]);
        assert_eq!(pp.events, vec![PingPongEvent::ReceivedPing]);
    }

    #[test]
    fn test_stop_is_sticky() {
        let mut pp = PingPong::client(5);
        assert!(!pp.state().is_stopped());
        pp.stop();
        assert!(pp.state().is_stopped());
    }
}
