//! `Echo`: writes every received payload straight back.

use std::any::Any;

use crate::endpoint::io::Io;
use crate::endpoint::payload::Payload;
use crate::endpoint::traits::Handler;

/// Echoes every payload back to the peer.
///
/// `echo_count` tracks how many payloads were echoed.
#[derive(Debug, Clone, Default)]
pub struct Echo {
    pub echo_count: u64,
}

impl Echo {
    /// Create an `Echo` with a zero count.
    pub fn new() -> Self {
        Echo { echo_count: 0 }
    }
}

impl Handler for Echo {
    fn on_data(&mut self, io: &mut Io<'_>, payload: Payload) {
        self.echo_count += 1;
        io.write(payload);
    }

    fn as_any(&self) -> Option<&dyn Any> {
        Some(self)
    }
}
