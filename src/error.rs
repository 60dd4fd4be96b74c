//! Structured error types for the loopback scheduler.
//!
//! Only faults that halt the run surface here. A missing peer or a missing
//! callback is not an error.

use thiserror::Error;

use crate::endpoint::EndpointId;

/// Errors that stop a simulation run.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub enum LoopbackError {
    /// An endpoint id was referenced but is not registered.
    #[error("endpoint {0} is not registered")]
    UnknownEndpoint(EndpointId),

    /// A timer deadline does not fit on the clock.
    #[error("timer overflow: cannot schedule {delay} ticks after T={now}")]
    TimeOverflow {
        /// Clock value when the timer was requested
        now: u64,
        /// Requested delay in ticks
        delay: u64,
    },

    /// A handler reported a fault through `Io::abort`.
    #[error("endpoint {endpoint} aborted the run: {reason}")]
    Aborted {
        /// Identity of the endpoint whose handler failed
        endpoint: String,
        /// Reason supplied by the handler
        reason: String,
    },

    /// The configured step limit was reached before the queue drained.
    #[error("step limit of {limit} iterations reached with work still queued")]
    StepLimitExceeded {
        /// Configured limit
        limit: u64,
    },
}

/// Convenience alias for `Result<T, LoopbackError>`.
pub type LoopbackResult<T> = Result<T, LoopbackError>;
