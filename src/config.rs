//! Scheduler configuration.

/// How the loop treats a timer whose deadline has not been reached yet.
///
/// Expired timers behave the same under both policies: they are pushed to
/// the back of the queue while other work remains and fire once they are the
/// last item left.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub enum TimerPolicy {
    /// Fire a not-yet-due timer on first dequeue, before its deadline.
    Parity,
    /// Never fire before the deadline. A pending timer is requeued while
    /// other work remains; once alone, the clock jumps to its deadline.
    #[default]
    Deadline,
}

impl std::fmt::Display for TimerPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TimerPolicy::Parity => write!(f, "parity"),
            TimerPolicy::Deadline => write!(f, "deadline"),
        }
    }
}

/// Knobs for a single simulation run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct SchedulerConfig {
    /// Timer handling, see [`TimerPolicy`].
    pub timer_policy: TimerPolicy,
    /// Upper bound on loop iterations for `Simulation::run`. `None` lets a
    /// non-terminating schedule spin forever.
    pub step_limit: Option<u64>,
}

impl SchedulerConfig {
    /// Early-firing timer policy, no step limit.
    pub fn parity() -> Self {
        SchedulerConfig { timer_policy: TimerPolicy::Parity, step_limit: None }
    }

    /// Set the timer policy.
    pub fn with_timer_policy(mut self, policy: TimerPolicy) -> Self {
        self.timer_policy = policy;
        self
    }

    /// Bound `Simulation::run` to `limit` iterations.
    pub fn with_step_limit(mut self, limit: u64) -> Self {
        self.step_limit = Some(limit);
        self
    }
}
