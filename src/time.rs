//! Logical clock for the loopback scheduler.
//!
//! Time is a tick counter owned by the `Scheduler`. It moves forward by one
//! tick per loop iteration and jumps forward only when an idle timer is
//! allowed to reach its deadline. Nothing in the crate reads the wall clock.

/// A point on the scheduler's logical clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct VirtualTime(u64);

impl VirtualTime {
    /// The clock value of a freshly created scheduler.
    pub const ZERO: VirtualTime = VirtualTime(0);

    /// Create a `VirtualTime` from a raw tick value.
    #[inline]
    pub fn new(ticks: u64) -> Self {
        VirtualTime(ticks)
    }

    /// Return the raw tick value.
    #[inline]
    pub fn ticks(self) -> u64 {
        self.0
    }

    /// The time `delay` ticks after `self`, or `None` on overflow.
    #[inline]
    pub fn plus(self, delay: u64) -> Option<VirtualTime> {
        self.0.checked_add(delay).map(VirtualTime)
    }

    /// The next tick. Saturates at `u64::MAX`.
    #[inline]
    pub fn next(self) -> VirtualTime {
        VirtualTime(self.0.saturating_add(1))
    }

    /// Returns `true` if `self` is strictly before `other`.
    #[inline]
    pub fn is_before(self, other: VirtualTime) -> bool {
        self.0 < other.0
    }
}

impl std::fmt::Display for VirtualTime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "T={}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_is_default() {
        assert_eq!(VirtualTime::ZERO, VirtualTime::default());
        assert_eq!(VirtualTime::ZERO.ticks(), 0);
    }

    #[test]
    fn test_plus() {
        assert_eq!(VirtualTime::new(7).plus(3), Some(VirtualTime::new(10)));
        assert!(VirtualTime::new(u64::MAX).plus(1).is_none());
    }

    #[test]
    fn test_next_saturates() {
        assert_eq!(VirtualTime::new(4).next(), VirtualTime::new(5));
        assert_eq!(VirtualTime::new(u64::MAX).next(), VirtualTime::new(u64::MAX));
    }

    #[test]
    fn test_is_before_is_strict() {
        let a = VirtualTime::new(1);
        let b = VirtualTime::new(2);
        assert!(a.is_before(b));
        assert!(!b.is_before(a));
        assert!(!a.is_before(a));
    }

    #[test]
    fn test_display() {
        assert_eq!(VirtualTime::new(42).to_string(), "T=42");
    }
}
