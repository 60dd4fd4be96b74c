//! Endpoint ID: a copyable handle into the simulation's endpoint registry.

/// Identifies one half of a simulated connection.
///
/// Ids are handed out by `Simulation` in creation order. Peers refer to each
/// other through ids, never through references, so a two-endpoint cycle
/// needs no shared ownership.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct EndpointId(u64);

impl EndpointId {
    /// Create an endpoint id from a raw integer.
    #[inline]
    pub fn new(id: u64) -> Self {
        EndpointId(id)
    }

    /// Return the underlying integer.
    #[inline]
    pub fn raw(self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for EndpointId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "E{}", self.0)
    }
}
