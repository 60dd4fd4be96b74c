//! Diagnostic transcript of a run.

use crate::time::VirtualTime;

use super::id::EndpointId;
use super::payload::Payload;

/// What a transcript line reports.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub enum TraceKind {
    /// The endpoint was created.
    Open,
    /// The endpoint wrote `Payload`, whether or not a peer received it.
    Write(Payload),
    /// The endpoint's close trigger ran.
    Closed,
}

/// One diagnostic line.
///
/// Display renders the classic harness format: `C: OPEN`, `C: <ping/>`,
/// `C: CLOSED`.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct TraceEntry {
    /// Clock value when the line was emitted.
    pub time: VirtualTime,
    /// Endpoint that emitted it.
    pub endpoint: EndpointId,
    /// Identity of that endpoint.
    pub name: String,
    pub kind: TraceKind,
}

impl TraceEntry {
    /// Deterministic hash of the line, clock value included.
    pub fn hash(&self) -> u64 {
        let mut h = hash_combine(self.time.ticks(), self.endpoint.raw());
        h = hash_combine(h, hash_bytes(self.name.as_bytes()));
        match &self.kind {
            TraceKind::Open => hash_combine(h, 1),
            TraceKind::Write(payload) => hash_combine(hash_combine(h, 2), hash_bytes(payload.as_bytes())),
            TraceKind::Closed => hash_combine(h, 3),
        }
    }
}

impl std::fmt::Display for TraceEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.kind {
            TraceKind::Open => write!(f, "{}: OPEN", self.name),
            TraceKind::Write(payload) => write!(f, "{}: {}", self.name, payload),
            TraceKind::Closed => write!(f, "{}: CLOSED", self.name),
        }
    }
}

/// Combine two u64 hashes deterministically.
pub fn hash_combine(a: u64, b: u64) -> u64 {
    let mut h = a;
    h = h.wrapping_mul(0x517cc1b727220a95);
    h = h.wrapping_add(b);
    h ^= h >> 32;
    h
}

/// FNV-1a over a byte slice.
pub fn hash_bytes(data: &[u8]) -> u64 {
    let mut h: u64 = 0xcbf29ce484222325;
    for &b in data {
        h ^= b as u64;
        h = h.wrapping_mul(0x100000001b3);
    }
    h
}
