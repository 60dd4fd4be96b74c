//! Data carried by a delivery item.

/// Opaque data written by one endpoint and delivered to its peer.
///
/// The scheduler never looks inside. `Text` exists for stanza-style
/// protocols and readable transcripts, `Data` for binary ones.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub enum Payload {
    /// Raw bytes.
    Data(Vec<u8>),
    /// Human-readable text, e.g. a serialized stanza.
    Text(String),
    /// Nothing at all.
    Empty,
}

impl Payload {
    /// Build a `Text` payload.
    pub fn text(s: impl Into<String>) -> Self {
        Payload::Text(s.into())
    }

    /// The text of a `Text` payload.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Payload::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Raw bytes of the payload. `Empty` yields an empty slice.
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Payload::Data(d) => d,
            Payload::Text(s) => s.as_bytes(),
            Payload::Empty => &[],
        }
    }
}

impl From<&str> for Payload {
    fn from(s: &str) -> Self {
        Payload::Text(s.to_owned())
    }
}

impl From<String> for Payload {
    fn from(s: String) -> Self {
        Payload::Text(s)
    }
}

impl From<Vec<u8>> for Payload {
    fn from(d: Vec<u8>) -> Self {
        Payload::Data(d)
    }
}

/// Text is printed verbatim so transcripts read like the wire.
impl std::fmt::Display for Payload {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Payload::Data(d) => write!(f, "Data({} bytes)", d.len()),
            Payload::Text(s) => write!(f, "{}", s),
            Payload::Empty => write!(f, "Empty"),
        }
    }
}
