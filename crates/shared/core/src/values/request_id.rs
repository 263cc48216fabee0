use serde::{Deserialize, Serialize};
use std::fmt;

/// Client-chosen correlation identifier
///
/// Links an outgoing request to the callbacks the gateway later delivers for it.
/// Order ids share the same space: the id a PlaceOrder is registered under is the
/// order id the gateway echoes back in its status callbacks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestId(u64);

impl RequestId {
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    pub const fn value(&self) -> u64 {
        self.0
    }

    /// Interpret a raw id as delivered on the wire.
    ///
    /// The gateway uses `-1` (or any non-positive value) for events that do not
    /// correlate to a request.
    pub fn from_wire(raw: i64) -> Option<Self> {
        u64::try_from(raw).ok().filter(|v| *v > 0).map(Self)
    }
}

impl From<u64> for RequestId {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_wire_rejects_non_positive() {
        assert_eq!(RequestId::from_wire(-1), None);
        assert_eq!(RequestId::from_wire(0), None);
        assert_eq!(RequestId::from_wire(42), Some(RequestId::new(42)));
    }

    #[test]
    fn test_serializes_as_plain_integer() {
        let json = serde_json::to_string(&RequestId::new(7)).unwrap();
        assert_eq!(json, "7");
    }
}
