//! Request-scoped identifiers.
//!
//! Every client request gets one `RequestId`, threaded through `RelayMeta`,
//! `tracing` spans, the `X-Request-Id` response header, and the `Log` table
//! row that backs `GET /api/cost/request/{request_id}` (§6).

use std::fmt;
use uuid::Uuid;

/// Opaque, display-able request identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct RequestId(String);

impl RequestId {
    /// Mints a fresh id, prefixed like the gateway's other external ids
    /// (`req_...`) so it is visually distinguishable from a transaction id.
    pub fn new() -> Self {
        Self(format!("req_{}", Uuid::new_v4().simple()))
    }

    /// Wraps an already-formatted id (used when replaying from a log row).
    pub fn from_raw(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// Borrow the id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
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
    fn new_ids_are_unique_and_prefixed() {
        let a = RequestId::new();
        let b = RequestId::new();
        assert_ne!(a, b);
        assert!(a.as_str().starts_with("req_"));
    }
}
