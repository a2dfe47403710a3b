//! Observability events emitted by [`crate::engine::RelayEngine`] (§4.6).

use relay_core::RelayEvent;
use std::time::Instant;

#[derive(Debug, Clone)]
pub enum RelayEngineEvent {
    /// A dispatch attempt succeeded; the engine settled the ledger and is
    /// returning the response to the client.
    DispatchSucceeded {
        request_id: String,
        channel_id: u64,
        attempt: usize,
        timestamp: Instant,
    },
    /// A dispatch attempt failed. `retryable` reflects `shouldRetry`'s
    /// verdict for this failure, before budget is checked.
    DispatchFailed {
        request_id: String,
        channel_id: u64,
        status: u16,
        retryable: bool,
        timestamp: Instant,
    },
    /// The retry loop is about to re-dispatch against a new channel.
    RetryScheduled {
        request_id: String,
        attempt: usize,
        channel_id: u64,
        timestamp: Instant,
    },
    /// Every retry option was exhausted (budget or candidate pool).
    RetriesExhausted {
        request_id: String,
        attempts: usize,
        timestamp: Instant,
    },
    /// The detached post-stream task settled or refunded the reservation
    /// held by a successful dispatch (§5's "tee and settle" path).
    SettlementRecorded {
        request_id: String,
        token_id: u64,
        user_id: u64,
        group: String,
        model: String,
        delta: i64,
        succeeded: bool,
        timestamp: Instant,
    },
}

impl RelayEvent for RelayEngineEvent {
    fn event_type(&self) -> &'static str {
        match self {
            RelayEngineEvent::DispatchSucceeded { .. } => "relay_dispatch_succeeded",
            RelayEngineEvent::DispatchFailed { .. } => "relay_dispatch_failed",
            RelayEngineEvent::RetryScheduled { .. } => "relay_retry_scheduled",
            RelayEngineEvent::RetriesExhausted { .. } => "relay_retries_exhausted",
            RelayEngineEvent::SettlementRecorded { .. } => "relay_settlement_recorded",
        }
    }

    fn timestamp(&self) -> Instant {
        match self {
            RelayEngineEvent::DispatchSucceeded { timestamp, .. }
            | RelayEngineEvent::DispatchFailed { timestamp, .. }
            | RelayEngineEvent::RetryScheduled { timestamp, .. }
            | RelayEngineEvent::RetriesExhausted { timestamp, .. }
            | RelayEngineEvent::SettlementRecorded { timestamp, .. } => *timestamp,
        }
    }

    fn source(&self) -> &str {
        match self {
            RelayEngineEvent::DispatchSucceeded { request_id, .. }
            | RelayEngineEvent::DispatchFailed { request_id, .. }
            | RelayEngineEvent::RetryScheduled { request_id, .. }
            | RelayEngineEvent::RetriesExhausted { request_id, .. }
            | RelayEngineEvent::SettlementRecorded { request_id, .. } => request_id,
        }
    }
}
