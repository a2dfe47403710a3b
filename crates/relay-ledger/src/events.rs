use relay_core::RelayEvent;
use std::time::Instant;

#[derive(Debug, Clone)]
pub enum LedgerEvent {
    Reserved { token_id: u64, amount: i64, timestamp: Instant },
    Settled { token_id: u64, delta: i64, timestamp: Instant },
    Refunded { token_id: u64, amount: i64, timestamp: Instant },
}

impl RelayEvent for LedgerEvent {
    fn event_type(&self) -> &'static str {
        match self {
            LedgerEvent::Reserved { .. } => "quota_reserved",
            LedgerEvent::Settled { .. } => "quota_settled",
            LedgerEvent::Refunded { .. } => "quota_refunded",
        }
    }

    fn timestamp(&self) -> Instant {
        match self {
            LedgerEvent::Reserved { timestamp, .. }
            | LedgerEvent::Settled { timestamp, .. }
            | LedgerEvent::Refunded { timestamp, .. } => *timestamp,
        }
    }

    fn source(&self) -> &str {
        "token"
    }
}
