use crate::types::TxnStatus;
use relay_core::RelayEvent;
use std::time::Instant;

#[derive(Debug, Clone)]
pub enum BillingEvent {
    TxnOpened { transaction_id: String, pre_quota: i64, timestamp: Instant },
    TxnTransitioned { transaction_id: String, from: TxnStatus, to: TxnStatus, timestamp: Instant },
}

impl RelayEvent for BillingEvent {
    fn event_type(&self) -> &'static str {
        match self {
            BillingEvent::TxnOpened { .. } => "txn_opened",
            BillingEvent::TxnTransitioned { .. } => "txn_transitioned",
        }
    }

    fn timestamp(&self) -> Instant {
        match self {
            BillingEvent::TxnOpened { timestamp, .. } => *timestamp,
            BillingEvent::TxnTransitioned { timestamp, .. } => *timestamp,
        }
    }

    fn source(&self) -> &str {
        match self {
            BillingEvent::TxnOpened { transaction_id, .. } => transaction_id,
            BillingEvent::TxnTransitioned { transaction_id, .. } => transaction_id,
        }
    }
}
