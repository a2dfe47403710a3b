//! The `ConsumeTransaction` record and its states (§3, §4.5).

use chrono::{DateTime, Utc};
use std::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxnStatus {
    Pending,
    Confirmed,
    Canceled,
    AutoConfirmed,
}

impl TxnStatus {
    /// Terminal states are absorbing (§4.5).
    pub fn is_terminal(self) -> bool {
        !matches!(self, TxnStatus::Pending)
    }
}

#[derive(Debug, Clone)]
pub struct ConsumeTransaction {
    pub transaction_id: String,
    pub token_id: u64,
    pub user_id: u64,
    pub status: TxnStatus,
    pub pre_quota: i64,
    pub final_quota: Option<i64>,
    pub reason: String,
    pub request_id: Option<String>,
    pub trace_id: Option<String>,
    pub expires_at: Option<Instant>,
    pub confirmed_at: Option<DateTime<Utc>>,
    pub canceled_at: Option<DateTime<Utc>>,
    pub elapsed_ms: Option<u64>,
    pub log_id: Option<u64>,
}

impl ConsumeTransaction {
    pub(crate) fn new_pending(
        transaction_id: String,
        token_id: u64,
        user_id: u64,
        pre_quota: i64,
        reason: String,
        expires_at: Instant,
    ) -> Self {
        Self {
            transaction_id,
            token_id,
            user_id,
            status: TxnStatus::Pending,
            pre_quota,
            final_quota: None,
            reason,
            request_id: None,
            trace_id: None,
            expires_at: Some(expires_at),
            confirmed_at: None,
            canceled_at: None,
            elapsed_ms: None,
            log_id: None,
        }
    }
}
