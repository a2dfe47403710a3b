//! The `ConsumeTxn` two-phase external billing state machine (§4.5).
//!
//! `pending → {confirmed, canceled, auto_confirmed}`, terminal states
//! absorbing. Every transition goes through [`ConsumeTxnManager::transition`],
//! the single mutation point, so idempotency is a status check inside the
//! same critical section as the ledger update — mirroring the way the
//! circuit breaker's `transition_to` is the only place `Circuit::state`
//! changes.

use crate::error::BillingError;
use crate::events::BillingEvent;
use crate::types::{ConsumeTransaction, TxnStatus};
use chrono::Utc;
use parking_lot::Mutex;
use relay_core::{EventListeners, GatewayConfig};
use relay_ledger::QuotaLedger;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use uuid::Uuid;

pub struct ConsumeTxnManager {
    ledger: Arc<QuotaLedger>,
    txns: Mutex<HashMap<String, ConsumeTransaction>>,
    listeners: EventListeners<BillingEvent>,
}

impl ConsumeTxnManager {
    pub fn new(ledger: Arc<QuotaLedger>) -> Self {
        Self {
            ledger,
            txns: Mutex::new(HashMap::new()),
            listeners: EventListeners::new(),
        }
    }

    pub fn add_listener<L>(&mut self, listener: L)
    where
        L: relay_core::EventListener<BillingEvent> + 'static,
    {
        self.listeners.add(listener);
    }

    /// `pre(amount, reason, timeout_s) → {txn_id, remain_quota}` (§4.5).
    pub fn pre(
        &self,
        token_id: u64,
        user_id: u64,
        amount: i64,
        reason: impl Into<String>,
        timeout_s: Option<u64>,
        config: &GatewayConfig,
    ) -> Result<(String, i64), BillingError> {
        let remain = self
            .ledger
            .reserve(token_id, amount)
            .map_err(|e| BillingError::Ledger(e.to_string()))?;

        let transaction_id = format!("txn_{}", Uuid::new_v4().simple());
        let timeout = config.clamp_billing_timeout(timeout_s);
        let txn = ConsumeTransaction::new_pending(
            transaction_id.clone(),
            token_id,
            user_id,
            amount,
            reason.into(),
            Instant::now() + timeout,
        );

        self.txns.lock().insert(transaction_id.clone(), txn);

        self.listeners.emit(&BillingEvent::TxnOpened {
            transaction_id: transaction_id.clone(),
            pre_quota: amount,
            timestamp: Instant::now(),
        });

        Ok((transaction_id, remain))
    }

    /// `post(txn_id, final_amount?, elapsed_ms?)` — pending → confirmed (§4.5).
    ///
    /// Replaying `post` on an already-confirmed or already-auto-confirmed
    /// txn is a no-op returning the stored state (§8 idempotence property).
    /// Replaying it on a canceled txn is rejected: that terminal state was
    /// reached by a different operation, not a retry of this one (§8
    /// scenario 5).
    pub fn post(
        &self,
        txn_id: &str,
        final_amount: Option<i64>,
        elapsed_ms: Option<u64>,
    ) -> Result<ConsumeTransaction, BillingError> {
        let mut txns = self.txns.lock();
        let txn = txns
            .get_mut(txn_id)
            .ok_or_else(|| BillingError::UnknownTransaction(txn_id.to_string()))?;

        match txn.status {
            TxnStatus::Confirmed | TxnStatus::AutoConfirmed => return Ok(txn.clone()),
            TxnStatus::Canceled => {
                return Err(BillingError::AlreadyTerminal {
                    status: TxnStatus::Canceled,
                })
            }
            TxnStatus::Pending => {}
        }

        let final_quota = final_amount.unwrap_or(txn.pre_quota);
        let delta = final_quota
            .checked_sub(txn.pre_quota)
            .ok_or(BillingError::Overflow)?;

        if delta != 0 {
            self.ledger
                .settle(txn.token_id, delta)
                .map_err(|e| BillingError::Ledger(e.to_string()))?;
        }

        self.transition(txn, TxnStatus::Confirmed);
        txn.final_quota = Some(final_quota);
        txn.elapsed_ms = elapsed_ms;
        txn.confirmed_at = Some(Utc::now());
        txn.expires_at = None;

        Ok(txn.clone())
    }

    /// `cancel(txn_id)` — pending → canceled, full refund (§4.5).
    pub fn cancel(&self, txn_id: &str) -> Result<ConsumeTransaction, BillingError> {
        let mut txns = self.txns.lock();
        let txn = txns
            .get_mut(txn_id)
            .ok_or_else(|| BillingError::UnknownTransaction(txn_id.to_string()))?;

        match txn.status {
            TxnStatus::Canceled => return Ok(txn.clone()),
            TxnStatus::Confirmed | TxnStatus::AutoConfirmed => {
                return Err(BillingError::AlreadyTerminal { status: txn.status })
            }
            TxnStatus::Pending => {}
        }

        self.ledger
            .refund(txn.token_id, txn.pre_quota)
            .map_err(|e| BillingError::Ledger(e.to_string()))?;

        self.transition(txn, TxnStatus::Canceled);
        txn.final_quota = Some(0);
        txn.canceled_at = Some(Utc::now());
        txn.expires_at = None;

        Ok(txn.clone())
    }

    /// `single(amount, reason)` — compound pre+post, idempotent by txn id (§4.5).
    pub fn single(
        &self,
        token_id: u64,
        user_id: u64,
        amount: i64,
        reason: impl Into<String>,
        config: &GatewayConfig,
    ) -> Result<ConsumeTransaction, BillingError> {
        let (txn_id, _remain) = self.pre(token_id, user_id, amount, reason, None, config)?;
        self.post(&txn_id, Some(amount), None)
    }

    /// Runs before serving any request on `token_id` (§4.5 invariant): every
    /// pending txn past its `expires_at` becomes `auto_confirmed` with
    /// `final = pre`, bounding the reservation window. No ledger call is
    /// needed since delta is zero.
    pub fn auto_confirm_expired(&self, token_id: u64) -> Vec<String> {
        let now = Instant::now();
        let mut txns = self.txns.lock();
        let mut confirmed = Vec::new();

        for txn in txns
            .values_mut()
            .filter(|t| t.token_id == token_id && t.status == TxnStatus::Pending)
        {
            if txn.expires_at.is_some_and(|exp| exp < now) {
                self.transition(txn, TxnStatus::AutoConfirmed);
                txn.final_quota = Some(txn.pre_quota);
                txn.expires_at = None;
                confirmed.push(txn.transaction_id.clone());
            }
        }

        confirmed
    }

    pub fn get(&self, txn_id: &str) -> Option<ConsumeTransaction> {
        self.txns.lock().get(txn_id).cloned()
    }

    /// The single mutation point for `status`: every transition above
    /// checks terminality first, so this only ever moves pending forward.
    fn transition(&self, txn: &mut ConsumeTransaction, to: TxnStatus) {
        let from = txn.status;
        if from == to {
            return;
        }
        txn.status = to;
        self.listeners.emit(&BillingEvent::TxnTransitioned {
            transaction_id: txn.transaction_id.clone(),
            from,
            to,
            timestamp: Instant::now(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use relay_ledger::{Token, User};
    use std::time::Duration;

    fn manager_with_token(remaining: i64) -> ConsumeTxnManager {
        let ledger = Arc::new(QuotaLedger::new());
        ledger.upsert_user(User::new(1, "default", remaining));
        ledger.upsert_token(Token::new(1, 1, remaining));
        ConsumeTxnManager::new(ledger)
    }

    #[test]
    fn pre_post_delta_refund() {
        let mgr = manager_with_token(1000);
        let config = GatewayConfig::default();
        let (txn_id, remain) = mgr.pre(1, 1, 100, "chat", None, &config).unwrap();
        assert_eq!(remain, 900);

        let txn = mgr.post(&txn_id, Some(60), Some(120)).unwrap();
        assert_eq!(txn.status, TxnStatus::Confirmed);
        assert_eq!(txn.final_quota, Some(60));
        assert_eq!(mgr.ledger.token_remaining(1).unwrap(), 940);
    }

    #[test]
    fn pre_cancel_then_post_fails() {
        let mgr = manager_with_token(1000);
        let config = GatewayConfig::default();
        let (txn_id, remain) = mgr.pre(1, 1, 80, "chat", None, &config).unwrap();
        assert_eq!(remain, 920);

        mgr.cancel(&txn_id).unwrap();
        assert_eq!(mgr.ledger.token_remaining(1).unwrap(), 1000);

        let err = mgr.post(&txn_id, Some(50), None).unwrap_err();
        assert_eq!(
            err,
            BillingError::AlreadyTerminal {
                status: TxnStatus::Canceled
            }
        );
    }

    #[test]
    fn replaying_post_on_confirmed_txn_is_a_noop() {
        let mgr = manager_with_token(1000);
        let config = GatewayConfig::default();
        let (txn_id, _) = mgr.pre(1, 1, 100, "chat", None, &config).unwrap();
        let first = mgr.post(&txn_id, Some(90), None).unwrap();
        let second = mgr.post(&txn_id, Some(90), None).unwrap();
        assert_eq!(first.final_quota, second.final_quota);
        assert_eq!(mgr.ledger.token_remaining(1).unwrap(), 990);
    }

    #[test]
    fn auto_confirm_sweeps_expired_pending_txns() {
        let mgr = manager_with_token(1000);
        let mut config = GatewayConfig::default();
        config.external_billing_default_timeout_sec = 0;
        config.external_billing_max_timeout_sec = 1;
        let (txn_id, _) = mgr.pre(1, 1, 40, "chat", Some(1), &config).unwrap();

        std::thread::sleep(Duration::from_millis(1100));
        let confirmed_ids = mgr.auto_confirm_expired(1);
        assert_eq!(confirmed_ids, vec![txn_id.clone()]);

        let txn = mgr.get(&txn_id).unwrap();
        assert_eq!(txn.status, TxnStatus::AutoConfirmed);
        assert_eq!(txn.final_quota, Some(40));
        assert_eq!(mgr.ledger.token_remaining(1).unwrap(), 960);
    }
}
