//! Atomic reserve/settle/refund of user and token quota (§4.4).
//!
//! Production backs this with row-level database locking (`SELECT ... FOR
//! UPDATE`); this in-memory implementation mutates token and user rows
//! under a single mutex per call in a fixed lock order (tokens before
//! users) so the "no lost updates" requirement holds without deadlocking
//! against itself.

use crate::error::LedgerError;
use crate::events::LedgerEvent;
use crate::types::{Token, User};
use parking_lot::Mutex;
use relay_core::EventListeners;
use std::collections::HashMap;
use std::time::Instant;

pub struct QuotaLedger {
    tokens: Mutex<HashMap<u64, Token>>,
    users: Mutex<HashMap<u64, User>>,
    listeners: EventListeners<LedgerEvent>,
}

impl QuotaLedger {
    pub fn new() -> Self {
        Self {
            tokens: Mutex::new(HashMap::new()),
            users: Mutex::new(HashMap::new()),
            listeners: EventListeners::new(),
        }
    }

    pub fn add_listener<L>(&mut self, listener: L)
    where
        L: relay_core::EventListener<LedgerEvent> + 'static,
    {
        self.listeners.add(listener);
    }

    pub fn upsert_token(&self, token: Token) {
        self.tokens.lock().insert(token.id, token);
    }

    pub fn upsert_user(&self, user: User) {
        self.users.lock().insert(user.id, user);
    }

    pub fn token_remaining(&self, token_id: u64) -> Result<i64, LedgerError> {
        self.tokens
            .lock()
            .get(&token_id)
            .map(|t| t.remaining_quota)
            .ok_or(LedgerError::UnknownToken(token_id))
    }

    /// Resolves the user that owns a token, for callers (the gateway's auth
    /// middleware) that only have the bearer token id.
    pub fn token_owner(&self, token_id: u64) -> Result<u64, LedgerError> {
        self.tokens
            .lock()
            .get(&token_id)
            .map(|t| t.user_id)
            .ok_or(LedgerError::UnknownToken(token_id))
    }

    /// Resolves a user's ability group, for routing a request once the
    /// bearer token has been resolved to its owning user.
    pub fn user_group(&self, user_id: u64) -> Result<String, LedgerError> {
        self.users
            .lock()
            .get(&user_id)
            .map(|u| u.group.clone())
            .ok_or(LedgerError::UnknownUser(user_id))
    }

    /// `Reserve(token, amount)` (§4.4). Decrements `token.remaining_quota`
    /// and `user.quota` by `amount`. Unlimited tokens always succeed;
    /// otherwise the call fails rather than leave the persisted balance
    /// negative.
    pub fn reserve(&self, token_id: u64, amount: i64) -> Result<i64, LedgerError> {
        let mut tokens = self.tokens.lock();
        let mut users = self.users.lock();

        let token = tokens
            .get_mut(&token_id)
            .ok_or(LedgerError::UnknownToken(token_id))?;

        let new_remaining = token
            .remaining_quota
            .checked_sub(amount)
            .ok_or(LedgerError::Overflow)?;

        if !token.unlimited && new_remaining < 0 {
            return Err(LedgerError::InsufficientQuota {
                token: token_id,
                amount,
            });
        }

        let user_id = token.user_id;
        let user = users.get_mut(&user_id).ok_or(LedgerError::UnknownUser(user_id))?;
        let new_user_quota = user.quota.checked_sub(amount).ok_or(LedgerError::Overflow)?;

        token.remaining_quota = new_remaining;
        user.quota = new_user_quota;

        self.listeners.emit(&LedgerEvent::Reserved {
            token_id,
            amount,
            timestamp: Instant::now(),
        });

        Ok(new_remaining)
    }

    /// `Settle(token, delta)` (§4.4). Positive `delta` charges more beyond
    /// the reservation, negative refunds. Keeps `user.used_quota` monotonic
    /// per §3's invariant.
    pub fn settle(&self, token_id: u64, delta: i64) -> Result<i64, LedgerError> {
        let mut tokens = self.tokens.lock();
        let mut users = self.users.lock();

        let token = tokens
            .get_mut(&token_id)
            .ok_or(LedgerError::UnknownToken(token_id))?;

        let new_remaining = token
            .remaining_quota
            .checked_sub(delta)
            .ok_or(LedgerError::Overflow)?;

        let user_id = token.user_id;
        let user = users.get_mut(&user_id).ok_or(LedgerError::UnknownUser(user_id))?;
        let new_user_quota = user.quota.checked_sub(delta).ok_or(LedgerError::Overflow)?;
        let new_used = user.used_quota.checked_add(delta).ok_or(LedgerError::Overflow)?;

        token.remaining_quota = new_remaining;
        user.quota = new_user_quota;
        user.used_quota = new_used;

        self.listeners.emit(&LedgerEvent::Settled {
            token_id,
            delta,
            timestamp: Instant::now(),
        });

        Ok(new_remaining)
    }

    /// `Refund(token, amount)` — equivalent to `Settle(-amount)` (§4.4).
    pub fn refund(&self, token_id: u64, amount: i64) -> Result<i64, LedgerError> {
        let result = self.settle(token_id, -amount)?;
        self.listeners.emit(&LedgerEvent::Refunded {
            token_id,
            amount,
            timestamp: Instant::now(),
        });
        Ok(result)
    }
}

impl Default for QuotaLedger {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn ledger_with_token(remaining: i64) -> QuotaLedger {
        let ledger = QuotaLedger::new();
        ledger.upsert_user(User::new(1, "default", remaining));
        ledger.upsert_token(Token::new(1, 1, remaining));
        ledger
    }

    #[test]
    fn reserve_decrements_token_and_user() {
        let ledger = ledger_with_token(1000);
        let remaining = ledger.reserve(1, 100).unwrap();
        assert_eq!(remaining, 900);
        assert_eq!(ledger.token_remaining(1).unwrap(), 900);
    }

    #[test]
    fn reserve_fails_when_insufficient_and_not_unlimited() {
        let ledger = ledger_with_token(50);
        assert!(ledger.reserve(1, 100).is_err());
        assert_eq!(ledger.token_remaining(1).unwrap(), 50, "failed reserve must not mutate state");
    }

    #[test]
    fn unlimited_token_reserves_past_zero() {
        let ledger = QuotaLedger::new();
        ledger.upsert_user(User::new(1, "default", 0));
        let mut token = Token::new(1, 1, 0);
        token.unlimited = true;
        ledger.upsert_token(token);

        let remaining = ledger.reserve(1, 100).unwrap();
        assert_eq!(remaining, -100);
    }

    #[test]
    fn happy_path_chat_scenario_quota_conservation() {
        // §8 scenario 1: remain=1000, reserve 100, settle delta -10.
        let ledger = ledger_with_token(1000);
        ledger.reserve(1, 100).unwrap();
        let remaining = ledger.settle(1, 90 - 100).unwrap();
        assert_eq!(remaining, 910);
    }

    #[test]
    fn pre_post_delta_refund_scenario() {
        // §8 scenario 4: pre(100) -> 900, post(final=60) -> settle(-40) -> 940.
        let ledger = ledger_with_token(1000);
        ledger.reserve(1, 100).unwrap();
        let remaining = ledger.settle(1, 60 - 100).unwrap();
        assert_eq!(remaining, 940);
    }

    #[test]
    fn pre_cancel_full_refund_scenario() {
        // §8 scenario 5: pre(80) -> 920, cancel -> refund(80) -> 1000.
        let ledger = ledger_with_token(1000);
        ledger.reserve(1, 80).unwrap();
        let remaining = ledger.refund(1, 80).unwrap();
        assert_eq!(remaining, 1000);
    }

    proptest::proptest! {
        #[test]
        fn quota_conservation_holds_for_any_reserve_then_settle(
            start in 1_000i64..1_000_000,
            reserved in 0i64..1_000,
            delta in -500i64..500,
        ) {
            let ledger = ledger_with_token(start);
            ledger.reserve(1, reserved).unwrap();
            let final_remaining = ledger.settle(1, delta).unwrap();
            // Δ(user.quota) + settled_cost == 0 relative to the starting balance.
            prop_assert_eq!(final_remaining, start - reserved - delta);
        }
    }
}
