//! Maps (status, classified error kind) to a suspension action (§4.7).

use crate::classify::{classify_auth_like, UpstreamSignal};
use relay_ability::AbilityIndex;
use std::time::Duration;

/// What the policy did in response to a trigger, for logging and tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SuspensionAction {
    /// 400: client-side problem, not a channel signal.
    LogOnly,
    /// 408 / client cancellation / deadline exceeded.
    NoAction,
    /// Ability suspended for the given class; channel optionally disabled.
    Suspended { disabled: bool },
    /// 413: no suspension, selector's larger-context preference handles it.
    NoSuspensionRelyOnSelector,
}

/// Suspension durations are configured and each may be zero to disable
/// suspension for that class (§4.7).
#[derive(Debug, Clone, Copy)]
pub struct SuspensionDurations {
    pub t_429: Duration,
    pub t_5xx: Duration,
    pub t_auth: Duration,
}

pub struct SuspensionPolicy {
    durations: SuspensionDurations,
    automatic_disable_enabled: bool,
}

impl SuspensionPolicy {
    pub fn new(durations: SuspensionDurations, automatic_disable_enabled: bool) -> Self {
        Self {
            durations,
            automatic_disable_enabled,
        }
    }

    /// Applies §4.7's table for one failed dispatch. `is_client_cancel`
    /// takes precedence over `status` per §7/§8's client-cancel non-penalty
    /// property: a cancellation never suspends or disables regardless of
    /// the status code observed alongside it.
    pub fn handle(
        &self,
        index: &AbilityIndex,
        group: &str,
        model: &str,
        channel_id: u64,
        signal: &UpstreamSignal,
        is_client_cancel: bool,
    ) -> SuspensionAction {
        if is_client_cancel || signal.status == 408 {
            return SuspensionAction::NoAction;
        }

        if signal.status == 400 {
            return SuspensionAction::LogOnly;
        }

        if signal.status == 413 {
            return SuspensionAction::NoSuspensionRelyOnSelector;
        }

        if signal.status == 429 {
            self.suspend(index, group, model, channel_id, self.durations.t_429);
            return SuspensionAction::Suspended { disabled: false };
        }

        if classify_auth_like(signal) {
            self.suspend(index, group, model, channel_id, self.durations.t_auth);
            let disable = self.automatic_disable_enabled && should_disable(signal);
            if disable {
                index.disable_channel(channel_id, true);
            }
            return SuspensionAction::Suspended { disabled: disable };
        }

        if (500..600).contains(&signal.status) {
            self.suspend(index, group, model, channel_id, self.durations.t_5xx);
            return SuspensionAction::Suspended { disabled: false };
        }

        let disable = self.automatic_disable_enabled && should_disable(signal);
        if disable {
            index.disable_channel(channel_id, true);
            return SuspensionAction::Suspended { disabled: true };
        }

        SuspensionAction::LogOnly
    }

    fn suspend(&self, index: &AbilityIndex, group: &str, model: &str, channel_id: u64, duration: Duration) {
        if duration.is_zero() {
            return;
        }
        index.suspend(group, model, channel_id, duration);
    }
}

/// Static policy deciding whether a channel should be auto-disabled rather
/// than merely suspended. Narrow by design: only signals that indicate a
/// permanent, not transient, condition qualify.
fn should_disable(signal: &UpstreamSignal) -> bool {
    matches!(signal.error_code, Some("account_deactivated"))
        || signal
            .message
            .is_some_and(|m| m.to_lowercase().contains("organization-restricted"))
}
