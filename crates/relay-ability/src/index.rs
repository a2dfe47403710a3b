//! In-memory ability cache, refreshable and suspend-aware (§4.1, §5).
//!
//! Backed in production by a database table; this index is the process-local
//! cache that fronts it. Callers are expected to periodically reload rows
//! via [`AbilityIndex::load`]; `Suspend`/`EnableChannel`/`DisableChannel`
//! mutate the cache directly so a suspension is visible to the very next
//! `find_candidate` call on this process, honoring the bounded-staleness
//! requirement from §5 for at least the writer's own view.

use crate::error::AbilityError;
use crate::events::AbilityEvent;
use crate::types::{Ability, Channel, ChannelStatus, SelectionOptions};
use parking_lot::RwLock;
use rand::Rng;
use relay_core::EventListeners;
use std::collections::HashMap;
use std::time::Instant;

/// Maps (group, model) to candidate channels, with priority tiers,
/// exclusion sets and suspension TTLs (§2, §4.1).
pub struct AbilityIndex {
    channels: RwLock<HashMap<u64, Channel>>,
    abilities: RwLock<Vec<Ability>>,
    listeners: EventListeners<AbilityEvent>,
}

impl AbilityIndex {
    pub fn new() -> Self {
        Self {
            channels: RwLock::new(HashMap::new()),
            abilities: RwLock::new(Vec::new()),
            listeners: EventListeners::new(),
        }
    }

    pub fn add_listener<L>(&mut self, listener: L)
    where
        L: relay_core::EventListener<AbilityEvent> + 'static,
    {
        self.listeners.add(listener);
    }

    /// Loads (or replaces) the rows backing this index. A full reload keeps
    /// the cache's semantics simple; production callers diff against the DB
    /// on a timer per §5's `T_refresh`.
    pub fn load(&self, channels: Vec<Channel>, abilities: Vec<Ability>) {
        *self.channels.write() = channels.into_iter().map(|c| (c.id, c)).collect();
        *self.abilities.write() = abilities;
    }

    pub fn upsert_channel(&self, channel: Channel) {
        self.channels.write().insert(channel.id, channel);
    }

    pub fn upsert_ability(&self, ability: Ability) {
        let mut abilities = self.abilities.write();
        if let Some(existing) = abilities
            .iter_mut()
            .find(|a| a.group == ability.group && a.model == ability.model && a.channel_id == ability.channel_id)
        {
            *existing = ability;
        } else {
            abilities.push(ability);
        }
    }

    /// `FindCandidate(group, model, excludeChannels, options) → Channel | NotFound` (§4.1).
    pub fn find_candidate(
        &self,
        group: &str,
        model: &str,
        exclude: &[u64],
        options: SelectionOptions,
    ) -> Result<Channel, AbilityError> {
        let now = Instant::now();
        let channels = self.channels.read();
        let abilities = self.abilities.read();

        // Step 1: filter to enabled, non-excluded, non-suspended rows whose
        // channel is itself enabled.
        let mut visible: Vec<&Ability> = abilities
            .iter()
            .filter(|a| a.group == group && a.model == model)
            .filter(|a| a.enabled)
            .filter(|a| !exclude.contains(&a.channel_id))
            .filter(|a| !a.is_suspended(now))
            .filter(|a| {
                channels
                    .get(&a.channel_id)
                    .is_some_and(|c| c.status.is_enabled())
            })
            .collect();

        if visible.is_empty() {
            self.listeners.emit(&AbilityEvent::NoCandidateFound {
                group: group.to_string(),
                model: model.to_string(),
                timestamp: now,
            });
            return Err(AbilityError::NoCandidate {
                group: group.to_string(),
                model: model.to_string(),
            });
        }

        // Step 2: partition by priority; top tier = max priority.
        let top_priority = visible.iter().map(|a| a.priority).max().unwrap();
        let (top_tier, lower_tier): (Vec<&&Ability>, Vec<&&Ability>) =
            visible.iter().partition(|a| a.priority == top_priority);

        let pool: Vec<&Ability> = if options.prefer_lower_priority {
            // Step 3.
            if lower_tier.is_empty() {
                top_tier.into_iter().copied().collect()
            } else {
                lower_tier.into_iter().copied().collect()
            }
        } else if options.prefer_larger_context {
            // Step 4: order by declared max_tokens desc, tie-break priority then weight.
            visible.sort_by(|a, b| {
                let ctx_a = channels.get(&a.channel_id).map(|c| c.max_tokens).unwrap_or(0);
                let ctx_b = channels.get(&b.channel_id).map(|c| c.max_tokens).unwrap_or(0);
                ctx_b
                    .cmp(&ctx_a)
                    .then(b.priority.cmp(&a.priority))
                    .then(b.effective_weight().cmp(&a.effective_weight()))
            });
            visible
        } else {
            // Step 5: top tier first, else lower tiers.
            if top_tier.is_empty() {
                lower_tier.into_iter().copied().collect()
            } else {
                top_tier.into_iter().copied().collect()
            }
        };

        if pool.is_empty() {
            self.listeners.emit(&AbilityEvent::NoCandidateFound {
                group: group.to_string(),
                model: model.to_string(),
                timestamp: now,
            });
            return Err(AbilityError::NoCandidate {
                group: group.to_string(),
                model: model.to_string(),
            });
        }

        // Step 6: weighted random over `weight`, deterministic tie-break on
        // channel id when weights are equal (for testability).
        let chosen = if options.prefer_larger_context {
            // already ordered deterministically by context/priority/weight
            pool[0]
        } else {
            weighted_pick(&pool)
        };

        let channel = channels
            .get(&chosen.channel_id)
            .cloned()
            .ok_or(AbilityError::UnknownChannel(chosen.channel_id))?;

        self.listeners.emit(&AbilityEvent::CandidateSelected {
            group: group.to_string(),
            model: model.to_string(),
            channel_id: channel.id,
            timestamp: now,
        });

        Ok(channel)
    }

    /// `Suspend(group, model, channel, duration)` (§4.1, §4.7).
    pub fn suspend(&self, group: &str, model: &str, channel_id: u64, duration: std::time::Duration) {
        let now = Instant::now();
        let mut abilities = self.abilities.write();
        for ability in abilities
            .iter_mut()
            .filter(|a| a.group == group && a.model == model && a.channel_id == channel_id)
        {
            ability.suspend_until = Some(now + duration);
        }
        self.listeners.emit(&AbilityEvent::AbilitySuspended {
            group: group.to_string(),
            model: model.to_string(),
            channel_id,
            timestamp: now,
        });
    }

    /// `EnableChannel(channel)` — toggles all abilities for the channel (§4.1).
    pub fn enable_channel(&self, channel_id: u64) {
        self.set_channel_status(channel_id, ChannelStatus::Enabled, true);
    }

    /// `DisableChannel(channel)` (§4.1); distinguishes manual vs auto-disable
    /// for the admin surface, both invisible to `find_candidate` (§4.1 edge cases).
    pub fn disable_channel(&self, channel_id: u64, auto: bool) {
        let status = if auto {
            ChannelStatus::AutoDisabled
        } else {
            ChannelStatus::ManuallyDisabled
        };
        self.set_channel_status(channel_id, status, false);
    }

    /// Snapshot of every known channel, for the health prober's probe loop.
    pub fn snapshot_channels(&self) -> Vec<Channel> {
        self.channels.read().values().cloned().collect()
    }

    /// Distinct models a group can currently reach through an enabled,
    /// non-suspended ability on an enabled channel, for the gateway's model
    /// listing endpoint.
    pub fn models_for_group(&self, group: &str) -> Vec<String> {
        let now = Instant::now();
        let channels = self.channels.read();
        let abilities = self.abilities.read();
        let mut models: Vec<String> = abilities
            .iter()
            .filter(|a| a.group == group)
            .filter(|a| a.enabled)
            .filter(|a| !a.is_suspended(now))
            .filter(|a| {
                channels
                    .get(&a.channel_id)
                    .is_some_and(|c| c.status.is_enabled())
            })
            .map(|a| a.model.clone())
            .collect();
        models.sort();
        models.dedup();
        models
    }

    /// Counts abilities that would survive `find_candidate`'s visibility
    /// filter for `(group, model)`, ignoring tier/weight selection. Used by
    /// the retry loop to size the 413 "probe every alternative once" budget
    /// (§4.6 step 7) without actually picking one.
    pub fn viable_channel_count(&self, group: &str, model: &str, exclude: &[u64]) -> usize {
        let now = Instant::now();
        let channels = self.channels.read();
        let abilities = self.abilities.read();
        abilities
            .iter()
            .filter(|a| a.group == group && a.model == model)
            .filter(|a| a.enabled)
            .filter(|a| !exclude.contains(&a.channel_id))
            .filter(|a| !a.is_suspended(now))
            .filter(|a| {
                channels
                    .get(&a.channel_id)
                    .is_some_and(|c| c.status.is_enabled())
            })
            .count()
    }

    /// Folds a fresh latency sample into the channel's response-time EMA
    /// (§4.10) and returns the updated value. `alpha` weights the new
    /// sample; `0.2` means each probe moves the EMA a fifth of the way
    /// toward the latest observation.
    pub fn record_response_time(&self, channel_id: u64, latency_ms: u64, alpha: f64) -> Option<f64> {
        let mut channels = self.channels.write();
        let channel = channels.get_mut(&channel_id)?;
        let sample = latency_ms as f64;
        let updated = if channel.response_time_ema_ms == 0.0 {
            sample
        } else {
            channel.response_time_ema_ms + alpha * (sample - channel.response_time_ema_ms)
        };
        channel.response_time_ema_ms = updated;
        drop(channels);
        self.listeners.emit(&AbilityEvent::ChannelHealthRecorded {
            channel_id,
            ema_ms: updated.round() as u64,
            timestamp: Instant::now(),
        });
        Some(updated)
    }

    fn set_channel_status(&self, channel_id: u64, status: ChannelStatus, enabled: bool) {
        if let Some(channel) = self.channels.write().get_mut(&channel_id) {
            channel.status = status;
        }
        self.listeners.emit(&AbilityEvent::ChannelStatusChanged {
            channel_id,
            enabled,
            timestamp: Instant::now(),
        });
    }
}

impl Default for AbilityIndex {
    fn default() -> Self {
        Self::new()
    }
}

fn weighted_pick<'a>(pool: &[&'a Ability]) -> &'a Ability {
    let total: u32 = pool.iter().map(|a| a.effective_weight()).sum();
    if total == 0 {
        return pool[0];
    }
    let mut roll = rand::thread_rng().gen_range(0..total);
    for ability in pool {
        let w = ability.effective_weight();
        if roll < w {
            return ability;
        }
        roll -= w;
    }
    pool[pool.len() - 1]
}
