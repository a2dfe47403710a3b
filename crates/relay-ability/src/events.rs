//! Observability events for ability selection and suspension.

use relay_core::RelayEvent;
use std::time::Instant;

/// An event emitted by [`crate::index::AbilityIndex`].
#[derive(Debug, Clone)]
pub enum AbilityEvent {
    /// A candidate channel was chosen for (group, model).
    CandidateSelected {
        group: String,
        model: String,
        channel_id: u64,
        timestamp: Instant,
    },
    /// `FindCandidate` exhausted every pool with no survivor.
    NoCandidateFound {
        group: String,
        model: String,
        timestamp: Instant,
    },
    /// An ability was suspended for a classified failure (§4.7).
    AbilitySuspended {
        group: String,
        model: String,
        channel_id: u64,
        timestamp: Instant,
    },
    /// All abilities for a channel were enabled or disabled (§4.1).
    ChannelStatusChanged {
        channel_id: u64,
        enabled: bool,
        timestamp: Instant,
    },
    /// A channel's response-time EMA was updated by a health probe (§4.10).
    ChannelHealthRecorded {
        channel_id: u64,
        ema_ms: u64,
        timestamp: Instant,
    },
}

impl RelayEvent for AbilityEvent {
    fn event_type(&self) -> &'static str {
        match self {
            AbilityEvent::CandidateSelected { .. } => "ability_candidate_selected",
            AbilityEvent::NoCandidateFound { .. } => "ability_no_candidate",
            AbilityEvent::AbilitySuspended { .. } => "ability_suspended",
            AbilityEvent::ChannelStatusChanged { .. } => "ability_channel_status_changed",
            AbilityEvent::ChannelHealthRecorded { .. } => "ability_channel_health_recorded",
        }
    }

    fn timestamp(&self) -> Instant {
        match self {
            AbilityEvent::CandidateSelected { timestamp, .. }
            | AbilityEvent::NoCandidateFound { timestamp, .. }
            | AbilityEvent::AbilitySuspended { timestamp, .. }
            | AbilityEvent::ChannelStatusChanged { timestamp, .. }
            | AbilityEvent::ChannelHealthRecorded { timestamp, .. } => *timestamp,
        }
    }

    fn source(&self) -> &str {
        match self {
            AbilityEvent::CandidateSelected { model, .. } => model,
            AbilityEvent::NoCandidateFound { model, .. } => model,
            AbilityEvent::AbilitySuspended { model, .. } => model,
            AbilityEvent::ChannelStatusChanged { .. } => "channel",
            AbilityEvent::ChannelHealthRecorded { .. } => "channel",
        }
    }
}
