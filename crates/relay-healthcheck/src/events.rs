//! Observability events for the health prober.

use relay_core::RelayEvent;
use std::time::Instant;

#[derive(Debug, Clone)]
pub enum HealthEvent {
    /// One channel was probed; carries the post-probe EMA.
    ChannelProbed {
        channel_id: u64,
        healthy: bool,
        ema_ms: u64,
        timestamp: Instant,
    },
    /// A channel's EMA crossed `channel_disable_threshold_seconds` and it
    /// was auto-disabled.
    ChannelAutoDisabled { channel_id: u64, timestamp: Instant },
    /// A bulk test was rejected because one was already in flight.
    BulkTestRejected { timestamp: Instant },
}

impl RelayEvent for HealthEvent {
    fn event_type(&self) -> &'static str {
        match self {
            HealthEvent::ChannelProbed { .. } => "health_channel_probed",
            HealthEvent::ChannelAutoDisabled { .. } => "health_channel_auto_disabled",
            HealthEvent::BulkTestRejected { .. } => "health_bulk_test_rejected",
        }
    }

    fn timestamp(&self) -> Instant {
        match self {
            HealthEvent::ChannelProbed { timestamp, .. }
            | HealthEvent::ChannelAutoDisabled { timestamp, .. }
            | HealthEvent::BulkTestRejected { timestamp } => *timestamp,
        }
    }

    fn source(&self) -> &str {
        "channel"
    }
}
