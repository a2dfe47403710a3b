//! The probe trait a channel prober is driven by (§4.10).

use relay_ability::Channel;
use std::future::Future;
use std::time::Duration;

/// Result of a single cheap request issued through a channel's adaptor.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProbeOutcome {
    pub healthy: bool,
    pub latency: Duration,
}

impl ProbeOutcome {
    pub fn healthy(latency: Duration) -> Self {
        Self { healthy: true, latency }
    }

    pub fn unhealthy(latency: Duration) -> Self {
        Self { healthy: false, latency }
    }
}

/// Implementors know how to issue one cheap request through a channel's
/// adaptor and report how it went. Production implementations wrap an
/// `AdaptorRegistry` lookup; tests can use a plain closure via the blanket
/// impl below.
pub trait ChannelProbe: Send + Sync {
    fn probe(&self, channel: &Channel) -> impl Future<Output = ProbeOutcome> + Send;
}

impl<F, Fut> ChannelProbe for F
where
    F: Fn(&Channel) -> Fut + Send + Sync,
    Fut: Future<Output = ProbeOutcome> + Send,
{
    fn probe(&self, channel: &Channel) -> impl Future<Output = ProbeOutcome> + Send {
        self(channel)
    }
}
