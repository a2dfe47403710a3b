//! Background channel health probing (§6's `RequestInterval`/
//! `ChannelDisableThreshold` config keys): drives a `relay_healthcheck`
//! prober off the same `AdaptorRegistry` the engine dispatches through, on a
//! timer for the lifetime of the process.

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use relay_ability::Channel;
use relay_adaptor::{AdaptorRegistry, RelayMeta, RelayMode};
use relay_core::RequestId;
use relay_healthcheck::{ChannelProbe, HealthProber, ProbeOutcome};

/// Issues a channel's cheap "is this adaptor reachable" check by calling
/// `Adaptor::init` with a synthetic, credential-less `RelayMeta` — the one
/// call in the trait that binds per-request state without requiring a real
/// payload. A channel whose type has no adaptor registered in this
/// deployment is reported unhealthy rather than skipped, since it cannot
/// actually serve a request yet either.
pub struct RegistryProbe {
    registry: Arc<AdaptorRegistry>,
}

impl RegistryProbe {
    pub fn new(registry: Arc<AdaptorRegistry>) -> Self {
        Self { registry }
    }
}

impl ChannelProbe for RegistryProbe {
    fn probe(&self, channel: &Channel) -> impl Future<Output = ProbeOutcome> + Send {
        let registry = Arc::clone(&self.registry);
        let type_tag = channel.type_tag.clone();
        let channel_id = channel.id;
        async move {
            let started = Instant::now();
            let Ok(adaptor) = registry.resolve(&type_tag) else {
                return ProbeOutcome::unhealthy(started.elapsed());
            };

            let meta = RelayMeta::new(
                RequestId::new(),
                RelayMode::Chat,
                type_tag,
                channel_id,
                String::new(),
                String::new(),
            );

            match adaptor.init(&meta).await {
                Ok(()) => ProbeOutcome::healthy(started.elapsed()),
                Err(_) => ProbeOutcome::unhealthy(started.elapsed()),
            }
        }
    }
}

/// Runs bulk health tests on `config.request_interval_ms` cadence for as
/// long as the process lives. Spawned once at startup; a probe-in-progress
/// guard inside `HealthProber` means an overlapping tick is simply skipped
/// rather than queued.
pub fn spawn_health_loop(prober: Arc<HealthProber<RegistryProbe>>, interval: Duration) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval.max(Duration::from_millis(1)));
        loop {
            ticker.tick().await;
            if let Err(err) = prober.run_bulk_test().await {
                tracing::debug!(%err, "skipped health probe pass: previous bulk test still running");
            }
        }
    });
}
