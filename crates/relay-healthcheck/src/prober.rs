//! Scheduled channel health prober and bulk-test singleton guard (§4.10).

use crate::error::BulkTestInProgress;
use crate::events::HealthEvent;
use crate::probe::ChannelProbe;
use relay_ability::AbilityIndex;
use relay_core::{EventListener, EventListeners, GatewayConfig};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

#[cfg(feature = "tracing")]
use tracing::{info, warn};

/// EMA smoothing factor: each probe moves the channel's tracked response
/// time a fifth of the way toward the new sample.
const EMA_ALPHA: f64 = 0.2;

/// Periodically (or on demand) probes every enabled channel through its
/// adaptor, folds the result into the channel's response-time EMA, and
/// auto-disables channels whose EMA exceeds the configured threshold.
///
/// Only one bulk test may run at a time; a caller that invokes
/// [`HealthProber::run_bulk_test`] while one is already in flight gets
/// [`BulkTestInProgress`] back rather than racing the running pass — the
/// `AtomicBool` compare-exchange mirrors the single-mutation-point pattern
/// used for state transitions elsewhere in this workspace.
pub struct HealthProber<P> {
    index: Arc<AbilityIndex>,
    probe: Arc<P>,
    request_interval: Duration,
    disable_threshold_seconds: f64,
    automatic_disable_enabled: bool,
    bulk_test_in_progress: Arc<AtomicBool>,
    listeners: EventListeners<HealthEvent>,
}

impl<P> HealthProber<P>
where
    P: ChannelProbe + 'static,
{
    pub fn new(index: Arc<AbilityIndex>, probe: Arc<P>, config: &GatewayConfig) -> Self {
        Self {
            index,
            probe,
            request_interval: Duration::from_millis(config.request_interval_ms),
            disable_threshold_seconds: config.channel_disable_threshold_seconds,
            automatic_disable_enabled: config.automatic_disable_channel_enabled,
            bulk_test_in_progress: Arc::new(AtomicBool::new(false)),
            listeners: EventListeners::new(),
        }
    }

    pub fn add_listener<L>(&mut self, listener: L)
    where
        L: EventListener<HealthEvent> + 'static,
    {
        self.listeners.add(listener);
    }

    /// Probes every currently-enabled channel once, pacing requests by
    /// `RequestInterval`. Returns the number of channels probed.
    ///
    /// Refuses to start a second pass while one is already running: this is
    /// the "bulk test in progress" singleton guard.
    pub async fn run_bulk_test(&self) -> Result<usize, BulkTestInProgress> {
        if self
            .bulk_test_in_progress
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            self.listeners.emit(&HealthEvent::BulkTestRejected {
                timestamp: Instant::now(),
            });
            #[cfg(feature = "tracing")]
            warn!("bulk health test rejected: one is already in progress");
            return Err(BulkTestInProgress);
        }

        let channels: Vec<_> = self
            .index
            .snapshot_channels()
            .into_iter()
            .filter(|c| c.status.is_enabled())
            .collect();

        let mut probed = 0usize;
        let mut first = true;
        for channel in &channels {
            if !first {
                tokio::time::sleep(self.request_interval).await;
            }
            first = false;

            let outcome = self.probe.probe(channel).await;
            let ema_ms = self
                .index
                .record_response_time(channel.id, outcome.latency.as_millis() as u64, EMA_ALPHA)
                .unwrap_or(0.0);
            probed += 1;

            self.listeners.emit(&HealthEvent::ChannelProbed {
                channel_id: channel.id,
                healthy: outcome.healthy,
                ema_ms: ema_ms.round() as u64,
                timestamp: Instant::now(),
            });

            let exceeds_threshold = ema_ms / 1000.0 > self.disable_threshold_seconds;
            if self.automatic_disable_enabled && (!outcome.healthy || exceeds_threshold) {
                self.index.disable_channel(channel.id, true);
                self.listeners.emit(&HealthEvent::ChannelAutoDisabled {
                    channel_id: channel.id,
                    timestamp: Instant::now(),
                });
                #[cfg(feature = "tracing")]
                info!(channel_id = channel.id, ema_ms, "auto-disabled channel after health probe");
            }
        }

        self.bulk_test_in_progress.store(false, Ordering::SeqCst);
        Ok(probed)
    }

    /// Whether a bulk test is currently running.
    pub fn is_running(&self) -> bool {
        self.bulk_test_in_progress.load(Ordering::SeqCst)
    }
}
