//! Central place that turns relay-engine/ledger/suspension events into
//! `metrics` crate counters, histograms and gauges (§4.8).
//!
//! Every function here is a direct counterpart of a `counter!`/`histogram!`/
//! `gauge!` call site the teacher scatters inline through its own resilience
//! crates; they are collected in one module here because nothing else in
//! this workspace owns a single event stream the way a `tower::Service`
//! wrapper owns its own call path. No dashboards, no pricing display — this
//! crate only emits, it never renders.

use std::time::Duration;

#[cfg(feature = "metrics")]
use metrics::{counter, gauge, histogram};

/// Records the outcome of one relay attempt (§4.6, §8).
///
/// `outcome` is one of `"success"`, `"retry"`, `"exhausted"`, `"client_cancel"`.
pub fn record_relay_outcome(mode: &str, channel_type: &str, outcome: &str, duration: Duration) {
    #[cfg(feature = "metrics")]
    {
        counter!(
            "relay_requests_total",
            "mode" => mode.to_string(),
            "channel_type" => channel_type.to_string(),
            "outcome" => outcome.to_string(),
        )
        .increment(1);
        histogram!(
            "relay_request_duration_seconds",
            "mode" => mode.to_string(),
            "outcome" => outcome.to_string(),
        )
        .record(duration.as_secs_f64());
    }
    #[cfg(not(feature = "metrics"))]
    let _ = (mode, channel_type, outcome, duration);
}

/// Records a quota change applied to a token by `relay-ledger` (§4.4).
/// `delta` is signed: negative for a reservation or settle-down, positive
/// for a refund or settle-up.
pub fn record_quota_delta(token_id: u64, delta: i64) {
    #[cfg(feature = "metrics")]
    {
        histogram!("relay_quota_delta", "token_id" => token_id.to_string()).record(delta as f64);
    }
    #[cfg(not(feature = "metrics"))]
    let _ = (token_id, delta);
}

/// Records a suspension decision from `relay-suspension` (§4.7).
pub fn record_suspension(channel_id: u64, ability_key: &str, class: &str, duration: Duration) {
    #[cfg(feature = "metrics")]
    {
        counter!(
            "relay_suspensions_total",
            "channel_id" => channel_id.to_string(),
            "ability" => ability_key.to_string(),
            "class" => class.to_string(),
        )
        .increment(1);
        gauge!(
            "relay_suspension_duration_seconds",
            "channel_id" => channel_id.to_string(),
            "class" => class.to_string(),
        )
        .set(duration.as_secs_f64());
    }
    #[cfg(not(feature = "metrics"))]
    let _ = (channel_id, ability_key, class, duration);
}

/// Records the result of a `relay-healthcheck` probe (§4.10).
pub fn record_channel_health(channel_id: u64, rtt_ema: Duration, healthy: bool) {
    #[cfg(feature = "metrics")]
    {
        gauge!("relay_channel_rtt_ema_seconds", "channel_id" => channel_id.to_string())
            .set(rtt_ema.as_secs_f64());
        gauge!("relay_channel_healthy", "channel_id" => channel_id.to_string())
            .set(if healthy { 1.0 } else { 0.0 });
    }
    #[cfg(not(feature = "metrics"))]
    let _ = (channel_id, rtt_ema, healthy);
}

#[cfg(all(test, feature = "metrics"))]
mod tests {
    use super::*;
    use metrics::set_global_recorder;
    use metrics_util::debugging::{DebugValue, DebuggingRecorder};

    #[test]
    fn record_relay_outcome_emits_counter_and_histogram() {
        let recorder = DebuggingRecorder::new();
        let snapshotter = recorder.snapshotter();
        let _ = set_global_recorder(recorder);

        record_relay_outcome("chat", "openai", "success", Duration::from_millis(120));

        let snapshot = snapshotter.snapshot().into_vec();
        assert!(snapshot.iter().any(|(key, _, _, value)| {
            key.key().name() == "relay_requests_total"
                && matches!(value, DebugValue::Counter(1))
        }));
    }
}
