//! Process-wide gateway configuration (§6).
//!
//! Loaded once at startup from a TOML file with environment overrides, the
//! same `serde`-first approach the teacher uses for per-layer builder
//! configs, just applied to the whole process instead of one middleware.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// The enumerated configuration surface from the distilled spec's §6 table.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// Base retry budget per client request (`RetryTimes`).
    pub retry_times: usize,
    /// Ability suspension duration for 429s, in seconds.
    pub channel_suspend_seconds_for_429: u64,
    /// Ability suspension duration for 5xx, in seconds.
    pub channel_suspend_seconds_for_5xx: u64,
    /// Ability suspension duration for auth/quota/permission errors, in seconds.
    pub channel_suspend_seconds_for_auth: u64,
    /// Whether `shouldDisable` is allowed to auto-disable a channel.
    pub automatic_disable_channel_enabled: bool,
    /// Response-time EMA threshold past which a bulk test auto-disables a channel.
    pub channel_disable_threshold_seconds: f64,
    /// Pacing interval between bulk-test probes, in milliseconds.
    pub request_interval_ms: u64,
    /// Default `timeout_s` for `pre()` when the caller omits one.
    pub external_billing_default_timeout_sec: u64,
    /// Upper clamp for caller-supplied `timeout_s`.
    pub external_billing_max_timeout_sec: u64,
    /// Enables verbose request/response logging.
    pub debug_enabled: bool,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            retry_times: 3,
            channel_suspend_seconds_for_429: 60,
            channel_suspend_seconds_for_5xx: 30,
            channel_suspend_seconds_for_auth: 300,
            automatic_disable_channel_enabled: true,
            channel_disable_threshold_seconds: 10.0,
            request_interval_ms: 200,
            external_billing_default_timeout_sec: 600,
            external_billing_max_timeout_sec: 3600,
            debug_enabled: false,
        }
    }
}

impl GatewayConfig {
    /// Parses a TOML document, falling back to defaults for any absent field.
    pub fn from_toml_str(raw: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(raw)
    }

    /// `T_429` as a [`Duration`].
    pub fn suspend_for_429(&self) -> Duration {
        Duration::from_secs(self.channel_suspend_seconds_for_429)
    }

    /// `T_5xx` as a [`Duration`].
    pub fn suspend_for_5xx(&self) -> Duration {
        Duration::from_secs(self.channel_suspend_seconds_for_5xx)
    }

    /// `T_auth` as a [`Duration`].
    pub fn suspend_for_auth(&self) -> Duration {
        Duration::from_secs(self.channel_suspend_seconds_for_auth)
    }

    /// Clamps a caller-supplied `timeout_s` into `[configured_min, configured_max]`
    /// per §4.5's invariant. `configured_min` is fixed at 1 second; a caller asking
    /// for less is almost certainly a mistake rather than a deliberate choice.
    pub fn clamp_billing_timeout(&self, requested_secs: Option<u64>) -> Duration {
        let min = 1u64;
        let max = self.external_billing_max_timeout_sec;
        let requested = requested_secs.unwrap_or(self.external_billing_default_timeout_sec);
        Duration::from_secs(requested.clamp(min, max))
    }
}
