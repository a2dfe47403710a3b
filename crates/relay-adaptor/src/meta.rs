//! Per-request adaptor state (§3 `RelayMeta`).

use relay_core::RequestId;
use std::time::Instant;

/// The relay mode a client request maps to (§6's HTTP surface table).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayMode {
    Chat,
    ResponseApi,
    ClaudeMessages,
    Image,
    Audio,
    Realtime,
}

/// Per-request, in-memory-only state rebuilt on each retry from the
/// freshly-selected channel (§3). The adaptor is stateless across requests
/// and is re-initialized from this on every dispatch (§9).
#[derive(Debug, Clone)]
pub struct RelayMeta {
    pub request_id: RequestId,
    pub mode: RelayMode,
    pub channel_type: String,
    pub channel_id: u64,
    pub token_id: u64,
    pub user_id: u64,
    pub group: String,
    pub base_url: String,
    pub api_key: String,
    pub origin_model: String,
    pub actual_model: String,
    pub start_time: Instant,
    pub forced_system_prompt: Option<String>,
}

impl RelayMeta {
    pub fn new(
        request_id: RequestId,
        mode: RelayMode,
        channel_type: impl Into<String>,
        channel_id: u64,
        origin_model: impl Into<String>,
        actual_model: impl Into<String>,
    ) -> Self {
        Self {
            request_id,
            mode,
            channel_type: channel_type.into(),
            channel_id,
            token_id: 0,
            user_id: 0,
            group: String::new(),
            base_url: String::new(),
            api_key: String::new(),
            origin_model: origin_model.into(),
            actual_model: actual_model.into(),
            start_time: Instant::now(),
            forced_system_prompt: None,
        }
    }
}

/// Token counts parsed out of an upstream response (§4.3).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Usage {
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
    pub cached_tokens: u64,
    pub tool_tokens: u64,
}

impl Usage {
    pub fn total_tokens(&self) -> u64 {
        self.prompt_tokens + self.completion_tokens + self.tool_tokens
    }
}

/// Per-model quota conversion multipliers and capability limits (§4.3
/// `DefaultPricing`).
#[derive(Debug, Clone, Copy)]
pub struct ModelPricing {
    pub input_ratio: f64,
    pub cached_input_ratio: f64,
    pub completion_ratio: f64,
    pub max_tokens: u64,
    pub image_price_usd: f64,
}
