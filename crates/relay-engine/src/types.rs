//! Request input to [`crate::engine::RelayEngine::relay`] (§3 `RelayMeta`,
//! §4.6).

use relay_adaptor::{RawRequest, RelayMode};

/// What the caller (an HTTP route handler in `relay-gateway`) knows before
/// the engine takes over: who is asking, what for, and the raw body to
/// replay across retries.
#[derive(Debug, Clone)]
pub struct RelayRequest {
    pub group: String,
    pub model: String,
    pub token_id: u64,
    pub user_id: u64,
    pub mode: RelayMode,
    /// Set when the client pinned a specific upstream channel; per §4.6
    /// step 6 this disables retry entirely regardless of outcome.
    pub pinned_channel_id: Option<u64>,
    /// Quota reserved before dispatch, derived from declared `max_tokens` ×
    /// the model's input/completion ratio (or a flat estimate for
    /// image/audio modes).
    pub estimated_quota: i64,
    /// The client's request body, replayed unmodified across retries (§4.6
    /// step 7: "the engine MUST buffer or memoize the client body once").
    pub body: RawRequest,
}

impl RelayRequest {
    pub fn new(
        group: impl Into<String>,
        model: impl Into<String>,
        token_id: u64,
        user_id: u64,
        mode: RelayMode,
        estimated_quota: i64,
        body: RawRequest,
    ) -> Self {
        Self {
            group: group.into(),
            model: model.into(),
            token_id,
            user_id,
            mode,
            pinned_channel_id: None,
            estimated_quota,
            body,
        }
    }

    pub fn with_pinned_channel(mut self, channel_id: u64) -> Self {
        self.pinned_channel_id = Some(channel_id);
        self
    }
}
