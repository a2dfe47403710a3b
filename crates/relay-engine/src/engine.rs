//! Top-level per-request orchestrator (§4.6).

use std::sync::Arc;
use std::time::Instant;

use bytes::{Bytes, BytesMut};
use futures::stream::{self, BoxStream, StreamExt};
use parking_lot::Mutex as SyncMutex;
use relay_ability::{AbilityIndex, ChannelSelector, PriorFailureClass};
use relay_adaptor::{AdaptorRegistry, ModelPricing, RelayMeta, StreamChunk, Usage, UpstreamResponse};
use relay_core::{EventListener, EventListeners, GatewayConfig, RelayError, RequestId};
use relay_ledger::QuotaLedger;
use relay_suspension::{SuspensionDurations, SuspensionPolicy, UpstreamSignal};

use crate::budget::RetryBudget;
use crate::classify::classify_adaptor_error;
use crate::events::RelayEngineEvent;
use crate::queue::CriticalTaskQueue;
use crate::types::RelayRequest;

#[cfg(feature = "tracing")]
use tracing::{error, warn};

/// Orchestrates one client HTTP request from channel selection through
/// dispatch, retry and the asynchronous suspension side effects (§4.6).
///
/// Holds the shared, process-wide collaborators; every call to
/// [`RelayEngine::relay`] owns its own [`RelayMeta`] and [`RetryBudget`], so
/// concurrent requests never contend on anything but the collaborators'
/// own internal locks.
pub struct RelayEngine {
    index: Arc<AbilityIndex>,
    ledger: Arc<QuotaLedger>,
    registry: Arc<AdaptorRegistry>,
    suspension: Arc<SuspensionPolicy>,
    queue: Arc<CriticalTaskQueue>,
    config: GatewayConfig,
    listeners: EventListeners<RelayEngineEvent>,
}

impl RelayEngine {
    pub fn new(
        index: Arc<AbilityIndex>,
        ledger: Arc<QuotaLedger>,
        registry: Arc<AdaptorRegistry>,
        config: GatewayConfig,
    ) -> Self {
        let suspension = SuspensionPolicy::new(
            SuspensionDurations {
                t_429: config.suspend_for_429(),
                t_5xx: config.suspend_for_5xx(),
                t_auth: config.suspend_for_auth(),
            },
            config.automatic_disable_channel_enabled,
        );

        Self {
            index,
            ledger,
            registry,
            suspension: Arc::new(suspension),
            queue: Arc::new(CriticalTaskQueue::new()),
            config,
            listeners: EventListeners::new(),
        }
    }

    pub fn add_listener<L>(&mut self, listener: L)
    where
        L: EventListener<RelayEngineEvent> + 'static,
    {
        self.listeners.add(listener);
    }

    /// Awaits every outstanding suspension/settlement side effect. Call
    /// this during graceful shutdown, never from the hot request path.
    pub async fn shutdown(&self) {
        self.queue.drain().await;
    }

    /// Runs the full request lifecycle from §4.6: select, reserve, dispatch,
    /// classify, retry, and surface a final response or error.
    pub async fn relay(&self, request: RelayRequest) -> Result<UpstreamResponse, RelayError> {
        let request_id = RequestId::new();
        let start = Instant::now();

        let mut exclude: Vec<u64> = Vec::new();
        let mut prior_failure = PriorFailureClass::None;
        let mut budget = RetryBudget::new(self.config.retry_times);
        let mut has_doubled_for_429 = false;
        let mut attempt = 0usize;
        let mut last_error = RelayError::ClientRequest {
            status: 503,
            cause: "no channel was available for this request".to_string(),
        };

        loop {
            attempt += 1;

            let channel = match self.pick_channel(&request, &exclude, prior_failure) {
                Ok(channel) => channel,
                Err(err) => {
                    // §9: the client sees the *last observed upstream
                    // failure*. Running out of untried channels mid-retry is
                    // not itself an upstream failure, so only surface it when
                    // no attempt has dispatched yet.
                    if attempt == 1 {
                        last_error = err;
                    }
                    break;
                }
            };

            let mut meta = RelayMeta::new(
                request_id.clone(),
                request.mode,
                channel.type_tag.clone(),
                channel.id,
                request.model.clone(),
                request.model.clone(),
            );
            meta.token_id = request.token_id;
            meta.user_id = request.user_id;
            meta.group = request.group.clone();

            let reserved = match self.ledger.reserve(request.token_id, request.estimated_quota) {
                Ok(_) => request.estimated_quota,
                Err(err) => {
                    last_error = RelayError::Internal { cause: err.to_string() };
                    break;
                }
            };

            match self.dispatch_once(&meta, &request.body).await {
                Ok(response) => {
                    self.listeners.emit(&RelayEngineEvent::DispatchSucceeded {
                        request_id: request_id.as_str().to_string(),
                        channel_id: channel.id,
                        attempt,
                        timestamp: Instant::now(),
                    });
                    #[cfg(feature = "metrics")]
                    relay_metrics::record_relay_outcome(
                        mode_label(request.mode),
                        &meta.channel_type,
                        "success",
                        start.elapsed(),
                    );
                    return Ok(self.tee_and_settle(response, meta, reserved, request_id.as_str().to_string()));
                }
                Err(adaptor_err) => {
                    let is_cancel = adaptor_err.is_cancellation;
                    let status = adaptor_err.status;
                    let relay_err = classify_adaptor_error(adaptor_err);

                    // Refund this attempt's reservation; nothing was settled.
                    let _ = self.ledger.refund(request.token_id, reserved);

                    let pinned = request.pinned_channel_id.is_some();
                    let retryable = should_retry(&relay_err, pinned);

                    self.listeners.emit(&RelayEngineEvent::DispatchFailed {
                        request_id: request_id.as_str().to_string(),
                        channel_id: channel.id,
                        status,
                        retryable,
                        timestamp: Instant::now(),
                    });

                    self.enqueue_suspension(&request, channel.id, status, &relay_err, is_cancel);

                    if !retryable {
                        last_error = relay_err;
                        break;
                    }

                    if relay_err.is_rate_limited() && !has_doubled_for_429 {
                        budget.double();
                        has_doubled_for_429 = true;
                    }
                    if relay_err.is_payload_too_large() {
                        let viable = self.index.viable_channel_count(&request.group, &request.model, &exclude);
                        if viable == 0 {
                            #[cfg(feature = "tracing")]
                            warn!(
                                request_id = %request_id,
                                "413 retry budget set to 1: viable channel count unavailable (§9 open question)"
                            );
                        }
                        budget.set_for_payload_too_large(viable);
                    }

                    exclude.push(channel.id);
                    prior_failure = failure_class(&relay_err);
                    last_error = relay_err;

                    if !budget.has_remaining() {
                        self.listeners.emit(&RelayEngineEvent::RetriesExhausted {
                            request_id: request_id.as_str().to_string(),
                            attempts: attempt,
                            timestamp: Instant::now(),
                        });
                        break;
                    }
                    budget.withdraw();

                    self.listeners.emit(&RelayEngineEvent::RetryScheduled {
                        request_id: request_id.as_str().to_string(),
                        attempt: attempt + 1,
                        channel_id: channel.id,
                        timestamp: Instant::now(),
                    });
                }
            }
        }

        #[cfg(feature = "metrics")]
        relay_metrics::record_relay_outcome(
            mode_label(request.mode),
            "unknown",
            if last_error.is_client_cancel() { "client_cancel" } else { "exhausted" },
            start.elapsed(),
        );

        #[cfg(feature = "tracing")]
        log_final_error(&request_id, &last_error);

        Err(rewrite_final_error(last_error, request_id.as_str(), attempt))
    }

    fn pick_channel(
        &self,
        request: &RelayRequest,
        exclude: &[u64],
        prior_failure: PriorFailureClass,
    ) -> Result<relay_ability::Channel, RelayError> {
        if let Some(pinned_id) = request.pinned_channel_id {
            return self
                .index
                .snapshot_channels()
                .into_iter()
                .find(|c| c.id == pinned_id && c.status.is_enabled())
                .ok_or_else(|| RelayError::ClientRequest {
                    status: 400,
                    cause: format!("pinned channel {pinned_id} is not available"),
                });
        }

        ChannelSelector::new(&self.index)
            .select(&request.group, &request.model, exclude, prior_failure)
            .map_err(|err| RelayError::ClientRequest {
                status: 503,
                cause: err.to_string(),
            })
    }

    async fn dispatch_once(
        &self,
        meta: &RelayMeta,
        body: &Bytes,
    ) -> Result<UpstreamResponse, relay_adaptor::AdaptorError> {
        let adaptor = self
            .registry
            .resolve(&meta.channel_type)
            .map_err(|err| relay_adaptor::AdaptorError::new(500, err.to_string()))?;

        adaptor.init(meta).await?;
        let upstream_request = adaptor.convert_request(meta, body.clone())?;
        let response = adaptor.execute(meta, upstream_request).await?;

        if response.status >= 400 {
            return Err(relay_adaptor::AdaptorError::new(
                response.status,
                format!("upstream returned status {}", response.status),
            ));
        }

        Ok(response)
    }

    /// Wraps a successful response's body so it streams to the client
    /// unmodified while a detached task (§5) buffers a copy, parses it for
    /// usage once the stream ends, and settles the ledger against the
    /// estimate reserved for this attempt.
    fn tee_and_settle(
        &self,
        response: UpstreamResponse,
        meta: RelayMeta,
        reserved: i64,
        request_id: String,
    ) -> UpstreamResponse {
        let status = response.status;
        let buffer = Arc::new(SyncMutex::new(BytesMut::new()));
        let buffer_write = Arc::clone(&buffer);

        let tapped: BoxStream<'static, Option<StreamChunk>> = Box::pin(response.body.map(move |chunk: StreamChunk| {
            if let Ok(bytes) = &chunk {
                buffer_write.lock().extend_from_slice(bytes);
            }
            Some(chunk)
        }));

        let registry = Arc::clone(&self.registry);
        let ledger = Arc::clone(&self.ledger);
        let queue = Arc::clone(&self.queue);
        let listeners = self.listeners.clone();
        let token_id_for_settle = meta.token_id;

        let finalize: BoxStream<'static, Option<StreamChunk>> = Box::pin(stream::once(async move {
            let collected = buffer.lock().split().freeze();
            queue.spawn(async move {
                settle_after_stream(
                    registry,
                    ledger,
                    meta,
                    collected,
                    reserved,
                    token_id_for_settle,
                    request_id,
                    listeners,
                )
                .await;
            });
            None
        }));

        let body: BoxStream<'static, StreamChunk> =
            Box::pin(tapped.chain(finalize).filter_map(|item: Option<StreamChunk>| async move { item }));

        UpstreamResponse { status, body }
    }

    fn enqueue_suspension(
        &self,
        request: &RelayRequest,
        channel_id: u64,
        status: u16,
        error: &RelayError,
        is_client_cancel: bool,
    ) {
        let index = Arc::clone(&self.index);
        let suspension = Arc::clone(&self.suspension);
        let group = request.group.clone();
        let model = request.model.clone();
        let error_cause = error.to_string();

        self.queue.spawn(async move {
            let signal = UpstreamSignal {
                status,
                error_type: None,
                error_code: None,
                message: Some(error_cause.as_str()),
            };
            suspension.handle(&index, &group, &model, channel_id, &signal, is_client_cancel);
        });
    }
}

async fn settle_after_stream(
    registry: Arc<AdaptorRegistry>,
    ledger: Arc<QuotaLedger>,
    meta: RelayMeta,
    collected: Bytes,
    reserved: i64,
    token_id: u64,
    request_id: String,
    listeners: EventListeners<RelayEngineEvent>,
) {
    let adaptor = match registry.resolve(&meta.channel_type) {
        Ok(adaptor) => adaptor,
        Err(_) => {
            let _ = ledger.refund(token_id, reserved);
            listeners.emit(&RelayEngineEvent::SettlementRecorded {
                request_id,
                token_id,
                user_id: meta.user_id,
                group: meta.group.clone(),
                model: meta.actual_model.clone(),
                delta: -reserved,
                succeeded: false,
                timestamp: Instant::now(),
            });
            return;
        }
    };

    let response = UpstreamResponse {
        status: 200,
        body: Box::pin(stream::once(async move { Ok(collected) })),
    };

    match adaptor.parse_response(response, &meta).await {
        Ok(usage) => {
            let pricing = adaptor
                .default_pricing(&meta.actual_model)
                .unwrap_or(ModelPricing {
                    input_ratio: 1.0,
                    cached_input_ratio: 1.0,
                    completion_ratio: 1.0,
                    max_tokens: 0,
                    image_price_usd: 0.0,
                });
            let actual_cost = cost_for(usage, &pricing);
            let delta = actual_cost - reserved;
            let _ = ledger.settle(token_id, delta);
            #[cfg(feature = "metrics")]
            relay_metrics::record_quota_delta(token_id, delta);
            listeners.emit(&RelayEngineEvent::SettlementRecorded {
                request_id,
                token_id,
                user_id: meta.user_id,
                group: meta.group.clone(),
                model: meta.actual_model.clone(),
                delta,
                succeeded: true,
                timestamp: Instant::now(),
            });
        }
        Err(_) => {
            let _ = ledger.refund(token_id, reserved);
            listeners.emit(&RelayEngineEvent::SettlementRecorded {
                request_id,
                token_id,
                user_id: meta.user_id,
                group: meta.group.clone(),
                model: meta.actual_model.clone(),
                delta: -reserved,
                succeeded: false,
                timestamp: Instant::now(),
            });
        }
    }
}

fn cost_for(usage: Usage, pricing: &ModelPricing) -> i64 {
    let prompt_cost = (usage.prompt_tokens.saturating_sub(usage.cached_tokens)) as f64 * pricing.input_ratio;
    let cached_cost = usage.cached_tokens as f64 * pricing.cached_input_ratio;
    let completion_cost = (usage.completion_tokens + usage.tool_tokens) as f64 * pricing.completion_ratio;
    (prompt_cost + cached_cost + completion_cost).round() as i64
}

/// `shouldRetry` (§4.6 step 6).
fn should_retry(error: &RelayError, pinned: bool) -> bool {
    if pinned {
        return false;
    }
    if error.is_client_cancel() {
        return false;
    }
    if error.is_non_retryable_client_request() {
        return false;
    }
    true
}

fn failure_class(error: &RelayError) -> PriorFailureClass {
    match error {
        RelayError::RateLimited { .. } => PriorFailureClass::RateLimited,
        RelayError::PayloadTooLarge { .. } => PriorFailureClass::PayloadTooLarge,
        RelayError::TransientServer { .. } | RelayError::Transport { .. } => PriorFailureClass::TransientServer,
        RelayError::AuthQuotaPermission { .. } => PriorFailureClass::AuthLike,
        _ => PriorFailureClass::None,
    }
}

/// §4.6 step 8: rewrite the user-facing message with the request id, and
/// substitute a clearer message for an exhausted 429 retry sequence.
fn rewrite_final_error(error: RelayError, request_id: &str, attempts: usize) -> RelayError {
    if error.is_rate_limited() && attempts > 1 {
        return RelayError::RateLimited {
            retry_after: None,
            cause: format!("all channels rate-limited (request id: {request_id})"),
        };
    }
    let message = error.with_request_id(request_id);
    match error {
        RelayError::ClientCancel { .. } => RelayError::ClientCancel { cause: message },
        RelayError::ClientRequest { status, .. } => RelayError::ClientRequest { status, cause: message },
        RelayError::RateLimited { retry_after, .. } => RelayError::RateLimited { retry_after, cause: message },
        RelayError::PayloadTooLarge { .. } => RelayError::PayloadTooLarge { cause: message },
        RelayError::AuthQuotaPermission { status, .. } => RelayError::AuthQuotaPermission { status, cause: message },
        RelayError::TransientServer { status, .. } => RelayError::TransientServer { status, cause: message },
        RelayError::Transport { .. } => RelayError::Transport { cause: message },
        RelayError::Internal { .. } => RelayError::Internal { cause: message },
    }
}

#[cfg(feature = "tracing")]
fn log_final_error(request_id: &RequestId, error: &RelayError) {
    if error.is_client_cancel() {
        warn!(request_id = %request_id, "client canceled mid-relay");
    } else {
        error!(request_id = %request_id, error = %error, "relay request failed");
    }
}

#[cfg(feature = "metrics")]
fn mode_label(mode: relay_adaptor::RelayMode) -> &'static str {
    match mode {
        relay_adaptor::RelayMode::Chat => "chat",
        relay_adaptor::RelayMode::ResponseApi => "response_api",
        relay_adaptor::RelayMode::ClaudeMessages => "claude_messages",
        relay_adaptor::RelayMode::Image => "image",
        relay_adaptor::RelayMode::Audio => "audio",
        relay_adaptor::RelayMode::Realtime => "realtime",
    }
}
