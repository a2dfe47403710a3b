//! The `Adaptor` capability boundary (§4.3).
//!
//! The core never inspects provider-specific types; it only ever holds a
//! `dyn Adaptor` resolved by channel type. Concrete provider adaptors
//! (OpenAI, Anthropic, Bedrock, Vertex, ...) are out of scope for this
//! crate — it defines the interface they implement.

use crate::error::AdaptorError;
use crate::meta::{ModelPricing, RelayMeta, Usage};
use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::BoxStream;

/// The raw client request body, passed through unparsed so the adaptor can
/// apply provider-specific translation.
pub type RawRequest = Bytes;

/// A provider-wire-format request body, ready for `Execute`.
pub type UpstreamRequest = Bytes;

/// A chunk of streamed upstream output, forwarded to the client response
/// body without additional buffering (§6 streaming requirement).
pub type StreamChunk = Result<Bytes, AdaptorError>;

/// The response an adaptor hands back from `Execute`: an HTTP-style status
/// plus a possibly-streaming body.
pub struct UpstreamResponse {
    pub status: u16,
    pub body: BoxStream<'static, StreamChunk>,
}

impl std::fmt::Debug for UpstreamResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UpstreamResponse")
            .field("status", &self.status)
            .field("body", &"BoxStream<..>")
            .finish()
    }
}

/// Capability interface a provider-specific implementation exposes to the
/// core (§4.3). Stateless across requests: `Init` binds per-request state
/// freshly on every dispatch, including retries (§9).
#[async_trait]
pub trait Adaptor: Send + Sync {
    /// Binds per-request state ahead of the other calls.
    async fn init(&self, meta: &RelayMeta) -> Result<(), AdaptorError>;

    /// Resolves the upstream URL for this request.
    fn build_url(&self, meta: &RelayMeta) -> Result<String, AdaptorError>;

    /// Translates the unified input into the provider's wire format,
    /// applying model mapping and any provider-specific profile resolution.
    fn convert_request(
        &self,
        meta: &RelayMeta,
        raw_request: RawRequest,
    ) -> Result<UpstreamRequest, AdaptorError>;

    /// Performs the HTTP(S) call; supports streaming bodies.
    async fn execute(
        &self,
        meta: &RelayMeta,
        body: UpstreamRequest,
    ) -> Result<UpstreamResponse, AdaptorError>;

    /// Extracts usage from a (possibly already-streamed) response.
    async fn parse_response(
        &self,
        response: UpstreamResponse,
        meta: &RelayMeta,
    ) -> Result<Usage, AdaptorError>;

    /// Models this adaptor's channel type can serve.
    fn supported_models(&self) -> Vec<String>;

    /// Default per-model pricing, used when a channel has no override.
    fn default_pricing(&self, model: &str) -> Option<ModelPricing>;
}
