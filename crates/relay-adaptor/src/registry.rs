//! Resolves a channel's type tag to its `Adaptor` (§4.3).

use crate::adaptor::Adaptor;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("no adaptor registered for channel type {0:?}")]
pub struct UnknownAdaptorType(pub String);

/// Maps channel type tag → adaptor implementation.
///
/// Populated at startup from whatever provider adaptors the deployment
/// links in; this crate only defines the interface and the lookup table.
#[derive(Default)]
pub struct AdaptorRegistry {
    adaptors: RwLock<HashMap<String, Arc<dyn Adaptor>>>,
}

impl AdaptorRegistry {
    pub fn new() -> Self {
        Self {
            adaptors: RwLock::new(HashMap::new()),
        }
    }

    pub fn register(&self, type_tag: impl Into<String>, adaptor: Arc<dyn Adaptor>) {
        self.adaptors.write().insert(type_tag.into(), adaptor);
    }

    pub fn resolve(&self, type_tag: &str) -> Result<Arc<dyn Adaptor>, UnknownAdaptorType> {
        self.adaptors
            .read()
            .get(type_tag)
            .cloned()
            .ok_or_else(|| UnknownAdaptorType(type_tag.to_string()))
    }

    pub fn registered_types(&self) -> Vec<String> {
        self.adaptors.read().keys().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AdaptorError;
    use crate::meta::{ModelPricing, RelayMeta, Usage};
    use async_trait::async_trait;
    use futures::stream;

    struct StubAdaptor;

    #[async_trait]
    impl Adaptor for StubAdaptor {
        async fn init(&self, _meta: &RelayMeta) -> Result<(), AdaptorError> {
            Ok(())
        }

        fn build_url(&self, _meta: &RelayMeta) -> Result<String, AdaptorError> {
            Ok("https://example.invalid".to_string())
        }

        fn convert_request(
            &self,
            _meta: &RelayMeta,
            raw_request: crate::adaptor::RawRequest,
        ) -> Result<crate::adaptor::UpstreamRequest, AdaptorError> {
            Ok(raw_request)
        }

        async fn execute(
            &self,
            _meta: &RelayMeta,
            _body: crate::adaptor::UpstreamRequest,
        ) -> Result<crate::adaptor::UpstreamResponse, AdaptorError> {
            Ok(crate::adaptor::UpstreamResponse {
                status: 200,
                body: Box::pin(stream::empty()),
            })
        }

        async fn parse_response(
            &self,
            _response: crate::adaptor::UpstreamResponse,
            _meta: &RelayMeta,
        ) -> Result<Usage, AdaptorError> {
            Ok(Usage::default())
        }

        fn supported_models(&self) -> Vec<String> {
            vec!["stub-model".to_string()]
        }

        fn default_pricing(&self, _model: &str) -> Option<ModelPricing> {
            None
        }
    }

    #[test]
    fn resolves_registered_type() {
        let registry = AdaptorRegistry::new();
        registry.register("stub", Arc::new(StubAdaptor));
        assert!(registry.resolve("stub").is_ok());
        assert!(registry.resolve("missing").is_err());
    }
}
