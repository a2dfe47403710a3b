//! Thin retry-heuristic wrapper over [`crate::index::AbilityIndex`] (§4.2).
//!
//! Stateless: it just maps the engine's last observed failure class and
//! attempt number onto [`SelectionOptions`], then delegates straight to
//! `find_candidate`.

use crate::index::AbilityIndex;
use crate::types::{Channel, SelectionOptions};
use crate::error::AbilityError;

/// The classified shape of the previous attempt's failure, as seen by the
/// selector. Distinct from [`relay_core::RelayError`] because the selector
/// only cares about the handful of classes that change selection bias.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PriorFailureClass {
    /// First attempt, or a non-retryable 4xx (retry loop stops before
    /// asking the selector again, but the hint is still well-defined).
    None,
    RateLimited,
    PayloadTooLarge,
    TransientServer,
    AuthLike,
}

/// Picks the next channel honoring §4.2's hint table.
pub struct ChannelSelector<'a> {
    index: &'a AbilityIndex,
}

impl<'a> ChannelSelector<'a> {
    pub fn new(index: &'a AbilityIndex) -> Self {
        Self { index }
    }

    pub fn select(
        &self,
        group: &str,
        model: &str,
        exclude: &[u64],
        prior_failure: PriorFailureClass,
    ) -> Result<Channel, AbilityError> {
        let options = Self::hint_for(prior_failure);
        self.index.find_candidate(group, model, exclude, options)
    }

    fn hint_for(prior_failure: PriorFailureClass) -> SelectionOptions {
        match prior_failure {
            PriorFailureClass::None | PriorFailureClass::AuthLike | PriorFailureClass::TransientServer => {
                SelectionOptions::default()
            }
            PriorFailureClass::RateLimited => SelectionOptions {
                prefer_lower_priority: true,
                prefer_larger_context: false,
            },
            PriorFailureClass::PayloadTooLarge => SelectionOptions {
                prefer_lower_priority: false,
                prefer_larger_context: true,
            },
        }
    }
}
