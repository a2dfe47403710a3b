use thiserror::Error;

/// Failures returned by [`crate::index::AbilityIndex`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AbilityError {
    /// `FindCandidate` found no row surviving filtering (§4.1 step 7).
    #[error("no viable channel for group={group} model={model}")]
    NoCandidate { group: String, model: String },

    #[error("unknown channel id {0}")]
    UnknownChannel(u64),
}
