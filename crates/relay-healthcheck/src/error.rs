use thiserror::Error;

/// Returned by [`crate::HealthProber::run_bulk_test`] when a test is already
/// running — the §9 "bulk test in progress" singleton guard.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("a bulk health test is already in progress")]
pub struct BulkTestInProgress;
