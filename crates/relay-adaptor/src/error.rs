use thiserror::Error;

/// Failure returned by an adaptor. Carries both an HTTP-style status code
/// and a raw transport cause; the core classifies on the former and
/// inspects the latter only for client-cancellation detection (§4.3, §7).
#[derive(Debug, Error, Clone)]
#[error("adaptor error (status {status}): {cause}")]
pub struct AdaptorError {
    pub status: u16,
    pub cause: String,
    pub is_cancellation: bool,
}

impl AdaptorError {
    pub fn new(status: u16, cause: impl Into<String>) -> Self {
        Self {
            status,
            cause: cause.into(),
            is_cancellation: false,
        }
    }

    pub fn cancellation(cause: impl Into<String>) -> Self {
        Self {
            status: 408,
            cause: cause.into(),
            is_cancellation: true,
        }
    }

    pub fn transport(cause: impl Into<String>) -> Self {
        Self {
            status: 0,
            cause: cause.into(),
            is_cancellation: false,
        }
    }
}
