//! Error taxonomy shared by every relay component.
//!
//! `RelayError` classifies an upstream or internal failure into the buckets
//! the retry loop and suspension policy reason about, and plays the same
//! composition role as the teacher's `ResilienceError<E>`: one type that
//! every component converts into, so the engine never writes bespoke `From`
//! glue per adaptor.

use std::fmt;
use std::time::Duration;

/// A classified relay failure.
///
/// `status` is the HTTP-style status code the adaptor observed (or an
/// internally-assigned one for transport failures); `cause` is human-readable
/// context for logs and client messages.
#[derive(Debug, Clone)]
pub enum RelayError {
    /// Client disconnected or its deadline expired mid-call. Never retried,
    /// never penalizes a channel.
    ClientCancel { cause: String },

    /// Non-retryable client-side problem (400, 404, most other 4xx).
    ClientRequest { status: u16, cause: String },

    /// 429 from the upstream. Retried against a lower-priority channel.
    RateLimited { retry_after: Option<Duration>, cause: String },

    /// 413 from the upstream. Retried against a larger-context channel.
    PayloadTooLarge { cause: String },

    /// 401/403 or a vendor-indicated auth/quota/permission failure.
    AuthQuotaPermission { status: u16, cause: String },

    /// 5xx from the upstream. Retried; briefly suspends the ability.
    TransientServer { status: u16, cause: String },

    /// Connection-level failure with no HTTP status. Treated as transient-server
    /// for retry purposes.
    Transport { cause: String },

    /// Ledger or adaptor bug. Surfaced to the client as 500, never swallowed.
    Internal { cause: String },
}

impl fmt::Display for RelayError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RelayError::ClientCancel { cause } => write!(f, "client canceled: {cause}"),
            RelayError::ClientRequest { status, cause } => {
                write!(f, "client request error ({status}): {cause}")
            }
            RelayError::RateLimited { cause, .. } => write!(f, "rate limited: {cause}"),
            RelayError::PayloadTooLarge { cause } => write!(f, "payload too large: {cause}"),
            RelayError::AuthQuotaPermission { status, cause } => {
                write!(f, "auth/quota error ({status}): {cause}")
            }
            RelayError::TransientServer { status, cause } => {
                write!(f, "upstream error ({status}): {cause}")
            }
            RelayError::Transport { cause } => write!(f, "transport error: {cause}"),
            RelayError::Internal { cause } => write!(f, "internal error: {cause}"),
        }
    }
}

impl std::error::Error for RelayError {}

impl RelayError {
    /// The HTTP-style status code to reflect toward the client, where known.
    pub fn status(&self) -> u16 {
        match self {
            RelayError::ClientCancel { .. } => 408,
            RelayError::ClientRequest { status, .. } => *status,
            RelayError::RateLimited { .. } => 429,
            RelayError::PayloadTooLarge { .. } => 413,
            RelayError::AuthQuotaPermission { status, .. } => *status,
            RelayError::TransientServer { status, .. } => *status,
            RelayError::Transport { .. } => 500,
            RelayError::Internal { .. } => 500,
        }
    }

    /// True for the "client-cancel" taxonomy class (§7): context canceled,
    /// deadline exceeded, or HTTP 408.
    pub fn is_client_cancel(&self) -> bool {
        matches!(self, RelayError::ClientCancel { .. })
    }

    /// True for 429.
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, RelayError::RateLimited { .. })
    }

    /// True for 413.
    pub fn is_payload_too_large(&self) -> bool {
        matches!(self, RelayError::PayloadTooLarge { .. })
    }

    /// True for 401/403/vendor-auth.
    pub fn is_auth_like(&self) -> bool {
        matches!(self, RelayError::AuthQuotaPermission { .. })
    }

    /// True for 5xx and bare transport failures, which share retry treatment.
    pub fn is_transient_server(&self) -> bool {
        matches!(
            self,
            RelayError::TransientServer { .. } | RelayError::Transport { .. }
        )
    }

    /// True for non-retryable 4xx other than 401/403/413/429.
    pub fn is_non_retryable_client_request(&self) -> bool {
        matches!(self, RelayError::ClientRequest { .. })
    }

    /// Appends a request id to the display message, matching §6's envelope
    /// requirement that client-facing errors are "suffixed by the request id
    /// for correlation".
    pub fn with_request_id(&self, request_id: &str) -> String {
        format!("{self} (request id: {request_id})")
    }
}
