//! Maps a raw dispatch failure onto [`RelayError`]'s taxonomy (§7).

use relay_adaptor::AdaptorError;
use relay_core::RelayError;

/// Classifies an [`AdaptorError`] into the taxonomy the retry loop and
/// suspension policy reason about. `is_cancellation` takes precedence over
/// `status`: a client disconnect reported alongside any status code is still
/// a cancellation (§7, §8 client-cancel non-penalty property).
pub fn classify_adaptor_error(err: AdaptorError) -> RelayError {
    if err.is_cancellation {
        return RelayError::ClientCancel { cause: err.cause };
    }

    match err.status {
        401 | 403 => RelayError::AuthQuotaPermission {
            status: err.status,
            cause: err.cause,
        },
        408 => RelayError::ClientCancel { cause: err.cause },
        413 => RelayError::PayloadTooLarge { cause: err.cause },
        429 => RelayError::RateLimited {
            retry_after: None,
            cause: err.cause,
        },
        0 => RelayError::Transport { cause: err.cause },
        500..=599 => RelayError::TransientServer {
            status: err.status,
            cause: err.cause,
        },
        status if (400..500).contains(&status) => RelayError::ClientRequest {
            status,
            cause: err.cause,
        },
        status => RelayError::Internal {
            cause: format!("unexpected upstream status {status}: {}", err.cause),
        },
    }
}

/// Classifies an upstream success response that still carries an
/// error-shaped HTTP status (the adaptor surfaced it without throwing).
pub fn classify_status(status: u16, cause: impl Into<String>) -> RelayError {
    classify_adaptor_error(AdaptorError::new(status, cause))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cancellation_wins_regardless_of_status() {
        let mut err = AdaptorError::new(500, "client gone");
        err.is_cancellation = true;
        assert!(matches!(classify_adaptor_error(err), RelayError::ClientCancel { .. }));
    }

    #[test]
    fn transport_error_has_status_zero() {
        let err = classify_adaptor_error(AdaptorError::transport("connection reset"));
        assert!(matches!(err, RelayError::Transport { .. }));
    }

    #[test]
    fn four_hundred_is_non_retryable_client_request() {
        let err = classify_status(400, "bad request");
        assert!(err.is_non_retryable_client_request());
    }

    #[test]
    fn four_two_nine_is_rate_limited() {
        let err = classify_status(429, "slow down");
        assert!(err.is_rate_limited());
    }
}
