//! `classifyAuthLike` and the trigger classification feeding
//! [`crate::policy::SuspensionPolicy`] (§4.7).

/// The handful of upstream-reported fields the classification rule reads.
/// Adaptors populate whichever of these a provider actually returns.
#[derive(Debug, Clone, Default)]
pub struct UpstreamSignal<'a> {
    pub status: u16,
    pub error_type: Option<&'a str>,
    pub error_code: Option<&'a str>,
    pub message: Option<&'a str>,
}

const AUTH_ERROR_TYPES: &[&str] = &[
    "authentication_error",
    "permission_error",
    "insufficient_quota",
    "forbidden",
];

const AUTH_ERROR_CODES: &[&str] = &["invalid_api_key", "account_deactivated", "insufficient_quota"];

const AUTH_MESSAGE_PHRASES: &[&str] = &[
    "invalid api key",
    "api key not valid",
    "api key expired",
    "insufficient quota",
    "insufficient credit",
    "organization-restricted",
    "balance-depleted",
];

/// True if the signal indicates an auth/quota/permission failure (§4.7).
pub fn classify_auth_like(signal: &UpstreamSignal) -> bool {
    if matches!(signal.status, 401 | 403) {
        return true;
    }

    if let Some(t) = signal.error_type {
        if AUTH_ERROR_TYPES.contains(&t) {
            return true;
        }
    }

    if let Some(c) = signal.error_code {
        if AUTH_ERROR_CODES.contains(&c) {
            return true;
        }
    }

    if let Some(message) = signal.message {
        let lower = message.to_lowercase();
        if AUTH_MESSAGE_PHRASES.iter().any(|phrase| lower.contains(phrase)) {
            return true;
        }
    }

    false
}
