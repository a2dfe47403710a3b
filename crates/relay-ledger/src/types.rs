//! Token and user ledger rows (§3).

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenStatus {
    Enabled,
    Disabled,
    Expired,
    Exhausted,
}

/// An API key owned by a user.
#[derive(Debug, Clone)]
pub struct Token {
    pub id: u64,
    pub user_id: u64,
    pub status: TokenStatus,
    /// Signed: allows temporary negative during settlement (§3).
    pub remaining_quota: i64,
    pub unlimited: bool,
    /// `-1` means never.
    pub expiry: i64,
    pub model_allowlist: Option<Vec<String>>,
}

impl Token {
    pub fn new(id: u64, user_id: u64, remaining_quota: i64) -> Self {
        Self {
            id,
            user_id,
            status: TokenStatus::Enabled,
            remaining_quota,
            unlimited: false,
            expiry: -1,
            model_allowlist: None,
        }
    }
}

/// A gateway user.
#[derive(Debug, Clone)]
pub struct User {
    pub id: u64,
    pub group: String,
    /// Signed remaining quota.
    pub quota: i64,
    /// Monotonic lifetime consumption.
    pub used_quota: i64,
}

impl User {
    pub fn new(id: u64, group: impl Into<String>, quota: i64) -> Self {
        Self {
            id,
            group: group.into(),
            quota,
            used_quota: 0,
        }
    }
}
