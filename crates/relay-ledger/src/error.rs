use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LedgerError {
    #[error("unknown token {0}")]
    UnknownToken(u64),

    #[error("unknown user {0}")]
    UnknownUser(u64),

    #[error("token {token} has insufficient quota for amount {amount}")]
    InsufficientQuota { token: u64, amount: i64 },

    #[error("quota amount overflows the ledger's integer domain")]
    Overflow,
}
