use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BillingError {
    #[error("unknown transaction {0}")]
    UnknownTransaction(String),

    #[error("transaction already {status:?}")]
    AlreadyTerminal { status: crate::types::TxnStatus },

    #[error("ledger error: {0}")]
    Ledger(String),

    #[error("amount overflows the ledger's integer domain")]
    Overflow,
}
