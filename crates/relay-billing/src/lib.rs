//! Two-phase external billing state machine: `pre`/`post`/`cancel`/`single`
//! and the auto-confirm sweep that bounds reservation lifetime (§4.5).

mod error;
mod events;
mod txn;
mod types;

pub use error::BillingError;
pub use events::BillingEvent;
pub use txn::ConsumeTxnManager;
pub use types::{ConsumeTransaction, TxnStatus};
