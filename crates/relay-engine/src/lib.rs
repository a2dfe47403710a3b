//! Top-level per-client-request orchestrator (§4.6).
//!
//! `RelayEngine` is the one piece of this workspace that calls every other
//! crate: it selects a channel via `relay-ability`, reserves and settles
//! quota via `relay-ledger`, dispatches through a `relay-adaptor`, and
//! enqueues `relay-suspension` decisions as asynchronous-but-durable side
//! effects. Its retry loop is the direct descendant of the teacher's
//! `Retry<S, Req, E>` `tower::Service`: the same single-owned-error,
//! early-return-on-each-disqualifying-condition shape, generalized from a
//! generic `tower::Service` wrapper to this crate's own concrete request
//! type.

mod budget;
mod classify;
mod engine;
mod events;
mod queue;
mod types;

pub use budget::RetryBudget;
pub use engine::RelayEngine;
pub use events::RelayEngineEvent;
pub use queue::CriticalTaskQueue;
pub use types::RelayRequest;
