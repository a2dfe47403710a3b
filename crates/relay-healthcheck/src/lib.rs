//! Scheduled channel health probing (§4.10).
//!
//! `relay-healthcheck` drives `relay-ability`'s channel table from the
//! outside: it periodically probes every enabled channel through its
//! adaptor, folds the result into a response-time EMA, and auto-disables
//! channels that go slow or unhealthy when `AutomaticDisableChannelEnabled`
//! is set. Only one bulk test runs at a time per [`HealthProber`].

mod error;
mod events;
mod prober;
mod probe;

pub use error::BulkTestInProgress;
pub use events::HealthEvent;
pub use prober::HealthProber;
pub use probe::{ChannelProbe, ProbeOutcome};
