//! Keyed single-flight deduplication used to guard expensive read-through
//! populations (§5, §9) such as anonymous model listing, so that a burst of
//! concurrent identical requests triggers exactly one backing execution.

mod coalescer;
mod error;

pub use coalescer::Coalescer;
pub use error::CoalesceError;
