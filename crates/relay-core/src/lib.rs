//! Core infrastructure shared by every relay crate.
//!
//! This crate provides the pieces that have no business living in any one
//! relay component:
//! - [`RelayError`], the failure taxonomy the retry loop and suspension
//!   policy classify against
//! - [`RequestId`], threaded from the HTTP layer through to the billing log
//! - [`GatewayConfig`], the process-wide options table from §6
//! - the [`events`] system each component uses to publish observability events

pub mod config;
pub mod error;
pub mod events;
pub mod request_id;

pub use config::GatewayConfig;
pub use error::RelayError;
pub use events::{EventListener, EventListeners, FnListener, RelayEvent};
pub use request_id::RequestId;
