//! Ability index and channel selector for the relay gateway.
//!
//! [`AbilityIndex`] answers "give me a viable channel for (group, model),
//! excluding a set, optionally biased by a priority-class hint" against a
//! process-local cache that a database-backed loader refreshes. It is the
//! only place suspension TTLs and channel enable/disable state live.
//!
//! [`ChannelSelector`] is a thin, stateless layer on top that turns the
//! retry loop's last-observed failure class into the bias `find_candidate`
//! expects.
//!
//! ## Example
//!
//! ```rust
//! use relay_ability::{AbilityIndex, Channel, Ability, SelectionOptions};
//!
//! let index = AbilityIndex::new();
//! index.load(
//!     vec![Channel::new(1, "openai", "primary")],
//!     vec![Ability::new("default", "gpt-4o-mini", 1)],
//! );
//!
//! let channel = index
//!     .find_candidate("default", "gpt-4o-mini", &[], SelectionOptions::default())
//!     .unwrap();
//! assert_eq!(channel.id, 1);
//! ```

mod error;
mod events;
mod index;
mod selector;
mod types;

pub use error::AbilityError;
pub use events::AbilityEvent;
pub use index::AbilityIndex;
pub use selector::{ChannelSelector, PriorFailureClass};
pub use types::{Ability, Channel, ChannelStatus, SelectionOptions};
