//! Coordination-free, approximately time-ordered 64-bit ID generation.
//!
//! A fleet of independent processes can mint globally unique IDs without a
//! central sequence authority: each process is assigned a fixed
//! [`NodeIdentity`] (a datacenter number and a worker number), and the
//! [`IdEngine`] packs a millisecond timestamp, that identity, and a
//! per-millisecond sequence counter into a single `u64`. Uniqueness across
//! the fleet follows from disjoint identity assignment; uniqueness within a
//! process follows from the engine's serialized sequence state.
//!
//! The engine is deliberately strict about clock safety: a backward clock
//! step is surfaced as [`Error::ClockRollback`] rather than waited out, and
//! exhausting the timestamp field is surfaced as
//! [`Error::TimestampOverflow`]. The only blocking the engine performs is a
//! bounded sub-millisecond wait when a single millisecond's sequence space
//! is used up.

mod clock;
mod engine;
mod error;
mod layout;
mod metrics;
mod node;
mod policy;

pub use crate::clock::*;
pub use crate::engine::*;
pub use crate::error::*;
pub use crate::layout::*;
pub use crate::metrics::*;
pub use crate::node::*;
pub use crate::policy::*;
