//! Warpduct Core -- the transport half of the frequency-addressed pipe engine.
//!
//! This crate owns the pipe graph: segments and their per-side roles, the
//! per-tick cargo motion state machine, extraction pulls, and the world/host
//! seams everything is resolved through. Long-range (cross-realm) delivery
//! over frequency channels lives in `warpduct-channel` on top of this crate.
//!
//! # Tick Shape
//!
//! One simulation tick is two phases, both on a single thread:
//!
//! 1. **Motion** -- [`world::World::step`] advances every cargo unit in
//!    deterministic segment order: inbound travel, the center routing
//!    decision (role filtering + round-robin), outbound travel, and the real
//!    transfer at the far end with bounce-back on rejection.
//! 2. **Channel** -- the channel system (separate crate) runs teleport sends
//!    and pump-gated extraction pulls against the same world.
//!
//! # Key Types
//!
//! - [`world::World`] -- owns segments and containers; resolves neighbors by
//!   position, never by reference.
//! - [`segment::PipeSegment`] -- one graph node plus optional capability
//!   configs (channel endpoint, extraction) attached at construction.
//! - [`policy::PortConfig`] -- idempotent per-side role assignment.
//! - [`cargo::CargoUnit`] -- progress-based motion state.
//! - [`tier::Tier`] -- pure-data speed table.
//! - [`world::Container`] / [`world::WorldHost`] -- the consumed two-phase
//!   transfer and keep-loaded/addressability contracts.

pub mod cargo;
pub mod direction;
pub mod error;
pub mod extract;
pub mod fixed;
pub mod id;
pub mod motion;
pub mod policy;
pub mod pos;
pub mod segment;
pub mod tier;
pub mod world;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
