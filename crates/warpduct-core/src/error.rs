//! Transfer error taxonomy.
//!
//! Every variant is a normal runtime condition, locally recovered by the
//! code that observes it (skip the candidate, retry next tick, or drop the
//! stale entry). None of them abort a tick. Internal-consistency violations
//! are not represented here; those are programmer faults and surface as
//! `debug_assert!` failures in the sim loop.

use crate::pos::RealmId;

/// Why a transfer attempt did not (fully) happen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum TransferError {
    /// The registry entry's target no longer matches; the scan removes it.
    #[error("stale registry entry")]
    StaleEntry,
    /// All outputs blocked or the receiver list is empty; cargo stalls.
    #[error("no viable route")]
    NoRoute,
    /// The two-phase simulate accepted less than offered.
    #[error("capacity rejected: accepted {accepted} of {offered}")]
    CapacityRejected { offered: u32, accepted: u32 },
    /// The destination realm failed to become addressable.
    #[error("realm {0:?} unavailable")]
    RealmUnavailable(RealmId),
}
