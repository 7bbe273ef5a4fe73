//! Cargo units and payloads.
//!
//! A [`CargoUnit`] is the in-transit quantity moving through a segment. It is
//! owned exclusively by the segment currently holding it; transfers move the
//! unit into the next segment (or consume it into an external container).
//!
//! Payloads use **enum dispatch** rather than trait objects: the three cargo
//! kinds are a closed set and the motion loop branches on them constantly.

use crate::direction::Direction;
use crate::fixed::{Fixed64, CENTER};
use crate::id::{FluidTypeId, ItemTypeId};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// CargoKind
// ---------------------------------------------------------------------------

/// The three cargo kinds. Each kind has its own frequency space in the
/// registry; an endpoint serves exactly one kind.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum CargoKind {
    Item,
    Fluid,
    Gas,
}

impl CargoKind {
    /// All kinds, in registry order.
    pub const ALL: [CargoKind; 3] = [CargoKind::Item, CargoKind::Fluid, CargoKind::Gas];

    /// Index into kind-ordered arrays.
    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }
}

// ---------------------------------------------------------------------------
// Payload
// ---------------------------------------------------------------------------

/// What a cargo unit carries. All quantities are u32 transfer units
/// (pieces for stacks, volume units for fluids and gases).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Payload {
    /// A discrete item stack.
    Stack { item: ItemTypeId, count: u32 },
    /// A fluid volume.
    Fluid { fluid: FluidTypeId, amount: u32 },
    /// A gas volume.
    Gas { gas: FluidTypeId, amount: u32 },
}

impl Payload {
    pub fn kind(&self) -> CargoKind {
        match self {
            Payload::Stack { .. } => CargoKind::Item,
            Payload::Fluid { .. } => CargoKind::Fluid,
            Payload::Gas { .. } => CargoKind::Gas,
        }
    }

    /// Quantity carried, in transfer units.
    pub fn amount(&self) -> u32 {
        match self {
            Payload::Stack { count, .. } => *count,
            Payload::Fluid { amount, .. } => *amount,
            Payload::Gas { amount, .. } => *amount,
        }
    }

    /// Whether two payloads carry the same substance and could merge.
    pub fn same_substance(&self, other: &Payload) -> bool {
        match (self, other) {
            (Payload::Stack { item: a, .. }, Payload::Stack { item: b, .. }) => a == b,
            (Payload::Fluid { fluid: a, .. }, Payload::Fluid { fluid: b, .. }) => a == b,
            (Payload::Gas { gas: a, .. }, Payload::Gas { gas: b, .. }) => a == b,
            _ => false,
        }
    }

    /// Take up to `take` units out of this payload, returning the part taken.
    /// The remainder stays in `self`; a full take leaves `self` at zero.
    #[must_use = "the split-off part is the payload being transferred"]
    pub fn split(&mut self, take: u32) -> Payload {
        match self {
            Payload::Stack { item, count } => {
                let taken = take.min(*count);
                *count -= taken;
                Payload::Stack { item: *item, count: taken }
            }
            Payload::Fluid { fluid, amount } => {
                let taken = take.min(*amount);
                *amount -= taken;
                Payload::Fluid { fluid: *fluid, amount: taken }
            }
            Payload::Gas { gas, amount } => {
                let taken = take.min(*amount);
                *amount -= taken;
                Payload::Gas { gas: *gas, amount: taken }
            }
        }
    }

    /// Add `amount` units back (merge of a compatible payload).
    pub fn absorb(&mut self, units: u32) {
        match self {
            Payload::Stack { count, .. } => *count += units,
            Payload::Fluid { amount, .. } => *amount += units,
            Payload::Gas { amount, .. } => *amount += units,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.amount() == 0
    }
}

// ---------------------------------------------------------------------------
// CargoUnit
// ---------------------------------------------------------------------------

/// The in-transit unit moving through a segment.
///
/// Motion states, all encoded in `progress`, `direction`, and `routed`:
/// - moving in: progress in [0, ½), direction = inverse of `source`,
///   `routed` false;
/// - at center: progress = ½, direction `None` (routing decision point);
/// - moving out: direction = the chosen output, `routed` true; the leg runs
///   to 1 where the real transfer is attempted;
/// - bounced: progress = 0, direction `None`, `source` = the side that
///   rejected the transfer (a decision point at the segment edge; the
///   rerouted leg then crosses the whole segment without stopping).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CargoUnit {
    pub payload: Payload,
    /// Position along the current path through the segment, 0 to 1.
    pub progress: Fixed64,
    /// Travel direction; `None` while awaiting a routing decision.
    pub direction: Option<Direction>,
    /// The side this unit entered from; `None` if injected at center.
    pub source: Option<Direction>,
    /// Whether `direction` came from a routing decision. An unrouted unit
    /// stops at the center for one; a routed unit runs to the far end.
    pub routed: bool,
    /// Set on arrival via a cross-realm jump; cleared when the unit crosses
    /// into another segment. A teleported unit is never re-sent by the
    /// endpoint that received it.
    pub teleported: bool,
}

impl CargoUnit {
    /// A unit entering the segment through side `from`.
    pub fn entering(payload: Payload, from: Direction) -> Self {
        CargoUnit {
            payload,
            progress: Fixed64::ZERO,
            direction: Some(from.opposite()),
            source: Some(from),
            routed: false,
            teleported: false,
        }
    }

    /// A unit injected directly at the center (extraction output, teleport
    /// arrival, or seeded stock).
    pub fn at_center(payload: Payload) -> Self {
        CargoUnit {
            payload,
            progress: CENTER,
            direction: None,
            source: None,
            routed: false,
            teleported: false,
        }
    }

    /// Whether this unit is awaiting a routing decision.
    pub fn is_undecided(&self) -> bool {
        self.direction.is_none()
    }
}

// ===========================================================================
// Tests
// ===========================================================================
