//! Realm-qualified positions.
//!
//! Segments never hold references to their neighbors. Everything is
//! addressed by [`GlobalPos`] and resolved through the [`crate::world::World`]
//! lookup at the moment of use, which keeps the graph free of ownership
//! cycles and makes cross-realm addressing uniform with local addressing.

use crate::direction::Direction;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// RealmId
// ---------------------------------------------------------------------------

/// An independently-addressed world partition. Cheap to copy and compare.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct RealmId(pub u32);

// ---------------------------------------------------------------------------
// CellPos
// ---------------------------------------------------------------------------

/// A 3D integer coordinate within one realm.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct CellPos {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

/// Field width of one packed coordinate. Coordinates outside
/// [-2^20, 2^20) do not round-trip through [`CellPos::pack`].
const PACK_BITS: u32 = 21;
const PACK_MASK: u64 = (1 << PACK_BITS) - 1;

impl CellPos {
    pub fn new(x: i32, y: i32, z: i32) -> Self {
        CellPos { x, y, z }
    }

    /// The neighboring cell one step along `dir`.
    pub fn step(self, dir: Direction) -> CellPos {
        let (dx, dy, dz) = dir.offset();
        CellPos::new(self.x + dx, self.y + dy, self.z + dz)
    }

    /// Pack into a u64 with three 21-bit two's-complement fields.
    /// Used by the persisted registry layout.
    pub fn pack(self) -> u64 {
        ((self.x as u64 & PACK_MASK) << (2 * PACK_BITS))
            | ((self.y as u64 & PACK_MASK) << PACK_BITS)
            | (self.z as u64 & PACK_MASK)
    }

    /// Inverse of [`CellPos::pack`].
    pub fn unpack(packed: u64) -> CellPos {
        CellPos::new(
            sign_extend((packed >> (2 * PACK_BITS)) & PACK_MASK),
            sign_extend((packed >> PACK_BITS) & PACK_MASK),
            sign_extend(packed & PACK_MASK),
        )
    }
}

fn sign_extend(field: u64) -> i32 {
    let shift = 64 - PACK_BITS;
    (((field << shift) as i64) >> shift) as i32
}

// ---------------------------------------------------------------------------
// GlobalPos
// ---------------------------------------------------------------------------

/// The world-unique address of a segment or container.
///
/// `Ord` so that world iteration visits segments in a deterministic order.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct GlobalPos {
    pub realm: RealmId,
    pub pos: CellPos,
}

impl GlobalPos {
    pub fn new(realm: RealmId, pos: CellPos) -> Self {
        GlobalPos { realm, pos }
    }

    /// The neighboring address one step along `dir`, in the same realm.
    pub fn step(self, dir: Direction) -> GlobalPos {
        GlobalPos::new(self.realm, self.pos.step(dir))
    }
}

// ===========================================================================
// Tests
// ===========================================================================
