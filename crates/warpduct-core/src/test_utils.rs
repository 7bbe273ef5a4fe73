//! Shared helpers for unit and integration tests.
//!
//! Enabled with the `test-utils` feature (and always in this crate's own
//! tests). Provides a host double, simple container doubles, and world
//! construction shorthands.

use crate::cargo::{CargoKind, Payload};
use crate::error::TransferError;
use crate::pos::{GlobalPos, RealmId};
use crate::segment::PipeSegment;
use crate::tier::Tier;
use crate::world::{Container, World, WorldHost};
use std::collections::BTreeSet;

// ---------------------------------------------------------------------------
// TestHost
// ---------------------------------------------------------------------------

/// A world-runtime double that records addressability and keep-loaded calls.
#[derive(Debug, Default)]
pub struct TestHost {
    /// Realms considered loaded. `ensure_addressable` loads on demand.
    pub loaded: BTreeSet<RealmId>,
    /// Realms that refuse to load.
    pub unavailable: BTreeSet<RealmId>,
    /// Positions with an active keep-loaded grant.
    pub keep_loaded: BTreeSet<GlobalPos>,
    /// Every address whose realm had to be force-loaded, in order.
    pub forced_loads: Vec<GlobalPos>,
}

impl WorldHost for TestHost {
    fn ensure_addressable(&mut self, at: GlobalPos) -> Result<(), TransferError> {
        if self.unavailable.contains(&at.realm) {
            return Err(TransferError::RealmUnavailable(at.realm));
        }
        if self.loaded.insert(at.realm) {
            self.forced_loads.push(at);
        }
        Ok(())
    }

    fn request_keep_loaded(&mut self, at: GlobalPos) {
        self.keep_loaded.insert(at);
    }

    fn release_keep_loaded(&mut self, at: GlobalPos) {
        self.keep_loaded.remove(&at);
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn std::any::Any {
        self
    }
}

// ---------------------------------------------------------------------------
// Container doubles
// ---------------------------------------------------------------------------

/// A capacity-limited buffer honoring the two-phase transfer contract.
/// Stands in for chests, tanks, and machine inventories.
#[derive(Debug, Default)]
pub struct BufferContainer {
    pub capacity: u32,
    pub contents: Vec<Payload>,
}

impl BufferContainer {
    pub fn new(capacity: u32) -> Self {
        BufferContainer { capacity, contents: Vec::new() }
    }

    /// Total stored units across all payloads.
    pub fn total(&self) -> u32 {
        self.contents.iter().map(|p| p.amount()).sum()
    }

    /// Stored units of one cargo kind.
    pub fn amount_of(&self, kind: CargoKind) -> u32 {
        self.contents
            .iter()
            .filter(|p| p.kind() == kind)
            .map(|p| p.amount())
            .sum()
    }
}

impl Container for BufferContainer {
    fn simulate_accept(&self, payload: &Payload) -> u32 {
        payload.amount().min(self.capacity.saturating_sub(self.total()))
    }

    fn commit_accept(&mut self, payload: Payload) {
        if let Some(existing) = self
            .contents
            .iter_mut()
            .find(|p| p.same_substance(&payload))
        {
            existing.absorb(payload.amount());
        } else {
            self.contents.push(payload);
        }
    }

    fn simulate_extract(&self, kind: CargoKind, max: u32) -> Option<Payload> {
        let stored = self
            .contents
            .iter()
            .find(|p| p.kind() == kind && !p.is_empty())?;
        let mut clone = stored.clone();
        Some(clone.split(max))
    }

    fn commit_extract(&mut self, payload: &Payload) {
        if let Some(existing) = self
            .contents
            .iter_mut()
            .find(|p| p.same_substance(payload))
        {
            let _ = existing.split(payload.amount());
        }
        self.contents.retain(|p| !p.is_empty());
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}

/// A container that refuses everything. Used to exercise bounce paths.
#[derive(Debug)]
pub struct RejectingContainer;

impl Container for RejectingContainer {
    fn simulate_accept(&self, _payload: &Payload) -> u32 {
        0
    }

    fn commit_accept(&mut self, _payload: Payload) {
        unreachable!("RejectingContainer never accepts");
    }

    fn simulate_extract(&self, _kind: CargoKind, _max: u32) -> Option<Payload> {
        None
    }

    fn commit_extract(&mut self, _payload: &Payload) {
        unreachable!("RejectingContainer never yields");
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}

// ---------------------------------------------------------------------------
// World shorthands
// ---------------------------------------------------------------------------

/// A fresh world backed by a [`TestHost`].
pub fn world() -> World {
    World::new(Box::new(TestHost::default()))
}

/// A plain Basic-tier segment at `at`.
pub fn pipe(at: GlobalPos) -> PipeSegment {
    PipeSegment::new(at, Tier::Basic)
}

/// A plain segment at `at` with an explicit tier.
pub fn pipe_with_tier(at: GlobalPos, tier: Tier) -> PipeSegment {
    PipeSegment::new(at, tier)
}

/// Borrow the world's host as a [`TestHost`].
pub fn test_host(world: &World) -> &TestHost {
    world
        .host()
        .as_any()
        .downcast_ref::<TestHost>()
        .expect("world host is a TestHost")
}

/// Mutably borrow the world's host as a [`TestHost`].
pub fn test_host_mut(world: &mut World) -> &mut TestHost {
    world
        .host_mut()
        .as_any_mut()
        .downcast_mut::<TestHost>()
        .expect("world host is a TestHost")
}

/// Borrow the container at `at` as a [`BufferContainer`].
pub fn buffer_at(world: &World, at: GlobalPos) -> &BufferContainer {
    world
        .container_at(at)
        .and_then(|c| c.as_any().downcast_ref::<BufferContainer>())
        .expect("a BufferContainer at the given position")
}
