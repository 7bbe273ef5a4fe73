//! World ownership and the host seam.
//!
//! The world owns every segment and indexes external containers; neighbors
//! are always resolved by [`GlobalPos`] lookup at the moment of use, never
//! held as references. Realm loading and chunk retention belong to the host
//! runtime and are consumed through the [`WorldHost`] trait.
//!
//! `step()` visits segments in key order (realm, then position), which makes
//! a whole tick deterministic for a given world state. A transfer committed
//! into a segment during the tick is visible from the next read of that
//! segment; no code may assume whether the target's own update ran before
//! or after the delivery.

use crate::cargo::{CargoKind, Payload};
use crate::direction::{DirSet, Direction};
use crate::error::TransferError;
use crate::fixed::Ticks;
use crate::id::ContainerId;
use crate::motion::{self, MotionReport};
use crate::pos::GlobalPos;
use crate::segment::PipeSegment;
use slotmap::SlotMap;
use std::collections::BTreeMap;

// ---------------------------------------------------------------------------
// Container contract (consumed)
// ---------------------------------------------------------------------------

/// The two-phase transfer contract exposed by neighboring containers.
///
/// The core never force-transfers more than the simulated accepted amount,
/// and never extracts more than the simulated payload.
pub trait Container: std::fmt::Debug {
    /// How many units of `payload` this container would accept right now.
    fn simulate_accept(&self, payload: &Payload) -> u32;

    /// Take ownership of `payload`. Callers pass at most the amount the
    /// preceding simulate call granted.
    fn commit_accept(&mut self, payload: Payload);

    /// What this container would yield for an extraction of up to `max`
    /// units of `kind`. `None` when it has nothing of that kind.
    fn simulate_extract(&self, kind: CargoKind, max: u32) -> Option<Payload>;

    /// Remove a previously simulated payload from the container.
    fn commit_extract(&mut self, payload: &Payload);

    /// Downcast access to the concrete container type.
    fn as_any(&self) -> &dyn std::any::Any;
}

// ---------------------------------------------------------------------------
// Host contract (consumed)
// ---------------------------------------------------------------------------

/// The world-runtime collaborator: realm instantiation and chunk retention.
///
/// `ensure_addressable` may block synchronously while the host loads the
/// destination, but only ever for the one given address. The keep-loaded
/// pair is idempotent and persisted by the host across restarts.
pub trait WorldHost: std::fmt::Debug {
    fn ensure_addressable(&mut self, at: GlobalPos) -> Result<(), TransferError>;
    fn request_keep_loaded(&mut self, at: GlobalPos);
    fn release_keep_loaded(&mut self, at: GlobalPos);

    /// Downcast access for host implementations that expose test state.
    fn as_any(&self) -> &dyn std::any::Any;
    fn as_any_mut(&mut self) -> &mut dyn std::any::Any;
}

// ---------------------------------------------------------------------------
// World
// ---------------------------------------------------------------------------

/// Owns the segment graph and the container arena for one session.
#[derive(Debug)]
pub struct World {
    /// Current tick counter.
    pub tick: Ticks,
    segments: BTreeMap<GlobalPos, PipeSegment>,
    containers: SlotMap<ContainerId, Box<dyn Container>>,
    container_index: BTreeMap<GlobalPos, ContainerId>,
    host: Box<dyn WorldHost>,
}

impl World {
    pub fn new(host: Box<dyn WorldHost>) -> Self {
        World {
            tick: 0,
            segments: BTreeMap::new(),
            containers: SlotMap::with_key(),
            container_index: BTreeMap::new(),
            host,
        }
    }

    // -----------------------------------------------------------------------
    // Topology
    // -----------------------------------------------------------------------

    /// Place a segment and reconfigure roles for it and its neighbors.
    pub fn insert_segment(&mut self, segment: PipeSegment) {
        let at = segment.at;
        self.segments.insert(at, segment);
        self.refresh_topology(at);
        log::trace!("segment placed at {at:?}");
    }

    /// Remove a segment, reconfiguring the neighbors it leaves behind.
    /// Channel/pump deregistration is the caller's contract (see
    /// warpduct-channel's remove path).
    pub fn remove_segment(&mut self, at: GlobalPos) -> Option<PipeSegment> {
        let removed = self.segments.remove(&at);
        if removed.is_some() {
            self.refresh_topology(at);
            log::trace!("segment removed at {at:?}");
        }
        removed
    }

    /// Register an external container and refresh adjacent segments.
    pub fn insert_container(&mut self, at: GlobalPos, container: Box<dyn Container>) -> ContainerId {
        let id = self.containers.insert(container);
        if let Some(old) = self.container_index.insert(at, id) {
            self.containers.remove(old);
        }
        self.refresh_topology(at);
        id
    }

    /// Remove the container at `at`, if any, and refresh adjacent segments.
    pub fn remove_container(&mut self, at: GlobalPos) -> Option<Box<dyn Container>> {
        let id = self.container_index.remove(&at)?;
        let removed = self.containers.remove(id);
        self.refresh_topology(at);
        removed
    }

    /// Sides of `at` with a live neighbor segment or container.
    pub fn connectable(&self, at: GlobalPos) -> DirSet {
        let mut set = DirSet::EMPTY;
        for dir in Direction::ALL {
            let n = at.step(dir);
            if self.segments.contains_key(&n) || self.container_index.contains_key(&n) {
                set.insert(dir);
            }
        }
        set
    }

    /// Recompute connections and roles for the cell at `at` and all six of
    /// its neighbors. Reconfiguration is idempotent, so overlapping
    /// notifications are harmless.
    pub fn refresh_topology(&mut self, at: GlobalPos) {
        let mut cells = [at; 7];
        for (i, dir) in Direction::ALL.into_iter().enumerate() {
            cells[i + 1] = at.step(dir);
        }
        for cell in cells {
            let connectable = self.connectable(cell);
            if let Some(segment) = self.segments.get_mut(&cell) {
                segment.connections = connectable;
                segment.ports.reconfigure(connectable);
            }
        }
    }

    /// Manually cycle one side of a segment and reapply auto roles around
    /// the pinned side. Returns false if no segment is there.
    pub fn cycle_side(&mut self, at: GlobalPos, dir: Direction) -> bool {
        let connectable = self.connectable(at);
        let Some(segment) = self.segments.get_mut(&at) else {
            return false;
        };
        segment.ports.cycle_mode(dir);
        segment.connections = connectable;
        segment.ports.reconfigure(connectable);
        true
    }

    // -----------------------------------------------------------------------
    // Access
    // -----------------------------------------------------------------------

    pub fn segment(&self, at: GlobalPos) -> Option<&PipeSegment> {
        self.segments.get(&at)
    }

    pub fn segment_mut(&mut self, at: GlobalPos) -> Option<&mut PipeSegment> {
        self.segments.get_mut(&at)
    }

    /// Detach a segment for an update pass that needs the rest of the world
    /// mutable. Pair with [`World::put_segment`].
    pub fn take_segment(&mut self, at: GlobalPos) -> Option<PipeSegment> {
        self.segments.remove(&at)
    }

    /// Reattach a segment detached with [`World::take_segment`].
    pub fn put_segment(&mut self, segment: PipeSegment) {
        self.segments.insert(segment.at, segment);
    }

    pub fn container_at(&self, at: GlobalPos) -> Option<&dyn Container> {
        let id = self.container_index.get(&at)?;
        self.containers.get(*id).map(|c| c.as_ref())
    }

    pub fn container_at_mut(&mut self, at: GlobalPos) -> Option<&mut (dyn Container + 'static)> {
        let id = self.container_index.get(&at)?;
        self.containers.get_mut(*id).map(|c| c.as_mut())
    }

    pub fn segments(&self) -> impl Iterator<Item = &PipeSegment> {
        self.segments.values()
    }

    pub fn segment_count(&self) -> usize {
        self.segments.len()
    }

    pub fn host(&self) -> &dyn WorldHost {
        self.host.as_ref()
    }

    pub fn host_mut(&mut self) -> &mut dyn WorldHost {
        self.host.as_mut()
    }

    // -----------------------------------------------------------------------
    // Tick
    // -----------------------------------------------------------------------

    /// Advance every segment's cargo by one tick, in deterministic key
    /// order. Long-range sends and extraction pulls are a separate phase
    /// driven by the channel system.
    pub fn step(&mut self) -> MotionReport {
        self.tick += 1;
        let mut report = MotionReport::default();
        let keys: Vec<GlobalPos> = self.segments.keys().copied().collect();
        for at in keys {
            // A segment may have been consumed by an earlier update.
            let Some(mut segment) = self.segments.remove(&at) else {
                continue;
            };
            report.merge(motion::update_segment(self, &mut segment));
            self.segments.insert(at, segment);
        }
        report
    }
}

// ===========================================================================
// Tests
// ===========================================================================
