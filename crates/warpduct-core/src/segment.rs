//! Pipe segments: the nodes of the transport graph.
//!
//! A segment is plain data plus two optional capability configs attached at
//! construction -- a channel endpoint config (long-range send/receive over a
//! frequency) and an extraction config (active pulling from adjacent
//! containers). There is no type hierarchy of segment variants; capabilities
//! compose freely on the one segment type.

use crate::cargo::{CargoKind, CargoUnit, Payload};
use crate::direction::{DirMap, DirSet, Direction};
use crate::policy::{PortConfig, PortRole};
use crate::pos::GlobalPos;
use crate::tier::Tier;
use serde::{Deserialize, Serialize};

/// Default number of cargo units a segment can hold at once.
pub const DEFAULT_UNIT_CAPACITY: usize = 8;

/// Default volume headroom per volume kind, in transfer units.
pub const DEFAULT_VOLUME_CAPACITY: u32 = 1000;

// ---------------------------------------------------------------------------
// Capability configs
// ---------------------------------------------------------------------------

/// Marks a segment as a long-range endpoint on an integer frequency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelConfig {
    /// The one cargo kind this endpoint serves.
    pub kind: CargoKind,
    pub frequency: i32,
    pub can_send: bool,
    pub can_receive: bool,
}

/// Marks a segment as an extraction endpoint that actively pulls cargo from
/// adjacent non-pipe containers when pumping is enabled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionConfig {
    /// The cargo kind this endpoint extracts.
    pub kind: CargoKind,
    /// Frequency consulted in the pump registry for remote activation.
    pub frequency: i32,
    /// Pull every tick regardless of the pump registry.
    pub always_on: bool,
}

// ---------------------------------------------------------------------------
// PipeSegment
// ---------------------------------------------------------------------------

/// One graph node: position, speed tier, connectivity, role table, and the
/// cargo currently inside it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipeSegment {
    pub at: GlobalPos,
    pub tier: Tier,
    /// Sides with a live neighbor segment or a compatible container.
    /// Maintained by the world on every topology change.
    pub connections: DirSet,
    pub ports: PortConfig,
    /// Round-robin cursor over output candidates at the decision point.
    pub route_cursor: usize,
    /// Round-robin cursor over channel receivers for long-range sends.
    pub warp_cursor: usize,
    pub cargo: Vec<CargoUnit>,
    pub unit_capacity: usize,
    /// Volume headroom per volume kind, in transfer units.
    pub volume_capacity: u32,
    pub channel: Option<ChannelConfig>,
    pub extraction: Option<ExtractionConfig>,
}

impl PipeSegment {
    pub fn new(at: GlobalPos, tier: Tier) -> Self {
        PipeSegment {
            at,
            tier,
            connections: DirSet::EMPTY,
            ports: PortConfig::new(),
            route_cursor: 0,
            warp_cursor: 0,
            cargo: Vec::new(),
            unit_capacity: DEFAULT_UNIT_CAPACITY,
            volume_capacity: DEFAULT_VOLUME_CAPACITY,
            channel: None,
            extraction: None,
        }
    }

    pub fn with_channel(mut self, channel: ChannelConfig) -> Self {
        self.channel = Some(channel);
        self
    }

    pub fn with_extraction(mut self, extraction: ExtractionConfig) -> Self {
        self.extraction = Some(extraction);
        self
    }

    pub fn with_volume_capacity(mut self, capacity: u32) -> Self {
        self.volume_capacity = capacity;
        self
    }

    // -----------------------------------------------------------------------
    // Contents
    // -----------------------------------------------------------------------

    /// Total volume of `kind` currently held, in transfer units.
    /// Always zero for [`CargoKind::Item`]; item capacity is slot-based.
    pub fn stored_volume(&self, kind: CargoKind) -> u32 {
        if kind == CargoKind::Item {
            return 0;
        }
        self.cargo
            .iter()
            .filter(|u| u.payload.kind() == kind)
            .map(|u| u.payload.amount())
            .sum()
    }

    /// Total quantity of all payloads of `kind`, in transfer units.
    pub fn stored_amount(&self, kind: CargoKind) -> u32 {
        self.cargo
            .iter()
            .filter(|u| u.payload.kind() == kind)
            .map(|u| u.payload.amount())
            .sum()
    }

    fn mergeable_index(&self, payload: &Payload) -> Option<usize> {
        self.cargo
            .iter()
            .position(|u| u.is_undecided() && u.payload.same_substance(payload))
    }

    // -----------------------------------------------------------------------
    // Two-phase acceptance
    // -----------------------------------------------------------------------

    /// Phase one for arrivals injected at the center (teleport deliveries):
    /// how many units of `payload` this segment would accept. Merge-aware:
    /// a compatible undecided unit counts as room. Never over-promises;
    /// [`PipeSegment::commit_arrival`] with no more than the simulated
    /// amount cannot fail.
    pub fn simulate_accept(&self, payload: &Payload) -> u32 {
        let offered = payload.amount();
        if offered == 0 {
            return 0;
        }
        match payload.kind() {
            CargoKind::Item => {
                if self.cargo.len() < self.unit_capacity {
                    offered
                } else {
                    0
                }
            }
            kind => {
                let headroom = self.volume_capacity.saturating_sub(self.stored_volume(kind));
                if headroom == 0 {
                    return 0;
                }
                if self.mergeable_index(payload).is_none()
                    && self.cargo.len() >= self.unit_capacity
                {
                    return 0;
                }
                offered.min(headroom)
            }
        }
    }

    /// Phase two for center arrivals: take ownership of `payload`, merging
    /// volume cargo into a compatible undecided unit where possible, else
    /// injecting a fresh unit at the center.
    pub fn commit_arrival(&mut self, payload: Payload, teleported: bool) {
        debug_assert!(!payload.is_empty(), "committing an empty payload");
        if payload.kind() != CargoKind::Item {
            if let Some(idx) = self.mergeable_index(&payload) {
                let unit = &mut self.cargo[idx];
                unit.payload.absorb(payload.amount());
                unit.teleported |= teleported;
                return;
            }
        }
        let mut unit = CargoUnit::at_center(payload);
        unit.teleported = teleported;
        self.cargo.push(unit);
    }

    /// How many units of `payload` this segment would accept as a physical
    /// edge arrival (a unit entering through a side). Edge arrivals always
    /// occupy a fresh unit slot.
    pub fn edge_accept(&self, payload: &Payload) -> u32 {
        let offered = payload.amount();
        if offered == 0 || self.cargo.len() >= self.unit_capacity {
            return 0;
        }
        match payload.kind() {
            CargoKind::Item => offered,
            kind => offered.min(self.volume_capacity.saturating_sub(self.stored_volume(kind))),
        }
    }

    /// Quick presence probe used at routing decision points: would this
    /// segment take any part of `payload` arriving through `from`?
    /// Advisory only -- the real transfer re-checks.
    pub fn probe_accept(&self, payload: &Payload, from: Direction) -> bool {
        if self.ports.role(from) == PortRole::Disabled {
            return false;
        }
        self.edge_accept(payload) > 0
    }

    // -----------------------------------------------------------------------
    // Snapshot
    // -----------------------------------------------------------------------

    /// Serializable state snapshot for an external synchronization/UI layer.
    pub fn snapshot(&self) -> SegmentSnapshot {
        let mut roles = DirMap::filled(PortRole::Disabled);
        for dir in Direction::ALL {
            roles.set(dir, self.ports.role(dir));
        }
        SegmentSnapshot {
            roles,
            connections: self.connections,
            mode: self.mode(),
            frequency: self.channel.map(|c| c.frequency),
        }
    }

    /// What capabilities are attached.
    pub fn mode(&self) -> SegmentMode {
        match (self.channel.is_some(), self.extraction.is_some()) {
            (false, false) => SegmentMode::Transit,
            (true, false) => SegmentMode::Channel,
            (false, true) => SegmentMode::Extraction,
            (true, true) => SegmentMode::ChannelExtraction,
        }
    }
}

/// Capability summary reported in snapshots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SegmentMode {
    Transit,
    Channel,
    Extraction,
    ChannelExtraction,
}

/// On-demand state snapshot of one segment. The core defines the fields;
/// the wire encoding belongs to the consumer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentSnapshot {
    pub roles: DirMap<PortRole>,
    pub connections: DirSet,
    pub mode: SegmentMode,
    pub frequency: Option<i32>,
}

// ===========================================================================
// Tests
// ===========================================================================
