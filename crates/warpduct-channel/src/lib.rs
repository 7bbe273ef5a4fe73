//! Frequency channels for the Warpduct engine.
//!
//! Long-range transfer: endpoints registered on integer frequencies can
//! exchange cargo across disconnected graph components ("realms") without
//! physical adjacency. This crate owns the two session registries and wires
//! them into a `warpduct-core` world:
//!
//! - [`FrequencyRegistry`] -- per-kind frequency buckets of endpoints, with
//!   a remove-before-insert uniqueness invariant and lazy self-healing;
//! - [`PumpRegistry`] -- remote activation flags for extraction endpoints;
//! - [`teleport`] -- the round-robin receiver scan and two-phase delivery;
//! - [`persist`] -- the headered binary image both registries round-trip
//!   through.
//!
//! # Usage
//!
//! The [`ChannelSystem`] is owned by the game session next to the
//! [`World`]; game code steps the world, then ticks the channels:
//!
//! ```rust,ignore
//! world.step();
//! channels.tick(&mut world);
//! ```
//!
//! Segments gain channel behavior by being attached after placement and
//! detached on removal; both operations are idempotent.

pub mod persist;
pub mod pump;
pub mod registry;
pub mod teleport;

pub use pump::PumpRegistry;
pub use registry::{Endpoint, FrequencyRegistry};

use warpduct_core::cargo::CargoKind;
use warpduct_core::extract;
use warpduct_core::pos::GlobalPos;
use warpduct_core::segment::PipeSegment;
use warpduct_core::world::World;

// ---------------------------------------------------------------------------
// ChannelSystem
// ---------------------------------------------------------------------------

/// Session-level owner of the frequency and pump registries.
///
/// Explicitly owned and passed by reference -- never a global -- so several
/// sessions (or tests) can coexist in one process.
#[derive(Debug, Default)]
pub struct ChannelSystem {
    pub registry: FrequencyRegistry,
    pub pumps: PumpRegistry,
}

/// What one channel tick did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChannelReport {
    /// Successful long-range deliveries (at most one per sender).
    pub deliveries: u32,
    /// Units moved by those deliveries.
    pub teleported_units: u32,
    /// Successful extraction pulls.
    pub pulls: u32,
}

impl ChannelSystem {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a system from loaded registries (see [`persist`]).
    pub fn from_parts(registry: FrequencyRegistry, pumps: PumpRegistry) -> Self {
        ChannelSystem { registry, pumps }
    }

    // -----------------------------------------------------------------------
    // Endpoint lifecycle
    // -----------------------------------------------------------------------

    /// Register the segment at `at` with the registries its capabilities
    /// call for, and take the keep-loaded grant a channel endpoint needs to
    /// stay addressable. Call after placing or loading the segment.
    /// Idempotent.
    pub fn attach(&mut self, world: &mut World, at: GlobalPos) {
        let Some(segment) = world.segment(at) else {
            return;
        };
        let channel = segment.channel;
        let extraction = segment.extraction;
        if let Some(cfg) = channel {
            self.registry.register(
                cfg.kind,
                cfg.frequency,
                at.realm,
                at.pos,
                cfg.can_send,
                cfg.can_receive,
            );
            world.host_mut().request_keep_loaded(at);
        }
        if let Some(cfg) = extraction {
            self.pumps.register_endpoint(cfg.frequency, at);
        }
    }

    /// Deregister `at` from every registry and release its keep-loaded
    /// grant. Safe to call whether or not the segment still exists.
    pub fn detach(&mut self, world: &mut World, at: GlobalPos) {
        for kind in CargoKind::ALL {
            self.registry.remove(kind, at.realm, at.pos);
        }
        self.pumps.unregister_everywhere(at);
        world.host_mut().release_keep_loaded(at);
    }

    /// Tear down a segment: deregistration plus world removal.
    pub fn remove_segment(&mut self, world: &mut World, at: GlobalPos) -> Option<PipeSegment> {
        self.detach(world, at);
        world.remove_segment(at)
    }

    /// Retune a channel endpoint. Re-registers under the new frequency,
    /// which removes the old entry first (registry uniqueness).
    pub fn set_channel_frequency(&mut self, world: &mut World, at: GlobalPos, freq: i32) -> bool {
        let Some(segment) = world.segment_mut(at) else {
            return false;
        };
        let Some(cfg) = segment.channel.as_mut() else {
            return false;
        };
        cfg.frequency = freq;
        let cfg = *cfg;
        self.registry
            .register(cfg.kind, freq, at.realm, at.pos, cfg.can_send, cfg.can_receive);
        true
    }

    /// Retune an extraction endpoint: unregister the old pump frequency,
    /// register the new one.
    pub fn set_extraction_frequency(
        &mut self,
        world: &mut World,
        at: GlobalPos,
        freq: i32,
    ) -> bool {
        let Some(segment) = world.segment_mut(at) else {
            return false;
        };
        let Some(cfg) = segment.extraction.as_mut() else {
            return false;
        };
        let old = cfg.frequency;
        cfg.frequency = freq;
        self.pumps.unregister(old, at);
        self.pumps.register_endpoint(freq, at);
        true
    }

    // -----------------------------------------------------------------------
    // Tick
    // -----------------------------------------------------------------------

    /// Run the channel phase: one teleport attempt per sending endpoint,
    /// then one pull attempt per pumping-enabled extraction endpoint.
    /// Follows [`World::step`] in the tick, in deterministic world order.
    pub fn tick(&mut self, world: &mut World) -> ChannelReport {
        let mut report = ChannelReport::default();

        let senders: Vec<GlobalPos> = world
            .segments()
            .filter(|s| s.channel.is_some_and(|c| c.can_send))
            .map(|s| s.at)
            .collect();
        for at in senders {
            if let Some(units) = teleport::try_send(&mut self.registry, world, at) {
                report.deliveries += 1;
                report.teleported_units += units;
            }
        }

        let extractors: Vec<(GlobalPos, i32, bool)> = world
            .segments()
            .filter_map(|s| s.extraction.map(|e| (s.at, e.frequency, e.always_on)))
            .collect();
        for (at, freq, always_on) in extractors {
            if always_on || self.pumps.is_pumping_enabled(freq) {
                if extract::pull_once(world, at) {
                    report.pulls += 1;
                }
            }
        }
        report
    }

    /// Lazy cleanup over one (kind, frequency) bucket. Returns how many
    /// stale entries were dropped.
    pub fn validate(&mut self, world: &World, kind: CargoKind, freq: i32) -> usize {
        teleport::validate(&mut self.registry, world, kind, freq)
    }
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use warpduct_core::cargo::Payload;
    use warpduct_core::id::FluidTypeId;
    use warpduct_core::pos::{CellPos, RealmId};
    use warpduct_core::segment::{ChannelConfig, ExtractionConfig};
    use warpduct_core::test_utils::{pipe, test_host, world, BufferContainer};

    fn at(realm: u32, x: i32) -> GlobalPos {
        GlobalPos::new(RealmId(realm), CellPos::new(x, 0, 0))
    }

    fn channel_cfg(freq: i32, can_send: bool, can_receive: bool) -> ChannelConfig {
        ChannelConfig { kind: CargoKind::Fluid, frequency: freq, can_send, can_receive }
    }

    #[test]
    fn attach_registers_and_takes_keep_loaded_grant() {
        let mut w = world();
        let mut channels = ChannelSystem::new();
        w.insert_segment(pipe(at(0, 0)).with_channel(channel_cfg(5, true, true)));
        channels.attach(&mut w, at(0, 0));

        assert_eq!(
            channels.registry.locate(CargoKind::Fluid, RealmId(0), CellPos::new(0, 0, 0)),
            Some(5)
        );
        assert!(test_host(&w).keep_loaded.contains(&at(0, 0)));

        // Attach is idempotent.
        channels.attach(&mut w, at(0, 0));
        assert_eq!(channels.registry.len(), 1);
    }

    #[test]
    fn detach_deregisters_everything() {
        let mut w = world();
        let mut channels = ChannelSystem::new();
        let seg = pipe(at(0, 0))
            .with_channel(channel_cfg(5, true, true))
            .with_extraction(ExtractionConfig {
                kind: CargoKind::Fluid,
                frequency: 9,
                always_on: false,
            });
        w.insert_segment(seg);
        channels.attach(&mut w, at(0, 0));
        assert_eq!(channels.pumps.members(9), &[at(0, 0)]);

        channels.remove_segment(&mut w, at(0, 0));
        assert!(channels.registry.is_empty());
        assert!(channels.pumps.members(9).is_empty());
        assert!(!test_host(&w).keep_loaded.contains(&at(0, 0)));
        assert!(w.segment(at(0, 0)).is_none());
    }

    #[test]
    fn retuning_moves_the_registration() {
        let mut w = world();
        let mut channels = ChannelSystem::new();
        w.insert_segment(pipe(at(0, 0)).with_channel(channel_cfg(1, true, true)));
        channels.attach(&mut w, at(0, 0));

        assert!(channels.set_channel_frequency(&mut w, at(0, 0), 2));
        assert_eq!(
            channels.registry.locate(CargoKind::Fluid, RealmId(0), CellPos::new(0, 0, 0)),
            Some(2)
        );
        assert!(channels.registry.entries(CargoKind::Fluid, 1).is_empty());
        assert_eq!(w.segment(at(0, 0)).unwrap().channel.unwrap().frequency, 2);
    }

    #[test]
    fn pump_gating_controls_extraction() {
        let mut w = world();
        let mut channels = ChannelSystem::new();
        let seg = pipe(at(0, 0)).with_extraction(ExtractionConfig {
            kind: CargoKind::Fluid,
            frequency: 4,
            always_on: false,
        });
        w.insert_segment(seg);
        channels.attach(&mut w, at(0, 0));

        let mut tank = BufferContainer::new(1000);
        tank.contents.push(Payload::Fluid { fluid: FluidTypeId(0), amount: 500 });
        w.insert_container(GlobalPos::new(RealmId(0), CellPos::new(0, -1, 0)), Box::new(tank));

        // Pumping off: the endpoint sits idle.
        let report = channels.tick(&mut w);
        assert_eq!(report.pulls, 0);

        // Remote controller turns the frequency on.
        channels.pumps.set_pumping_enabled(4, true);
        let report = channels.tick(&mut w);
        assert_eq!(report.pulls, 1);
        assert!(w.segment(at(0, 0)).unwrap().stored_amount(CargoKind::Fluid) > 0);
    }

    #[test]
    fn always_on_ignores_the_pump_registry() {
        let mut w = world();
        let mut channels = ChannelSystem::new();
        let seg = pipe(at(0, 0)).with_extraction(ExtractionConfig {
            kind: CargoKind::Fluid,
            frequency: 4,
            always_on: true,
        });
        w.insert_segment(seg);
        channels.attach(&mut w, at(0, 0));

        let mut tank = BufferContainer::new(1000);
        tank.contents.push(Payload::Fluid { fluid: FluidTypeId(0), amount: 500 });
        w.insert_container(GlobalPos::new(RealmId(0), CellPos::new(0, -1, 0)), Box::new(tank));

        let report = channels.tick(&mut w);
        assert_eq!(report.pulls, 1);
    }
}
