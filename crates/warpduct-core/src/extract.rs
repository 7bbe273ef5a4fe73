//! Extraction pulls: actively drawing cargo out of adjacent containers.
//!
//! An extraction endpoint probes its Input-role sides in canonical order and
//! performs at most one successful two-phase pull per tick, stopping at the
//! first container that yields a nonzero payload. Whether the endpoint pulls
//! at all is decided by its caller (manual always-on or the pump registry).

use crate::cargo::CargoUnit;
use crate::direction::Direction;
use crate::policy::PortRole;
use crate::pos::GlobalPos;
use crate::segment::PipeSegment;
use crate::world::World;

/// Run one extraction attempt for the segment at `at`. Returns true when a
/// pull landed cargo in the segment.
pub fn pull_once(world: &mut World, at: GlobalPos) -> bool {
    let Some(mut segment) = world.take_segment(at) else {
        return false;
    };
    let pulled = pull_into(world, &mut segment);
    world.put_segment(segment);
    pulled
}

fn pull_into(world: &mut World, segment: &mut PipeSegment) -> bool {
    let Some(cfg) = segment.extraction else {
        return false;
    };
    let rate = segment.tier.transfer_rate();

    for dir in Direction::ALL {
        if !segment.connections.contains(dir) || segment.ports.role(dir) != PortRole::Input {
            continue;
        }
        let neighbor = segment.at.step(dir);
        // Pulls come from containers only, never from other pipe segments.
        if world.segment(neighbor).is_some() {
            continue;
        }
        let Some(container) = world.container_at(neighbor) else {
            continue;
        };
        let Some(peek) = container.simulate_extract(cfg.kind, rate) else {
            continue;
        };
        if peek.is_empty() {
            continue;
        }

        // Cap the pull at what the segment itself can take.
        let fits = segment.edge_accept(&peek);
        if fits == 0 {
            continue;
        }
        let payload = if fits < peek.amount() {
            match container.simulate_extract(cfg.kind, fits) {
                Some(p) if !p.is_empty() => p,
                _ => continue,
            }
        } else {
            peek
        };

        let Some(container) = world.container_at_mut(neighbor) else {
            continue;
        };
        container.commit_extract(&payload);
        log::trace!(
            "extracted {} units of {:?} at {:?} through {dir:?}",
            payload.amount(),
            cfg.kind,
            segment.at,
        );
        segment.cargo.push(CargoUnit::entering(payload, dir));
        return true;
    }
    false
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cargo::{CargoKind, Payload};
    use crate::id::ItemTypeId;
    use crate::pos::{CellPos, RealmId};
    use crate::segment::ExtractionConfig;
    use crate::test_utils::{pipe, world, BufferContainer};
    use crate::tier::Tier;

    fn at(x: i32, y: i32, z: i32) -> GlobalPos {
        GlobalPos::new(RealmId(0), CellPos::new(x, y, z))
    }

    fn extractor(pos: GlobalPos) -> PipeSegment {
        pipe(pos).with_extraction(ExtractionConfig {
            kind: CargoKind::Item,
            frequency: 0,
            always_on: true,
        })
    }

    fn seeded_chest(count: u32) -> BufferContainer {
        let mut chest = BufferContainer::new(1000);
        chest.contents.push(Payload::Stack { item: ItemTypeId(0), count });
        chest
    }

    #[test]
    fn pulls_from_input_side_container() {
        let mut w = world();
        w.insert_segment(extractor(at(0, 0, 0)));
        w.insert_container(at(0, -1, 0), Box::new(seeded_chest(100)));

        assert!(pull_once(&mut w, at(0, 0, 0)));
        let seg = w.segment(at(0, 0, 0)).unwrap();
        assert_eq!(seg.cargo.len(), 1);
        // Basic tier pulls up to 8 units at once.
        assert_eq!(seg.cargo[0].payload.amount(), Tier::Basic.transfer_rate());
        assert_eq!(seg.cargo[0].source, Some(Direction::Down));
    }

    #[test]
    fn one_pull_per_tick_even_with_two_sources() {
        let mut w = world();
        w.insert_segment(extractor(at(0, 0, 0)));
        w.insert_container(at(0, -1, 0), Box::new(seeded_chest(100)));
        w.insert_container(at(0, 1, 0), Box::new(seeded_chest(100)));
        // Make both container sides inputs: Up starts as the auto output,
        // so cycle it Output -> Disabled -> Input.
        w.cycle_side(at(0, 0, 0), Direction::Up);
        w.cycle_side(at(0, 0, 0), Direction::Up);

        assert!(pull_once(&mut w, at(0, 0, 0)));
        assert_eq!(w.segment(at(0, 0, 0)).unwrap().cargo.len(), 1);
    }

    #[test]
    fn empty_container_is_skipped_for_a_later_one() {
        let mut w = world();
        w.insert_segment(extractor(at(0, 0, 0)));
        w.insert_container(at(0, -1, 0), Box::new(BufferContainer::new(10)));
        w.insert_container(at(0, 1, 0), Box::new(seeded_chest(5)));
        // Cycle the seeded side Output -> Disabled -> Input.
        w.cycle_side(at(0, 0, 0), Direction::Up);
        w.cycle_side(at(0, 0, 0), Direction::Up);

        assert!(pull_once(&mut w, at(0, 0, 0)));
        assert_eq!(
            w.segment(at(0, 0, 0)).unwrap().stored_amount(CargoKind::Item),
            5
        );
    }

    #[test]
    fn no_pull_without_extraction_config() {
        let mut w = world();
        w.insert_segment(pipe(at(0, 0, 0)));
        w.insert_container(at(0, -1, 0), Box::new(seeded_chest(100)));
        assert!(!pull_once(&mut w, at(0, 0, 0)));
    }

    #[test]
    fn output_side_container_is_not_pulled_from() {
        let mut w = world();
        w.insert_segment(extractor(at(0, 0, 0)));
        // Down becomes the auto input; Up stays an output.
        w.insert_container(at(0, -1, 0), Box::new(BufferContainer::new(10)));
        w.insert_container(at(0, 1, 0), Box::new(seeded_chest(100)));

        // The only stocked container sits on an output side; nothing pulls.
        assert!(!pull_once(&mut w, at(0, 0, 0)));
    }
}
