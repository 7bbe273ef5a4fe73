//! The router: per-tick cargo motion through a segment.
//!
//! Each cargo unit is a tiny state machine driven by its `progress` and
//! `direction` fields:
//!
//! - **moving in** -- progress 0 to ½, direction fixed to the inverse of the
//!   side it entered from;
//! - **at center** -- progress ½, direction unset; a routing decision picks
//!   an output by role filtering and round-robin selection;
//! - **moving out** -- progress ½ to 1, direction fixed to the chosen
//!   output; reaching 1 attempts the real transfer;
//! - **bounced** -- the transfer was rejected: the failed side becomes the
//!   new source, progress resets to 0, and the next decision excludes it.
//!
//! A unit with no viable route stalls in place and is retried every tick;
//! nothing is ever dropped.

use crate::cargo::{CargoUnit, Payload};
use crate::direction::Direction;
use crate::fixed::{Fixed64, CENTER, END};
use crate::policy::PortRole;
use crate::pos::GlobalPos;
use crate::segment::PipeSegment;
use crate::world::World;

// ---------------------------------------------------------------------------
// MotionReport
// ---------------------------------------------------------------------------

/// What one motion pass did, aggregated over cargo units.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MotionReport {
    /// Units that advanced or received a direction this tick.
    pub advanced: u32,
    /// Units (fully) handed to a neighbor segment or container.
    pub delivered: u32,
    /// Units that had no viable route this tick.
    pub stalled: u32,
    /// Units whose transfer was rejected and that turned around.
    pub bounced: u32,
}

impl MotionReport {
    pub fn merge(&mut self, other: MotionReport) {
        self.advanced += other.advanced;
        self.delivered += other.delivered;
        self.stalled += other.stalled;
        self.bounced += other.bounced;
    }
}

// ---------------------------------------------------------------------------
// Segment update
// ---------------------------------------------------------------------------

/// Advance every cargo unit in `segment` by one tick. The segment must be
/// detached from the world (see [`World::take_segment`]) so that neighbor
/// lookups cannot alias it.
pub fn update_segment(world: &mut World, segment: &mut PipeSegment) -> MotionReport {
    let step = segment.tier.step();
    let mut report = MotionReport::default();
    let mut i = 0;
    while i < segment.cargo.len() {
        match advance_unit(world, segment, i, step, &mut report) {
            UnitFate::Kept => i += 1,
            UnitFate::Removed => {}
        }
    }
    report
}

enum UnitFate {
    Kept,
    Removed,
}

fn advance_unit(
    world: &mut World,
    segment: &mut PipeSegment,
    index: usize,
    step: Fixed64,
    report: &mut MotionReport,
) -> UnitFate {
    debug_assert!(
        segment.cargo[index].progress >= Fixed64::ZERO,
        "negative cargo progress"
    );

    // Decision point: centered, freshly injected, or bounced.
    let Some(direction) = segment.cargo[index].direction else {
        match choose_output(world, segment, index) {
            Some(chosen) => {
                let unit = &mut segment.cargo[index];
                unit.direction = Some(chosen);
                unit.routed = true;
                report.advanced += 1;
            }
            None => report.stalled += 1,
        }
        return UnitFate::Kept;
    };

    let progress = segment.cargo[index].progress;
    if !segment.cargo[index].routed && progress < CENTER {
        // Moving in. Arriving at the center clears the direction so the
        // next tick runs the routing decision.
        let next = progress + step;
        let unit = &mut segment.cargo[index];
        if next >= CENTER {
            unit.progress = CENTER;
            unit.direction = None;
        } else {
            unit.progress = next;
        }
        report.advanced += 1;
        UnitFate::Kept
    } else {
        // Moving out; a rerouted unit crosses the whole segment.
        let next = progress + step;
        if next < END {
            segment.cargo[index].progress = next;
            report.advanced += 1;
            return UnitFate::Kept;
        }
        segment.cargo[index].progress = END;
        attempt_transfer(world, segment, index, direction, report)
    }
}

// ---------------------------------------------------------------------------
// Routing decision
// ---------------------------------------------------------------------------

/// Pick an output for the unit at `index`, or `None` to stall.
///
/// Candidates are the connected Output sides other than the unit's source
/// whose neighbor currently reports willingness to accept. With several
/// candidates the segment's round-robin cursor picks one; the cursor is
/// indexed and advanced modulo the *current* candidate count, so fairness
/// is best-effort under topology churn.
fn choose_output(world: &World, segment: &mut PipeSegment, index: usize) -> Option<Direction> {
    let unit = &segment.cargo[index];
    let mut candidates: [Direction; 6] = [Direction::Down; 6];
    let mut count = 0;
    for dir in Direction::ALL {
        if !segment.connections.contains(dir) {
            continue;
        }
        if segment.ports.role(dir) != PortRole::Output {
            continue;
        }
        if unit.source == Some(dir) {
            continue;
        }
        if neighbor_accepts(world, segment.at, dir, &unit.payload) {
            candidates[count] = dir;
            count += 1;
        }
    }
    if count == 0 {
        return None;
    }
    let picked = segment.route_cursor % count;
    segment.route_cursor = (picked + 1) % count;
    Some(candidates[picked])
}

/// The presence/acceptance probe: advisory, not a reservation.
fn neighbor_accepts(world: &World, from: GlobalPos, dir: Direction, payload: &Payload) -> bool {
    let at = from.step(dir);
    if let Some(neighbor) = world.segment(at) {
        neighbor.probe_accept(payload, dir.opposite())
    } else if let Some(container) = world.container_at(at) {
        container.simulate_accept(payload) > 0
    } else {
        false
    }
}

// ---------------------------------------------------------------------------
// Transfer at progress 1
// ---------------------------------------------------------------------------

fn attempt_transfer(
    world: &mut World,
    segment: &mut PipeSegment,
    index: usize,
    direction: Direction,
    report: &mut MotionReport,
) -> UnitFate {
    let at = segment.at.step(direction);

    if world.segment(at).is_some() {
        return transfer_to_segment(world, segment, index, direction, at, report);
    }
    if world.container_at(at).is_some() {
        return transfer_to_container(world, segment, index, direction, at, report);
    }

    // The neighbor vanished mid-flight; turn around.
    bounce(&mut segment.cargo[index], direction);
    report.bounced += 1;
    UnitFate::Kept
}

fn transfer_to_segment(
    world: &mut World,
    segment: &mut PipeSegment,
    index: usize,
    direction: Direction,
    at: GlobalPos,
    report: &mut MotionReport,
) -> UnitFate {
    let Some(neighbor) = world.segment_mut(at) else {
        bounce(&mut segment.cargo[index], direction);
        report.bounced += 1;
        return UnitFate::Kept;
    };
    let accepted = neighbor.edge_accept(&segment.cargo[index].payload);
    if accepted == 0 {
        bounce(&mut segment.cargo[index], direction);
        report.bounced += 1;
        return UnitFate::Kept;
    }

    let offered = segment.cargo[index].payload.amount();
    if accepted >= offered {
        // Whole unit crosses; crossing clears the teleported flag.
        let unit = segment.cargo.remove(index);
        neighbor
            .cargo
            .push(CargoUnit::entering(unit.payload, direction.opposite()));
        report.delivered += 1;
        UnitFate::Removed
    } else {
        // Partial crossing (volume cargo); the remainder bounces.
        let granted = segment.cargo[index].payload.split(accepted);
        neighbor
            .cargo
            .push(CargoUnit::entering(granted, direction.opposite()));
        log::trace!(
            "partial edge transfer into {at:?}: accepted {accepted} of {offered}"
        );
        bounce(&mut segment.cargo[index], direction);
        report.delivered += 1;
        report.bounced += 1;
        UnitFate::Kept
    }
}

fn transfer_to_container(
    world: &mut World,
    segment: &mut PipeSegment,
    index: usize,
    direction: Direction,
    at: GlobalPos,
    report: &mut MotionReport,
) -> UnitFate {
    let Some(container) = world.container_at_mut(at) else {
        bounce(&mut segment.cargo[index], direction);
        report.bounced += 1;
        return UnitFate::Kept;
    };
    let offered = segment.cargo[index].payload.amount();
    let accepted = container.simulate_accept(&segment.cargo[index].payload);
    debug_assert!(accepted <= offered, "container over-accepted");
    if accepted == 0 {
        bounce(&mut segment.cargo[index], direction);
        report.bounced += 1;
        return UnitFate::Kept;
    }

    let granted = segment.cargo[index].payload.split(accepted);
    container.commit_accept(granted);
    if segment.cargo[index].payload.is_empty() {
        segment.cargo.remove(index);
        report.delivered += 1;
        UnitFate::Removed
    } else {
        log::trace!(
            "container at {at:?} accepted {accepted} of {offered}; remainder bounces"
        );
        bounce(&mut segment.cargo[index], direction);
        report.delivered += 1;
        report.bounced += 1;
        UnitFate::Kept
    }
}

/// Turn a unit around after a rejected transfer. The failed side becomes
/// the new source so the next decision excludes it.
fn bounce(unit: &mut CargoUnit, failed: Direction) {
    unit.source = Some(failed);
    unit.direction = None;
    unit.progress = Fixed64::ZERO;
}

// ===========================================================================
// Tests
// ===========================================================================
