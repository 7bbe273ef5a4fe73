//! Cross-realm delivery over a frequency channel.
//!
//! A sending endpoint scans the receiver list for its kind and frequency,
//! starting at its own round-robin index and wrapping at most once around.
//! Along the way it skips itself, forces the destination addressable through
//! the host (bounded to that one address), self-heals stale registry
//! entries, and tolerates transient capability mismatches. The first
//! receiver that accepts a nonzero amount gets the delivery -- at most one
//! successful delivery per tick per sender -- and the cursor advances past
//! it. If the whole scan fails the cargo simply stays for the next tick.

use crate::registry::FrequencyRegistry;
use warpduct_core::cargo::CargoKind;
use warpduct_core::pos::GlobalPos;
use warpduct_core::segment::PipeSegment;
use warpduct_core::world::World;

/// Try one long-range delivery from the segment at `at`.
/// Returns the number of units delivered, or `None` when nothing moved.
pub fn try_send(
    registry: &mut FrequencyRegistry,
    world: &mut World,
    at: GlobalPos,
) -> Option<u32> {
    let mut sender = world.take_segment(at)?;
    let sent = send_from(registry, world, &mut sender);
    world.put_segment(sender);
    sent
}

fn send_from(
    registry: &mut FrequencyRegistry,
    world: &mut World,
    sender: &mut PipeSegment,
) -> Option<u32> {
    let cfg = sender.channel?;
    if !cfg.can_send {
        return None;
    }
    // Cargo is eligible once it is awaiting a routing decision (centered,
    // seeded stock, or bounced) and did not itself arrive by teleport.
    let unit_idx = sender
        .cargo
        .iter()
        .position(|u| u.is_undecided() && !u.teleported && u.payload.kind() == cfg.kind)?;

    let receivers = registry.receivers(cfg.kind, cfg.frequency);
    if receivers.is_empty() {
        // No route. Normal and retryable; the caller may opportunistically
        // run a validate pass over the registry.
        return None;
    }

    let rate = sender.tier.transfer_rate();
    let count = receivers.len();
    let start = sender.warp_cursor % count;

    for scanned in 0..count {
        let idx = (start + scanned) % count;
        let endpoint = receivers[idx];
        let target_at = endpoint.at();

        // 1. Never deliver to ourselves.
        if target_at == sender.at {
            continue;
        }

        // 2. Force the destination addressable (single address, may block).
        if let Err(err) = world.host_mut().ensure_addressable(target_at) {
            log::debug!("receiver at {target_at:?} skipped: {err}");
            continue;
        }

        // 3./4. Check the live target against the registry entry.
        let offer = {
            let mut probe = sender.cargo[unit_idx].payload.clone();
            probe.split(rate)
        };
        let accepted = match world.segment(target_at) {
            Some(target) => match target.channel {
                Some(live) if live.kind == cfg.kind && live.frequency == cfg.frequency => {
                    if live.can_receive != endpoint.can_receive {
                        // Transient mismatch: skip without touching the entry.
                        continue;
                    }
                    target.simulate_accept(&offer)
                }
                _ => {
                    // Not a matching endpoint anymore: stale, self-heal.
                    registry.remove(cfg.kind, endpoint.realm, endpoint.pos);
                    log::debug!("dropped stale endpoint at {target_at:?}");
                    continue;
                }
            },
            None => {
                registry.remove(cfg.kind, endpoint.realm, endpoint.pos);
                log::debug!("dropped stale endpoint at {target_at:?}");
                continue;
            }
        };

        // 5. Two-phase transfer; zero acceptance keeps scanning.
        if accepted == 0 {
            continue;
        }
        let granted = sender.cargo[unit_idx].payload.split(accepted);
        let Some(target) = world.segment_mut(target_at) else {
            // The target cannot vanish between the checks above and here on
            // one thread; put the payload back rather than lose cargo.
            debug_assert!(false, "teleport target vanished mid-transfer");
            sender.cargo[unit_idx].payload.absorb(granted.amount());
            continue;
        };
        target.commit_arrival(granted, true);
        if sender.cargo[unit_idx].payload.is_empty() {
            sender.cargo.remove(unit_idx);
        }
        sender.warp_cursor = (idx + 1) % count;
        log::debug!(
            "teleported {accepted} units of {:?} from {:?} to {target_at:?} on frequency {}",
            cfg.kind,
            sender.at,
            cfg.frequency,
        );
        return Some(accepted);
    }
    None
}

/// Lazy cleanup pass: drop every entry on (kind, freq) whose live target no
/// longer exists or no longer matches. Returns the number of entries
/// removed. Callers run this opportunistically, typically after observing an
/// empty or fruitless receiver list.
pub fn validate(
    registry: &mut FrequencyRegistry,
    world: &World,
    kind: CargoKind,
    freq: i32,
) -> usize {
    let stale: Vec<_> = registry
        .entries(kind, freq)
        .iter()
        .filter(|e| {
            match world.segment(e.at()) {
                Some(seg) => !seg
                    .channel
                    .is_some_and(|live| live.kind == kind && live.frequency == freq),
                None => true,
            }
        })
        .copied()
        .collect();
    for endpoint in &stale {
        registry.remove(kind, endpoint.realm, endpoint.pos);
    }
    if !stale.is_empty() {
        log::debug!("validate dropped {} stale entries on {kind:?}/{freq}", stale.len());
    }
    stale.len()
}
