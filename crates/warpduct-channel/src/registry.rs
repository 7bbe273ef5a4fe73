//! The frequency registry: durable, realm-spanning endpoint buckets.
//!
//! Three independent mappings (one per cargo kind), each from an integer
//! frequency to an ordered list of endpoints. The one structural invariant:
//! for a given kind, a (realm, position) pair lives in at most one frequency
//! bucket at any time. Registration enforces it by removing before
//! inserting; the teleport scan self-heals entries that went stale anyway.
//!
//! Lookups never fail. An unknown frequency is an empty list -- "no route" --
//! which callers treat as a normal, retryable condition.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use warpduct_core::cargo::CargoKind;
use warpduct_core::pos::{CellPos, GlobalPos, RealmId};

// ---------------------------------------------------------------------------
// Endpoint
// ---------------------------------------------------------------------------

/// A registered endpoint in a frequency bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Endpoint {
    pub realm: RealmId,
    pub pos: CellPos,
    pub can_send: bool,
    pub can_receive: bool,
}

impl Endpoint {
    pub fn at(&self) -> GlobalPos {
        GlobalPos::new(self.realm, self.pos)
    }
}

// ---------------------------------------------------------------------------
// FrequencyRegistry
// ---------------------------------------------------------------------------

/// Per-kind frequency buckets. Owned by the session's channel system and
/// passed by reference wherever it is needed; never a global.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FrequencyRegistry {
    kinds: [BTreeMap<i32, Vec<Endpoint>>; 3],
}

impl FrequencyRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an endpoint under `freq`, first removing any entry for the
    /// same (realm, position) under any frequency of this kind. Repeating an
    /// identical registration is a no-op, so notification storms cannot
    /// shuffle bucket order.
    pub fn register(
        &mut self,
        kind: CargoKind,
        freq: i32,
        realm: RealmId,
        pos: CellPos,
        can_send: bool,
        can_receive: bool,
    ) {
        let endpoint = Endpoint { realm, pos, can_send, can_receive };
        if self.kinds[kind.index()]
            .get(&freq)
            .is_some_and(|bucket| bucket.contains(&endpoint))
        {
            return;
        }
        self.remove(kind, realm, pos);
        self.kinds[kind.index()].entry(freq).or_default().push(endpoint);
        log::debug!("registered {kind:?} endpoint at {realm:?}/{pos:?} on frequency {freq}");
    }

    /// Remove the entry for (realm, pos), wherever it is. No-op if absent.
    /// Returns true when an entry was removed.
    pub fn remove(&mut self, kind: CargoKind, realm: RealmId, pos: CellPos) -> bool {
        let buckets = &mut self.kinds[kind.index()];
        let mut removed_from = None;
        for (freq, bucket) in buckets.iter_mut() {
            let before = bucket.len();
            bucket.retain(|e| !(e.realm == realm && e.pos == pos));
            if bucket.len() != before {
                removed_from = Some(*freq);
                break;
            }
        }
        if let Some(freq) = removed_from {
            if buckets.get(&freq).is_some_and(|b| b.is_empty()) {
                buckets.remove(&freq);
            }
            log::debug!("removed {kind:?} endpoint at {realm:?}/{pos:?} from frequency {freq}");
            true
        } else {
            false
        }
    }

    /// The receiving endpoints on `freq`, in insertion order.
    /// Unknown frequencies yield an empty list.
    pub fn receivers(&self, kind: CargoKind, freq: i32) -> Vec<Endpoint> {
        self.entries(kind, freq)
            .iter()
            .filter(|e| e.can_receive)
            .copied()
            .collect()
    }

    /// The sending endpoints on `freq`, in insertion order.
    pub fn senders(&self, kind: CargoKind, freq: i32) -> Vec<Endpoint> {
        self.entries(kind, freq)
            .iter()
            .filter(|e| e.can_send)
            .copied()
            .collect()
    }

    /// Every entry on `freq`, in insertion order.
    pub fn entries(&self, kind: CargoKind, freq: i32) -> &[Endpoint] {
        self.kinds[kind.index()]
            .get(&freq)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// The frequency currently holding (realm, pos), if any.
    pub fn locate(&self, kind: CargoKind, realm: RealmId, pos: CellPos) -> Option<i32> {
        self.kinds[kind.index()]
            .iter()
            .find(|(_, bucket)| bucket.iter().any(|e| e.realm == realm && e.pos == pos))
            .map(|(freq, _)| *freq)
    }

    /// Iterate all (frequency, bucket) pairs of one kind.
    pub fn frequencies(&self, kind: CargoKind) -> impl Iterator<Item = (i32, &[Endpoint])> {
        self.kinds[kind.index()]
            .iter()
            .map(|(freq, bucket)| (*freq, bucket.as_slice()))
    }

    /// Total entries across all kinds and frequencies.
    pub fn len(&self) -> usize {
        self.kinds
            .iter()
            .flat_map(|buckets| buckets.values())
            .map(Vec::len)
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn pos(x: i32) -> CellPos {
        CellPos::new(x, 0, 0)
    }

    #[test]
    fn register_and_lookup() {
        let mut reg = FrequencyRegistry::new();
        reg.register(CargoKind::Item, 5, RealmId(0), pos(1), true, false);
        reg.register(CargoKind::Item, 5, RealmId(0), pos(2), false, true);

        assert_eq!(reg.senders(CargoKind::Item, 5).len(), 1);
        assert_eq!(reg.receivers(CargoKind::Item, 5).len(), 1);
        assert_eq!(reg.receivers(CargoKind::Item, 5)[0].pos, pos(2));
    }

    #[test]
    fn unknown_frequency_is_empty_not_an_error() {
        let reg = FrequencyRegistry::new();
        assert!(reg.receivers(CargoKind::Gas, 999).is_empty());
        assert!(reg.entries(CargoKind::Gas, 999).is_empty());
    }

    #[test]
    fn re_registration_moves_between_frequencies() {
        let mut reg = FrequencyRegistry::new();
        reg.register(CargoKind::Fluid, 1, RealmId(0), pos(0), true, true);
        reg.register(CargoKind::Fluid, 2, RealmId(0), pos(0), true, true);

        assert_eq!(reg.locate(CargoKind::Fluid, RealmId(0), pos(0)), Some(2));
        assert!(reg.entries(CargoKind::Fluid, 1).is_empty());
        assert_eq!(reg.len(), 1);
    }

    #[test]
    fn identical_re_registration_is_a_no_op() {
        let mut reg = FrequencyRegistry::new();
        reg.register(CargoKind::Item, 7, RealmId(0), pos(0), true, true);
        reg.register(CargoKind::Item, 7, RealmId(0), pos(1), true, true);
        // Repeat the first registration; order must not change.
        reg.register(CargoKind::Item, 7, RealmId(0), pos(0), true, true);

        let entries = reg.entries(CargoKind::Item, 7);
        assert_eq!(entries[0].pos, pos(0));
        assert_eq!(entries[1].pos, pos(1));
    }

    #[test]
    fn flag_change_re_registers_in_place() {
        let mut reg = FrequencyRegistry::new();
        reg.register(CargoKind::Item, 7, RealmId(0), pos(0), true, true);
        reg.register(CargoKind::Item, 7, RealmId(0), pos(0), true, false);

        let entries = reg.entries(CargoKind::Item, 7);
        assert_eq!(entries.len(), 1);
        assert!(!entries[0].can_receive);
    }

    #[test]
    fn kinds_are_independent() {
        let mut reg = FrequencyRegistry::new();
        reg.register(CargoKind::Item, 3, RealmId(0), pos(0), true, true);
        reg.register(CargoKind::Fluid, 3, RealmId(0), pos(0), true, true);

        // Same position on the same frequency number, different kinds:
        // both entries live.
        assert_eq!(reg.len(), 2);
        reg.remove(CargoKind::Item, RealmId(0), pos(0));
        assert_eq!(reg.locate(CargoKind::Fluid, RealmId(0), pos(0)), Some(3));
    }

    #[test]
    fn remove_absent_is_a_no_op() {
        let mut reg = FrequencyRegistry::new();
        assert!(!reg.remove(CargoKind::Item, RealmId(0), pos(0)));
    }

    #[test]
    fn empty_buckets_are_dropped() {
        let mut reg = FrequencyRegistry::new();
        reg.register(CargoKind::Item, 4, RealmId(1), pos(0), true, true);
        reg.remove(CargoKind::Item, RealmId(1), pos(0));
        assert_eq!(reg.frequencies(CargoKind::Item).count(), 0);
    }

    #[test]
    fn uniqueness_across_register_sequence() {
        let mut reg = FrequencyRegistry::new();
        for freq in 0..10 {
            reg.register(CargoKind::Gas, freq, RealmId(0), pos(0), true, true);
        }
        // However many times it re-registered, exactly one entry survives.
        assert_eq!(reg.len(), 1);
        assert_eq!(reg.locate(CargoKind::Gas, RealmId(0), pos(0)), Some(9));
    }

    #[test]
    fn insertion_order_is_preserved() {
        let mut reg = FrequencyRegistry::new();
        for x in 0..4 {
            reg.register(CargoKind::Item, 1, RealmId(0), pos(x), false, true);
        }
        let order: Vec<i32> = reg
            .receivers(CargoKind::Item, 1)
            .iter()
            .map(|e| e.pos.x)
            .collect();
        assert_eq!(order, vec![0, 1, 2, 3]);
    }
}
