//! Property-based tests for the frequency registry.
//!
//! Uses proptest to generate random register/remove interleavings, then
//! verify the structural invariants hold: position uniqueness per kind,
//! order preservation, and lookups that never fail.

use proptest::prelude::*;
use std::collections::BTreeSet;
use warpduct_core::cargo::CargoKind;
use warpduct_core::pos::{CellPos, RealmId};
use warpduct_channel::FrequencyRegistry;

// ===========================================================================
// Generators
// ===========================================================================

/// One registry operation over a small position/frequency universe so that
/// collisions actually happen.
#[derive(Debug, Clone)]
enum RegOp {
    Register { freq: i32, realm: u32, x: i32, can_send: bool, can_receive: bool },
    Remove { realm: u32, x: i32 },
}

fn arb_op() -> impl Strategy<Value = RegOp> {
    prop_oneof![
        (0..8i32, 0..3u32, 0..6i32, any::<bool>(), any::<bool>()).prop_map(
            |(freq, realm, x, can_send, can_receive)| RegOp::Register {
                freq,
                realm,
                x,
                can_send,
                can_receive,
            }
        ),
        (0..3u32, 0..6i32).prop_map(|(realm, x)| RegOp::Remove { realm, x }),
    ]
}

fn apply(reg: &mut FrequencyRegistry, kind: CargoKind, ops: &[RegOp]) {
    for op in ops {
        match *op {
            RegOp::Register { freq, realm, x, can_send, can_receive } => {
                reg.register(kind, freq, RealmId(realm), CellPos::new(x, 0, 0), can_send, can_receive);
            }
            RegOp::Remove { realm, x } => {
                reg.remove(kind, RealmId(realm), CellPos::new(x, 0, 0));
            }
        }
    }
}

// ===========================================================================
// Properties
// ===========================================================================

proptest! {
    /// After any operation sequence, each (realm, pos) appears in at most
    /// one frequency bucket of its kind.
    #[test]
    fn position_appears_in_at_most_one_bucket(ops in proptest::collection::vec(arb_op(), 0..64)) {
        let mut reg = FrequencyRegistry::new();
        apply(&mut reg, CargoKind::Item, &ops);

        let mut seen = BTreeSet::new();
        for (_, bucket) in reg.frequencies(CargoKind::Item) {
            for endpoint in bucket {
                prop_assert!(
                    seen.insert((endpoint.realm, endpoint.pos)),
                    "{:?}/{:?} registered twice",
                    endpoint.realm,
                    endpoint.pos
                );
            }
        }
    }

    /// Kinds are fully independent: interleaving operations on another kind
    /// never disturbs the first kind's buckets.
    #[test]
    fn kinds_do_not_interfere(
        item_ops in proptest::collection::vec(arb_op(), 0..32),
        gas_ops in proptest::collection::vec(arb_op(), 0..32),
    ) {
        let mut solo = FrequencyRegistry::new();
        apply(&mut solo, CargoKind::Item, &item_ops);

        let mut mixed = FrequencyRegistry::new();
        apply(&mut mixed, CargoKind::Item, &item_ops);
        apply(&mut mixed, CargoKind::Gas, &gas_ops);

        for (freq, bucket) in solo.frequencies(CargoKind::Item) {
            prop_assert_eq!(mixed.entries(CargoKind::Item, freq), bucket);
        }
    }

    /// Lookups on arbitrary frequencies never panic and filters agree with
    /// the stored flags.
    #[test]
    fn lookups_never_fail(
        ops in proptest::collection::vec(arb_op(), 0..64),
        probe_freq in -16..16i32,
    ) {
        let mut reg = FrequencyRegistry::new();
        apply(&mut reg, CargoKind::Fluid, &ops);

        let receivers = reg.receivers(CargoKind::Fluid, probe_freq);
        let senders = reg.senders(CargoKind::Fluid, probe_freq);
        prop_assert!(receivers.iter().all(|e| e.can_receive));
        prop_assert!(senders.iter().all(|e| e.can_send));
        prop_assert!(receivers.len() <= reg.entries(CargoKind::Fluid, probe_freq).len());
    }

    /// Removing every registered position empties the registry and drops
    /// every bucket.
    #[test]
    fn full_removal_leaves_nothing(ops in proptest::collection::vec(arb_op(), 0..64)) {
        let mut reg = FrequencyRegistry::new();
        apply(&mut reg, CargoKind::Item, &ops);

        let all: Vec<_> = reg
            .frequencies(CargoKind::Item)
            .flat_map(|(_, bucket)| bucket.iter().copied())
            .collect();
        for endpoint in all {
            reg.remove(CargoKind::Item, endpoint.realm, endpoint.pos);
        }
        prop_assert!(reg.is_empty());
        prop_assert_eq!(reg.frequencies(CargoKind::Item).count(), 0);
    }
}
