//! Persisted registry layout.
//!
//! Per cargo kind, a list of (frequency, list of (realm id, packed position,
//! can-send, can-receive)), plus the pump channels. Encoded with `bitcode`
//! behind a small magic/version header so a foreign or future blob is
//! rejected before decoding. Round-trips exactly, including entries whose
//! realm is not currently loaded -- registry durability must not depend on
//! realm residency.

use crate::pump::PumpRegistry;
use crate::registry::FrequencyRegistry;
use serde::{Deserialize, Serialize};
use warpduct_core::cargo::CargoKind;
use warpduct_core::pos::{CellPos, GlobalPos, RealmId};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Magic number identifying a warpduct registry image.
pub const REGISTRY_MAGIC: u32 = 0x5744_0001;

/// Current format version. Increment when breaking the wire format.
pub const FORMAT_VERSION: u32 = 1;

/// Header length in bytes: magic + version, little-endian.
const HEADER_LEN: usize = 8;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors that can occur while saving a registry image.
#[derive(Debug, thiserror::Error)]
pub enum SaveError {
    #[error("bitcode encoding failed: {0}")]
    Encode(String),
}

/// Errors that can occur while loading a registry image.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("data too short for registry header")]
    TooShort,
    #[error("invalid magic number: expected 0x{:08X}, got 0x{:08X}", REGISTRY_MAGIC, .0)]
    InvalidMagic(u32),
    #[error("registry image from future version {0} (this build supports up to {FORMAT_VERSION})")]
    FutureVersion(u32),
    #[error("bitcode decoding failed: {0}")]
    Decode(String),
}

// ---------------------------------------------------------------------------
// Wire records
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize, Deserialize)]
struct EndpointRecord {
    realm: u32,
    packed_pos: u64,
    can_send: bool,
    can_receive: bool,
}

#[derive(Debug, Serialize, Deserialize)]
struct PumpRecord {
    frequency: i32,
    members: Vec<(u32, u64)>,
    enabled: bool,
}

#[derive(Debug, Serialize, Deserialize)]
struct RegistryImage {
    /// One list per cargo kind, in [`CargoKind::ALL`] order.
    kinds: Vec<Vec<(i32, Vec<EndpointRecord>)>>,
    pumps: Vec<PumpRecord>,
}

// ---------------------------------------------------------------------------
// Save / load
// ---------------------------------------------------------------------------

/// Serialize the registries to a headered binary image.
pub fn save(registry: &FrequencyRegistry, pumps: &PumpRegistry) -> Result<Vec<u8>, SaveError> {
    let image = RegistryImage {
        kinds: CargoKind::ALL
            .into_iter()
            .map(|kind| {
                registry
                    .frequencies(kind)
                    .map(|(freq, bucket)| {
                        let records = bucket
                            .iter()
                            .map(|e| EndpointRecord {
                                realm: e.realm.0,
                                packed_pos: e.pos.pack(),
                                can_send: e.can_send,
                                can_receive: e.can_receive,
                            })
                            .collect();
                        (freq, records)
                    })
                    .collect()
            })
            .collect(),
        pumps: pumps
            .channels()
            .map(|(freq, channel)| PumpRecord {
                frequency: freq,
                members: channel
                    .members
                    .iter()
                    .map(|at| (at.realm.0, at.pos.pack()))
                    .collect(),
                enabled: channel.enabled,
            })
            .collect(),
    };

    let body = bitcode::serialize(&image).map_err(|e| SaveError::Encode(e.to_string()))?;
    let mut bytes = Vec::with_capacity(HEADER_LEN + body.len());
    bytes.extend_from_slice(&REGISTRY_MAGIC.to_le_bytes());
    bytes.extend_from_slice(&FORMAT_VERSION.to_le_bytes());
    bytes.extend_from_slice(&body);
    Ok(bytes)
}

/// Rebuild the registries from a headered binary image.
pub fn load(bytes: &[u8]) -> Result<(FrequencyRegistry, PumpRegistry), LoadError> {
    if bytes.len() < HEADER_LEN {
        return Err(LoadError::TooShort);
    }
    let magic = u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
    if magic != REGISTRY_MAGIC {
        return Err(LoadError::InvalidMagic(magic));
    }
    let version = u32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]);
    if version > FORMAT_VERSION {
        return Err(LoadError::FutureVersion(version));
    }

    let image: RegistryImage =
        bitcode::deserialize(&bytes[HEADER_LEN..]).map_err(|e| LoadError::Decode(e.to_string()))?;

    // Replaying registrations in saved order reproduces bucket order
    // exactly, which round-robin cursors depend on.
    let mut registry = FrequencyRegistry::new();
    for (kind, buckets) in CargoKind::ALL.into_iter().zip(image.kinds) {
        for (freq, records) in buckets {
            for r in records {
                registry.register(
                    kind,
                    freq,
                    RealmId(r.realm),
                    CellPos::unpack(r.packed_pos),
                    r.can_send,
                    r.can_receive,
                );
            }
        }
    }
    let mut pump_registry = PumpRegistry::new();
    for record in image.pumps {
        for (realm, packed) in record.members {
            pump_registry.register_endpoint(
                record.frequency,
                GlobalPos::new(RealmId(realm), CellPos::unpack(packed)),
            );
        }
        if record.enabled {
            pump_registry.set_pumping_enabled(record.frequency, true);
        }
    }
    Ok((registry, pump_registry))
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn populated() -> (FrequencyRegistry, PumpRegistry) {
        let mut reg = FrequencyRegistry::new();
        // An unloaded realm (7) must survive the round-trip like any other.
        reg.register(CargoKind::Item, 5, RealmId(0), CellPos::new(1, 2, 3), true, false);
        reg.register(CargoKind::Item, 5, RealmId(7), CellPos::new(-4, 0, 9), false, true);
        reg.register(CargoKind::Fluid, -2, RealmId(1), CellPos::new(0, 64, 0), true, true);
        reg.register(CargoKind::Gas, 11, RealmId(0), CellPos::new(100, -100, 50), true, true);

        let mut pumps = PumpRegistry::new();
        pumps.register_endpoint(5, GlobalPos::new(RealmId(0), CellPos::new(1, 2, 3)));
        pumps.set_pumping_enabled(5, true);
        pumps.set_pumping_enabled(9, true);
        (reg, pumps)
    }

    #[test]
    fn roundtrip_is_exact() {
        let (reg, pumps) = populated();
        let bytes = save(&reg, &pumps).unwrap();
        let (loaded_reg, loaded_pumps) = load(&bytes).unwrap();
        assert_eq!(loaded_reg, reg);
        assert_eq!(loaded_pumps, pumps);
    }

    #[test]
    fn roundtrip_preserves_bucket_order() {
        let mut reg = FrequencyRegistry::new();
        for x in [3, 1, 2] {
            reg.register(CargoKind::Item, 1, RealmId(0), CellPos::new(x, 0, 0), false, true);
        }
        let bytes = save(&reg, &PumpRegistry::new()).unwrap();
        let (loaded, _) = load(&bytes).unwrap();
        let order: Vec<i32> = loaded
            .receivers(CargoKind::Item, 1)
            .iter()
            .map(|e| e.pos.x)
            .collect();
        assert_eq!(order, vec![3, 1, 2]);
    }

    #[test]
    fn empty_registries_roundtrip() {
        let bytes = save(&FrequencyRegistry::new(), &PumpRegistry::new()).unwrap();
        let (reg, pumps) = load(&bytes).unwrap();
        assert!(reg.is_empty());
        assert_eq!(pumps.channels().count(), 0);
    }

    #[test]
    fn short_input_rejected() {
        assert!(matches!(load(&[1, 2, 3]), Err(LoadError::TooShort)));
    }

    #[test]
    fn bad_magic_rejected() {
        let mut bytes = save(&FrequencyRegistry::new(), &PumpRegistry::new()).unwrap();
        bytes[0] ^= 0xFF;
        assert!(matches!(load(&bytes), Err(LoadError::InvalidMagic(_))));
    }

    #[test]
    fn future_version_rejected() {
        let mut bytes = save(&FrequencyRegistry::new(), &PumpRegistry::new()).unwrap();
        bytes[4..8].copy_from_slice(&(FORMAT_VERSION + 1).to_le_bytes());
        assert!(matches!(load(&bytes), Err(LoadError::FutureVersion(_))));
    }

    #[test]
    fn truncated_body_rejected() {
        let (reg, pumps) = populated();
        let bytes = save(&reg, &pumps).unwrap();
        let truncated = &bytes[..bytes.len() - 3];
        assert!(matches!(load(truncated), Err(LoadError::Decode(_))));
    }
}
