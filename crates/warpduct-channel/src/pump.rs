//! The pump registry: remote activation of extraction endpoints.
//!
//! A small independent registry mapping a frequency to the set of extraction
//! endpoints listening on it plus one pumping-enabled flag. A remote
//! controller flips the flag; every extraction endpoint consults it each
//! tick. Unknown frequencies read as disabled.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use warpduct_core::pos::GlobalPos;

/// Membership and the enabled flag for one frequency.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PumpChannel {
    pub members: Vec<GlobalPos>,
    pub enabled: bool,
}

/// Frequency -> (extraction-endpoint membership, pumping-enabled flag).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PumpRegistry {
    channels: BTreeMap<i32, PumpChannel>,
}

impl PumpRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an endpoint to a frequency's membership. Idempotent.
    pub fn register_endpoint(&mut self, freq: i32, at: GlobalPos) {
        let channel = self.channels.entry(freq).or_default();
        if !channel.members.contains(&at) {
            channel.members.push(at);
        }
    }

    /// Remove an endpoint from a frequency's membership. Idempotent; a
    /// drained, disabled channel is dropped entirely.
    pub fn unregister(&mut self, freq: i32, at: GlobalPos) {
        if let Some(channel) = self.channels.get_mut(&freq) {
            channel.members.retain(|m| *m != at);
            if channel.members.is_empty() && !channel.enabled {
                self.channels.remove(&freq);
            }
        }
    }

    /// Remove an endpoint from every frequency (segment teardown).
    pub fn unregister_everywhere(&mut self, at: GlobalPos) {
        self.channels
            .values_mut()
            .for_each(|c| c.members.retain(|m| *m != at));
        self.channels
            .retain(|_, c| !c.members.is_empty() || c.enabled);
    }

    /// Whether pumping is on for `freq`. Unknown frequencies are off.
    pub fn is_pumping_enabled(&self, freq: i32) -> bool {
        self.channels.get(&freq).map(|c| c.enabled).unwrap_or(false)
    }

    /// Remote-controller mutation of the enabled flag.
    pub fn set_pumping_enabled(&mut self, freq: i32, enabled: bool) {
        if enabled {
            self.channels.entry(freq).or_default().enabled = true;
            log::debug!("pumping enabled on frequency {freq}");
        } else if let Some(channel) = self.channels.get_mut(&freq) {
            channel.enabled = false;
            log::debug!("pumping disabled on frequency {freq}");
            if channel.members.is_empty() {
                self.channels.remove(&freq);
            }
        }
    }

    /// The endpoints listening on `freq`, in registration order.
    pub fn members(&self, freq: i32) -> &[GlobalPos] {
        self.channels
            .get(&freq)
            .map(|c| c.members.as_slice())
            .unwrap_or(&[])
    }

    /// Iterate all (frequency, channel) pairs.
    pub fn channels(&self) -> impl Iterator<Item = (i32, &PumpChannel)> {
        self.channels.iter().map(|(freq, c)| (*freq, c))
    }
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use warpduct_core::pos::{CellPos, RealmId};

    fn at(x: i32) -> GlobalPos {
        GlobalPos::new(RealmId(0), CellPos::new(x, 0, 0))
    }

    #[test]
    fn unknown_frequency_is_disabled() {
        let pumps = PumpRegistry::new();
        assert!(!pumps.is_pumping_enabled(42));
    }

    #[test]
    fn toggle_enabled() {
        let mut pumps = PumpRegistry::new();
        pumps.set_pumping_enabled(3, true);
        assert!(pumps.is_pumping_enabled(3));
        pumps.set_pumping_enabled(3, false);
        assert!(!pumps.is_pumping_enabled(3));
    }

    #[test]
    fn registration_is_idempotent() {
        let mut pumps = PumpRegistry::new();
        pumps.register_endpoint(1, at(0));
        pumps.register_endpoint(1, at(0));
        assert_eq!(pumps.members(1).len(), 1);
    }

    #[test]
    fn frequency_change_re_registers() {
        let mut pumps = PumpRegistry::new();
        pumps.register_endpoint(1, at(0));
        // The endpoint's frequency setting changes: unregister old, register new.
        pumps.unregister(1, at(0));
        pumps.register_endpoint(2, at(0));

        assert!(pumps.members(1).is_empty());
        assert_eq!(pumps.members(2), &[at(0)]);
    }

    #[test]
    fn drained_disabled_channel_is_dropped() {
        let mut pumps = PumpRegistry::new();
        pumps.register_endpoint(1, at(0));
        pumps.unregister(1, at(0));
        assert_eq!(pumps.channels().count(), 0);
    }

    #[test]
    fn enabled_flag_survives_empty_membership() {
        let mut pumps = PumpRegistry::new();
        pumps.set_pumping_enabled(5, true);
        pumps.register_endpoint(5, at(1));
        pumps.unregister(5, at(1));
        // The controller's setting outlives the membership.
        assert!(pumps.is_pumping_enabled(5));
    }

    #[test]
    fn unregister_everywhere_clears_teardown() {
        let mut pumps = PumpRegistry::new();
        pumps.register_endpoint(1, at(0));
        pumps.register_endpoint(2, at(0));
        pumps.register_endpoint(2, at(1));
        pumps.unregister_everywhere(at(0));

        assert!(pumps.members(1).is_empty());
        assert_eq!(pumps.members(2), &[at(1)]);
    }
}
