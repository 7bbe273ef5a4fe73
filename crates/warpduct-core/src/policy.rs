//! Per-side role assignment.
//!
//! Every segment keeps a total role table over the six directions. Roles are
//! recomputed from live connectivity on load and on every topology change;
//! the computation is deterministic and idempotent, so repeated notification
//! storms cannot flip a stable configuration. Sides a player has cycled by
//! hand are excluded from auto assignment until explicitly reset.

use crate::direction::{DirMap, DirSet, Direction};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// PortRole
// ---------------------------------------------------------------------------

/// Role of one side of a segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PortRole {
    /// Nothing flows through this side.
    Disabled,
    /// Cargo may enter through this side.
    Input,
    /// Cargo may leave through this side.
    Output,
}

impl PortRole {
    /// The manual cycling order: Disabled -> Input -> Output -> Disabled.
    fn next(self) -> PortRole {
        match self {
            PortRole::Disabled => PortRole::Input,
            PortRole::Input => PortRole::Output,
            PortRole::Output => PortRole::Disabled,
        }
    }
}

// ---------------------------------------------------------------------------
// PortConfig
// ---------------------------------------------------------------------------

/// Role table plus the set of manually-configured sides.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortConfig {
    roles: DirMap<PortRole>,
    manual: DirSet,
}

impl Default for PortConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl PortConfig {
    /// All sides disabled, nothing manual.
    pub fn new() -> Self {
        PortConfig {
            roles: DirMap::filled(PortRole::Disabled),
            manual: DirSet::EMPTY,
        }
    }

    pub fn role(&self, dir: Direction) -> PortRole {
        self.roles[dir]
    }

    pub fn is_manual(&self, dir: Direction) -> bool {
        self.manual.contains(dir)
    }

    /// The sides currently assigned [`PortRole::Output`].
    pub fn outputs(&self) -> DirSet {
        self.roles
            .iter()
            .filter(|(_, r)| **r == PortRole::Output)
            .map(|(d, _)| d)
            .collect()
    }

    /// Recompute auto roles from live connectivity.
    ///
    /// Directions are visited in canonical order. Manual sides keep their
    /// stored role (a manual Input counts toward the first-input rule). Of
    /// the remaining sides, the first connectable one seen while no input is
    /// assigned becomes Input, further connectable ones become Output, and
    /// unconnectable ones become Disabled.
    ///
    /// Idempotent: the result depends only on `connectable`, the manual set,
    /// and the manual sides' stored roles.
    pub fn reconfigure(&mut self, connectable: DirSet) {
        let mut have_input = Direction::ALL
            .into_iter()
            .any(|d| self.manual.contains(d) && self.roles[d] == PortRole::Input);

        for dir in Direction::ALL {
            if self.manual.contains(dir) {
                continue;
            }
            let role = if !connectable.contains(dir) {
                PortRole::Disabled
            } else if !have_input {
                have_input = true;
                PortRole::Input
            } else {
                PortRole::Output
            };
            self.roles.set(dir, role);
        }
    }

    /// Manually cycle one side and pin it against auto assignment.
    /// Returns the new role.
    pub fn cycle_mode(&mut self, dir: Direction) -> PortRole {
        let role = self.roles[dir].next();
        self.roles.set(dir, role);
        self.manual.insert(dir);
        role
    }

    /// Release a side back to auto assignment. The caller is expected to
    /// follow up with [`PortConfig::reconfigure`].
    pub fn clear_manual(&mut self, dir: Direction) {
        self.manual.remove(dir);
    }
}

// ===========================================================================
// Tests
// ===========================================================================
