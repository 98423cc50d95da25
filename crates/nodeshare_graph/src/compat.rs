// SPDX-License-Identifier: MIT OR Apache-2.0
//! Version compatibility fixing.
//!
//! Host releases occasionally insert sockets into an existing node type,
//! which moves every later socket to a higher index. A document written by
//! one release and read by another then points its defaults and links at
//! the wrong sockets. Each [`Migration`] describes one such insertion and
//! can move a document across it in either direction.
//!
//! The fixer is a pure function of `(producer, consumer, document)`.
//! Upgrades run in ascending boundary order and downgrades in descending
//! order, so crossing several boundaries is the same as crossing them one
//! at a time.

use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::document::TreeDocument;
use crate::error::MigrationError;

/// A host application version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct HostVersion {
    /// Major component
    pub major: u32,
    /// Minor component
    pub minor: u32,
    /// Patch component
    pub patch: u32,
}

impl HostVersion {
    /// Create a version.
    pub const fn new(major: u32, minor: u32, patch: u32) -> Self {
        Self { major, minor, patch }
    }
}

impl fmt::Display for HostVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

/// Error parsing a dotted version string.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid host version {0:?}, expected MAJOR.MINOR.PATCH")]
pub struct ParseVersionError(pub String);

impl FromStr for HostVersion {
    type Err = ParseVersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts = s
            .split('.')
            .map(str::parse::<u32>)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|_| ParseVersionError(s.to_string()))?;
        match parts[..] {
            [major, minor, patch] => Ok(Self::new(major, minor, patch)),
            [major, minor] => Ok(Self::new(major, minor, 0)),
            _ => Err(ParseVersionError(s.to_string())),
        }
    }
}

/// Producers at or below this version are never migrated.
pub const OLDEST_MIGRATABLE: HostVersion = HostVersion::new(2, 80, 0);

/// Input sockets inserted into one node type at one host release.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Migration {
    /// Name used in logs and reports
    pub name: &'static str,
    /// Node type whose inputs moved
    pub node_type: &'static str,
    /// First host release with the new layout
    pub boundary: HostVersion,
    /// Index of the first inserted socket
    pub index: usize,
    /// Number of inserted sockets
    pub count: usize,
    /// Number of input sockets before the insertion
    pub slots_before: usize,
}

/// Which way a document crosses a migration boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Older producer, newer consumer
    Upgrade,
    /// Newer producer, older consumer
    Downgrade,
}

/// The built-in migrations, ordered by boundary.
pub const MIGRATIONS: &[Migration] = &[
    // Emission Strength added at slot 18
    Migration {
        name: "principled_emission_strength",
        node_type: "ShaderNodeBsdfPrincipled",
        boundary: HostVersion::new(2, 91, 0),
        index: 18,
        count: 1,
        slots_before: 22,
    },
    // Subsurface IOR and Subsurface Anisotropy added at slots 4 and 5
    Migration {
        name: "principled_subsurface_ior_anisotropy",
        node_type: "ShaderNodeBsdfPrincipled",
        boundary: HostVersion::new(3, 0, 0),
        index: 4,
        count: 2,
        slots_before: 23,
    },
];

impl Migration {
    /// Whether a document crosses this boundary, and which way.
    pub fn direction(&self, producer: HostVersion, consumer: HostVersion) -> Option<Direction> {
        if OLDEST_MIGRATABLE < producer && producer < self.boundary && self.boundary <= consumer {
            Some(Direction::Upgrade)
        } else if consumer < self.boundary && self.boundary <= producer {
            Some(Direction::Downgrade)
        } else {
            None
        }
    }

    /// Number of input sockets the node type has on the producer side.
    fn slots_on_input_side(&self, direction: Direction) -> usize {
        match direction {
            Direction::Upgrade => self.slots_before,
            Direction::Downgrade => self.slots_before + self.count,
        }
    }

    /// New index of a socket, `None` if the socket does not exist afterwards.
    pub fn map_slot(&self, slot: usize, direction: Direction) -> Option<usize> {
        match direction {
            Direction::Upgrade if slot >= self.index => Some(slot + self.count),
            Direction::Downgrade if slot >= self.index + self.count => Some(slot - self.count),
            Direction::Downgrade if slot >= self.index => None,
            _ => Some(slot),
        }
    }

    /// Apply this migration to one tree (not its groups).
    pub fn apply(&self, tree: &mut TreeDocument, direction: Direction, report: &mut FixReport) {
        let expected = self.slots_on_input_side(direction);
        let mut migrated = HashSet::new();

        for node in tree.nodes.values_mut().filter(|n| n.type_id == self.node_type) {
            if let Some(&slot) = node.inputs.keys().find(|slot| **slot >= expected) {
                tracing::warn!(
                    "{}: skipping node {:?}, input slot {} exceeds the {} slot layout",
                    self.name,
                    node.name,
                    slot,
                    expected
                );
                report.skipped.push(MigrationError::SlotOutOfRange {
                    migration: self.name,
                    node: node.name.clone(),
                    slot,
                    expected,
                });
                continue;
            }

            let inputs = std::mem::take(&mut node.inputs);
            node.inputs = inputs
                .into_iter()
                .filter_map(|(slot, value)| self.map_slot(slot, direction).map(|slot| (slot, value)))
                .collect::<BTreeMap<_, _>>();
            migrated.insert(node.name.clone());
        }

        if migrated.is_empty() {
            return;
        }

        for node in tree.nodes.values_mut() {
            let source = node.name.clone();
            for (output, links) in node.outputs.iter_mut() {
                links.retain(|target, ids| {
                    if !migrated.contains(target) {
                        return true;
                    }
                    ids.remap(|slot| {
                        let mapped = self.map_slot(slot, direction);
                        if mapped.is_none() {
                            report.skipped.push(MigrationError::RemovedSlotLinked {
                                migration: self.name,
                                from: source.clone(),
                                output: *output,
                                to: target.clone(),
                                slot,
                            });
                        }
                        mapped
                    })
                });
            }
            node.outputs.retain(|_, links| !links.is_empty());
        }

        report.nodes_migrated += migrated.len();
    }
}

/// What a fix did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FixReport {
    /// Migrations applied, in order, with their direction
    pub applied: Vec<(&'static str, Direction)>,
    /// Node migrations across all trees
    pub nodes_migrated: usize,
    /// Items left alone or dropped
    pub skipped: Vec<MigrationError>,
}

impl FixReport {
    /// Whether the document was left untouched.
    pub fn is_noop(&self) -> bool {
        self.applied.is_empty()
    }
}

/// Applies a migration table to documents.
#[derive(Debug, Clone)]
pub struct CompatFixer {
    migrations: Vec<Migration>,
}

impl Default for CompatFixer {
    fn default() -> Self {
        Self::new(MIGRATIONS.to_vec())
    }
}

impl CompatFixer {
    /// Fixer over a custom migration table.
    pub fn new(mut migrations: Vec<Migration>) -> Self {
        migrations.sort_by_key(|m| m.boundary);
        Self { migrations }
    }

    /// Migrations in boundary order.
    pub fn migrations(&self) -> &[Migration] {
        &self.migrations
    }

    /// Migrations to cross from `producer` to `consumer`, in application order.
    pub fn plan(&self, producer: HostVersion, consumer: HostVersion) -> Vec<(&Migration, Direction)> {
        let mut steps: Vec<_> = self
            .migrations
            .iter()
            .filter_map(|m| m.direction(producer, consumer).map(|d| (m, d)))
            .collect();
        if consumer < producer {
            steps.reverse();
        }
        steps
    }

    /// Rewrite `document` (every tree and group) for `consumer`.
    pub fn fix(&self, producer: HostVersion, consumer: HostVersion, document: &mut TreeDocument) -> FixReport {
        let mut report = FixReport::default();
        if producer == consumer {
            return report;
        }
        if producer <= OLDEST_MIGRATABLE && consumer > producer {
            tracing::warn!("Document from {} predates {}, not migrating", producer, OLDEST_MIGRATABLE);
        }

        for (migration, direction) in self.plan(producer, consumer) {
            tracing::info!(
                "Applying {} ({:?}) for {} -> {}",
                migration.name,
                direction,
                producer,
                consumer
            );
            migration.apply(document, direction, &mut report);
            for group in document.groups.values_mut() {
                migration.apply(group, direction, &mut report);
            }
            report.applied.push((migration.name, direction));
        }
        report
    }
}

/// Fix with the built-in migration table.
pub fn fix(producer: HostVersion, consumer: HostVersion, document: &mut TreeDocument) -> FixReport {
    CompatFixer::default().fix(producer, consumer, document)
}
