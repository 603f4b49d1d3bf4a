//! Validated set of migration steps keyed by version.

use super::step::MigrationStep;
use crate::error::RegistryError;
use std::collections::BTreeMap;

/// Every migration step, exactly one per version from 1 to the current
/// version.
///
/// Built once and handed to [`super::Migrator`]; construction rejects empty,
/// duplicated, out-of-range, or gapped version sets before any store is
/// opened.
#[derive(Debug)]
pub struct StepRegistry {
    steps: BTreeMap<i32, MigrationStep>,
}

impl StepRegistry {
    pub fn new(steps: Vec<MigrationStep>) -> Result<Self, RegistryError> {
        if steps.is_empty() {
            return Err(RegistryError::Empty);
        }

        let mut by_version: BTreeMap<i32, MigrationStep> = BTreeMap::new();
        for step in steps {
            if step.version() < 1 {
                return Err(RegistryError::InvalidVersion {
                    version: step.version(),
                    name: step.name().to_string(),
                });
            }
            if let Some(existing) = by_version.get(&step.version()) {
                return Err(RegistryError::DuplicateVersion {
                    version: step.version(),
                    first: existing.name().to_string(),
                    second: step.name().to_string(),
                });
            }
            by_version.insert(step.version(), step);
        }

        let max = by_version.keys().next_back().copied().unwrap_or(0);
        if let Some(version) = (1..=max).find(|v| !by_version.contains_key(v)) {
            return Err(RegistryError::MissingVersion { version });
        }

        Ok(Self { steps: by_version })
    }

    /// All steps in ascending version order.
    pub fn steps_by_version(&self) -> &BTreeMap<i32, MigrationStep> {
        &self.steps
    }

    pub fn step(&self, version: i32) -> Option<&MigrationStep> {
        self.steps.get(&version)
    }

    /// Highest declared version; the version a fully migrated store is at.
    pub fn current_version(&self) -> i32 {
        self.steps.keys().next_back().copied().unwrap_or(0)
    }
}

#[cfg(test)]
#[path = "registry_test.rs"]
mod tests;
