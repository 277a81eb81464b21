//! On-disk state of the CLI: a registry snapshot plus its event records.

use anyhow::{Context, Result};
use roles_core::{EventRecord, EventsHistory, RegistrySnapshot, RoleRegistry};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateFile {
    pub registry: RegistrySnapshot,
    #[serde(default)]
    pub events: Vec<EventRecord>,
}

impl StateFile {
    pub fn load(path: &Path) -> Result<Self> {
        debug!("Loading state from {:?}", path);
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read state file {}", path.display()))?;
        serde_json::from_str(&json)
            .with_context(|| format!("Failed to parse state file {}", path.display()))
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        debug!("Saving state to {:?}", path);
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)
            .with_context(|| format!("Failed to write state file {}", path.display()))
    }

    /// Capture a registry and the records of its history.
    pub fn capture(registry: &RoleRegistry, history: &EventsHistory) -> Self {
        Self {
            registry: registry.snapshot(),
            events: history.records(),
        }
    }

    /// Rebuild the registry with a history of at most `capacity` records.
    pub fn open(self, capacity: usize) -> Result<(RoleRegistry, EventsHistory)> {
        let history = EventsHistory::new(self.registry.address, capacity);
        history.import(self.events);
        let registry = RoleRegistry::restore(self.registry, Arc::new(history.clone()))
            .context("Failed to restore registry")?;
        Ok((registry, history))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use roles_core::{Address, Role};
    use tempfile::tempdir;

    #[test]
    fn test_save_and_open() {
        let temp_dir = tempdir().unwrap();
        let path = temp_dir.path().join("state.json");

        let address = Address::from_low_u64(0xaa);
        let owner = Address::from_low_u64(0xbb);
        let history = EventsHistory::new(address, 8);
        let registry = RoleRegistry::with_events(address, owner, Arc::new(history.clone()));
        registry.add_user_role(owner, owner, Role(1)).unwrap();

        StateFile::capture(&registry, &history).save(&path).unwrap();

        let (registry, history) = StateFile::load(&path).unwrap().open(8).unwrap();
        assert!(registry.has_user_role(owner, Role(1)));
        assert!(registry.is_root_user(owner));
        assert_eq!(history.named("RoleAdded").len(), 1);
    }

    #[test]
    fn test_load_missing() {
        let temp_dir = tempdir().unwrap();
        assert!(StateFile::load(&temp_dir.path().join("missing.json")).is_err());
    }
}
