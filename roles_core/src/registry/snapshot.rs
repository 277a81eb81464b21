//! Serializable copy of a registry's state.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::debug;

use super::state::RegistryState;
use crate::bitset::Bitset256;
use crate::error::SnapshotError;
use crate::id::{Address, Capability};

pub const SNAPSHOT_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRolesEntry {
    pub user: Address,
    pub roles: Bitset256,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapabilityRolesEntry {
    pub capability: Capability,
    pub roles: Bitset256,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RootUserEntry {
    pub user: Address,
    pub enabled: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicCapabilityEntry {
    pub capability: Capability,
    pub enabled: bool,
}

/// Point-in-time copy of a registry.
///
/// Entry lists are sorted by key so equal states serialize identically.
/// Zero-valued entries are kept as they are in the live maps.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistrySnapshot {
    pub version: u32,
    pub address: Address,
    #[serde(default)]
    pub user_roles: Vec<UserRolesEntry>,
    #[serde(default)]
    pub capability_roles: Vec<CapabilityRolesEntry>,
    #[serde(default)]
    pub root_users: Vec<RootUserEntry>,
    #[serde(default)]
    pub public_capabilities: Vec<PublicCapabilityEntry>,
}

impl RegistrySnapshot {
    pub(crate) fn capture(address: Address, state: &RegistryState) -> Self {
        let mut user_roles: Vec<_> = state
            .user_roles
            .iter()
            .map(|(user, roles)| UserRolesEntry {
                user: *user,
                roles: *roles,
            })
            .collect();
        user_roles.sort_by_key(|e| e.user);

        let mut capability_roles: Vec<_> = state
            .capability_roles
            .iter()
            .map(|(capability, roles)| CapabilityRolesEntry {
                capability: *capability,
                roles: *roles,
            })
            .collect();
        capability_roles.sort_by_key(|e| e.capability);

        let mut root_users: Vec<_> = state
            .root_users
            .iter()
            .map(|(user, enabled)| RootUserEntry {
                user: *user,
                enabled: *enabled,
            })
            .collect();
        root_users.sort_by_key(|e| e.user);

        let mut public_capabilities: Vec<_> = state
            .public_capabilities
            .iter()
            .map(|(capability, enabled)| PublicCapabilityEntry {
                capability: *capability,
                enabled: *enabled,
            })
            .collect();
        public_capabilities.sort_by_key(|e| e.capability);

        Self {
            version: SNAPSHOT_VERSION,
            address,
            user_roles,
            capability_roles,
            root_users,
            public_capabilities,
        }
    }

    pub(crate) fn into_state(self) -> Result<RegistryState, SnapshotError> {
        if self.version != SNAPSHOT_VERSION {
            return Err(SnapshotError::UnsupportedVersion(self.version));
        }
        Ok(RegistryState {
            user_roles: self
                .user_roles
                .into_iter()
                .map(|e| (e.user, e.roles))
                .collect(),
            capability_roles: self
                .capability_roles
                .into_iter()
                .map(|e| (e.capability, e.roles))
                .collect(),
            root_users: self
                .root_users
                .into_iter()
                .map(|e| (e.user, e.enabled))
                .collect(),
            public_capabilities: self
                .public_capabilities
                .into_iter()
                .map(|e| (e.capability, e.enabled))
                .collect(),
        })
    }

    /// Load a snapshot from a JSON file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, SnapshotError> {
        let path = path.as_ref();
        debug!("Loading registry snapshot from {:?}", path);
        let json = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&json)?)
    }

    /// Write the snapshot to a JSON file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), SnapshotError> {
        let path = path.as_ref();
        debug!("Saving registry snapshot to {:?}", path);
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::id::{Role, Selector};
    use tempfile::tempdir;

    fn sample_state() -> RegistryState {
        let mut state = RegistryState::default();
        let capability = Capability::new(Address::from_low_u64(7), Selector::new([9; 4]));
        state
            .user_roles
            .insert(Address::from_low_u64(2), Bitset256::from_roles([Role(1)]));
        // Cleared entries stay as zero values
        state
            .user_roles
            .insert(Address::from_low_u64(1), Bitset256::EMPTY);
        state
            .capability_roles
            .insert(capability, Bitset256::from_roles([Role(1)]));
        state.root_users.insert(Address::from_low_u64(3), true);
        state.public_capabilities.insert(capability, false);
        state
    }

    #[test]
    fn test_capture_is_sorted_and_keeps_zero_entries() {
        let snapshot = RegistrySnapshot::capture(Address::from_low_u64(100), &sample_state());
        assert_eq!(snapshot.version, SNAPSHOT_VERSION);
        assert_eq!(snapshot.user_roles.len(), 2);
        assert_eq!(snapshot.user_roles[0].user, Address::from_low_u64(1));
        assert_eq!(snapshot.user_roles[0].roles, Bitset256::EMPTY);
        assert_eq!(snapshot.public_capabilities.len(), 1);
        assert!(!snapshot.public_capabilities[0].enabled);
    }

    #[test]
    fn test_save_and_load() {
        let temp_dir = tempdir().unwrap();
        let path = temp_dir.path().join("snapshot.json");
        let snapshot = RegistrySnapshot::capture(Address::from_low_u64(100), &sample_state());

        snapshot.save(&path).unwrap();
        let loaded = RegistrySnapshot::load(&path).unwrap();
        assert_eq!(loaded, snapshot);

        let state = loaded.into_state().unwrap();
        assert!(state.is_root(&Address::from_low_u64(3)));
        assert!(state.user_roles.contains_key(&Address::from_low_u64(1)));
    }

    #[test]
    fn test_rejects_unknown_version() {
        let mut snapshot = RegistrySnapshot::capture(Address::from_low_u64(100), &sample_state());
        snapshot.version = 99;
        assert!(matches!(
            snapshot.into_state(),
            Err(SnapshotError::UnsupportedVersion(99))
        ));
    }

    #[test]
    fn test_load_missing_file() {
        let temp_dir = tempdir().unwrap();
        let result = RegistrySnapshot::load(temp_dir.path().join("missing.json"));
        assert!(matches!(result, Err(SnapshotError::Io(_))));
    }
}
