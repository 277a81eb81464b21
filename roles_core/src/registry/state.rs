use std::collections::HashMap;

use crate::bitset::Bitset256;
use crate::id::{Address, Capability};

/// The four persistent maps behind a registry.
///
/// Reads for unknown keys return the zero value. Entries are never removed;
/// clearing writes the zero value back.
#[derive(Debug, Clone, Default)]
pub(crate) struct RegistryState {
    pub(crate) user_roles: HashMap<Address, Bitset256>,
    pub(crate) capability_roles: HashMap<Capability, Bitset256>,
    pub(crate) root_users: HashMap<Address, bool>,
    pub(crate) public_capabilities: HashMap<Capability, bool>,
}

impl RegistryState {
    pub(crate) fn user_roles(&self, user: &Address) -> Bitset256 {
        self.user_roles.get(user).copied().unwrap_or_default()
    }

    pub(crate) fn capability_roles(&self, capability: &Capability) -> Bitset256 {
        self.capability_roles
            .get(capability)
            .copied()
            .unwrap_or_default()
    }

    pub(crate) fn is_root(&self, user: &Address) -> bool {
        self.root_users.get(user).copied().unwrap_or(false)
    }

    pub(crate) fn is_public(&self, capability: &Capability) -> bool {
        self.public_capabilities
            .get(capability)
            .copied()
            .unwrap_or(false)
    }

    /// `root[user] || public[capability] || roles[user] & roles[capability] != 0`
    pub(crate) fn can_call(&self, user: &Address, capability: &Capability) -> bool {
        self.is_root(user)
            || self.is_public(capability)
            || !(self.user_roles(user) & self.capability_roles(capability)).is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::id::{Role, Selector};

    #[test]
    fn test_unknown_keys_read_as_zero() {
        let state = RegistryState::default();
        let user = Address::from_low_u64(1);
        let capability = Capability::new(Address::from_low_u64(2), Selector::new([1; 4]));

        assert_eq!(state.user_roles(&user), Bitset256::EMPTY);
        assert_eq!(state.capability_roles(&capability), Bitset256::EMPTY);
        assert!(!state.is_root(&user));
        assert!(!state.is_public(&capability));
        assert!(!state.can_call(&user, &capability));
    }

    #[test]
    fn test_can_call_formula() {
        let mut state = RegistryState::default();
        let user = Address::from_low_u64(1);
        let capability = Capability::new(Address::from_low_u64(2), Selector::new([1; 4]));

        state
            .user_roles
            .insert(user, Bitset256::from_roles([Role(4)]));
        state
            .capability_roles
            .insert(capability, Bitset256::from_roles([Role(5)]));
        assert!(!state.can_call(&user, &capability));

        state
            .capability_roles
            .insert(capability, Bitset256::from_roles([Role(4), Role(5)]));
        assert!(state.can_call(&user, &capability));

        state.capability_roles.insert(capability, Bitset256::EMPTY);
        state.root_users.insert(user, true);
        assert!(state.can_call(&user, &capability));

        state.root_users.insert(user, false);
        state.public_capabilities.insert(capability, true);
        assert!(state.can_call(&Address::from_low_u64(99), &capability));
    }
}
