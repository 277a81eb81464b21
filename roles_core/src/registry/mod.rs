//! Role registry.
//!
//! Holds user roles, capability roles, root users and public capabilities, and
//! answers [`can_call`](RoleRegistry::can_call). Every administrative
//! operation is itself guarded by the registry's own predicate against the
//! registry's address.

pub mod selectors;
mod snapshot;
mod state;

pub use snapshot::{
    CapabilityRolesEntry, PublicCapabilityEntry, RegistrySnapshot, RootUserEntry, UserRolesEntry,
    SNAPSHOT_VERSION,
};

use parking_lot::RwLock;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

use crate::authority::{refuse, Authority};
use crate::bitset::Bitset256;
use crate::config::RegistryConfig;
use crate::error::{RolesError, RolesResult, SnapshotError};
use crate::events::{EventsHistory, EventsSink, RoleEvent, DEFAULT_HISTORY_CAPACITY};
use crate::id::{Address, Capability, Role, Selector};
use state::RegistryState;

/// A shared handle to one registry instance.
///
/// Clones refer to the same state. Each operation runs entirely under the
/// state lock, so concurrent callers observe operations one at a time.
#[derive(Clone)]
pub struct RoleRegistry {
    address: Address,
    state: Arc<RwLock<RegistryState>>,
    events: Arc<RwLock<Arc<dyn EventsSink>>>,
}

impl RoleRegistry {
    /// Create a new registry.
    ///
    /// # Arguments
    ///
    /// * `address` - The registry's own identity, used as the target of its
    ///   administrative capabilities and as the source of its events.
    /// * `deployer` - The principal registered as root at creation.
    ///
    /// Events go to a private [`EventsHistory`] at the registry's address
    /// until [`setup_events_history`](Self::setup_events_history) is called.
    pub fn new(address: Address, deployer: Address) -> Self {
        Self::with_events(
            address,
            deployer,
            Arc::new(EventsHistory::new(address, DEFAULT_HISTORY_CAPACITY)),
        )
    }

    /// Create a new registry emitting into `events`.
    pub fn with_events(address: Address, deployer: Address, events: Arc<dyn EventsSink>) -> Self {
        let mut state = RegistryState::default();
        state.root_users.insert(deployer, true);
        debug!("Created registry {} with root {}", address, deployer);
        Self {
            address,
            state: Arc::new(RwLock::new(state)),
            events: Arc::new(RwLock::new(events)),
        }
    }

    /// Create a registry from the `registry` and `events` config sections.
    pub fn from_config(config: &RegistryConfig) -> Self {
        let events = EventsHistory::new(config.registry.address, config.events.capacity);
        Self::with_events(
            config.registry.address,
            config.registry.deployer,
            Arc::new(events),
        )
    }

    /// Rebuild a registry from a snapshot, emitting into `events`.
    pub fn restore(
        snapshot: RegistrySnapshot,
        events: Arc<dyn EventsSink>,
    ) -> Result<Self, SnapshotError> {
        let address = snapshot.address;
        let state = snapshot.into_state()?;
        debug!("Restored registry {}", address);
        Ok(Self {
            address,
            state: Arc::new(RwLock::new(state)),
            events: Arc::new(RwLock::new(events)),
        })
    }

    /// Copy the current state.
    pub fn snapshot(&self) -> RegistrySnapshot {
        RegistrySnapshot::capture(self.address, &self.state.read())
    }

    pub fn address(&self) -> Address {
        self.address
    }

    fn emit(&self, event: RoleEvent) {
        self.events.read().emit(self.address, event);
    }

    /// Check `caller` against the registry's own capability for `selector`.
    fn authorize(&self, state: &RegistryState, caller: Address, selector: Selector) -> RolesResult<()> {
        let capability = Capability::new(self.address, selector);
        if state.can_call(&caller, &capability) {
            return Ok(());
        }
        Err(refuse(
            self.events.read().as_ref(),
            self.address,
            caller,
            selector,
        ))
    }

    /// Give `user` the role `role`.
    ///
    /// # Returns
    ///
    /// * `Ok(())` - The role was added and `RoleAdded` emitted.
    /// * `Err(Unauthorized)` - `caller` may not add roles.
    /// * `Err(AlreadyExists)` - `user` already holds `role`.
    pub fn add_user_role(&self, caller: Address, user: Address, role: Role) -> RolesResult<()> {
        let mut state = self.state.write();
        self.authorize(&state, caller, *selectors::ADD_USER_ROLE)?;

        let roles = state.user_roles.entry(user).or_default();
        if roles.test(role) {
            debug!("User {} already has role {}", user, role);
            return Err(RolesError::AlreadyExists);
        }
        roles.set(role);

        debug!("Added role {} to user {}", role, user);
        self.emit(RoleEvent::role_added(user, role, self.address));
        Ok(())
    }

    /// Take the role `role` away from `user`.
    ///
    /// # Returns
    ///
    /// * `Ok(())` - The role was removed and `RoleRemoved` emitted.
    /// * `Err(Unauthorized)` - `caller` may not remove roles.
    /// * `Err(NotFound)` - `user` does not hold `role`.
    pub fn remove_user_role(&self, caller: Address, user: Address, role: Role) -> RolesResult<()> {
        let mut state = self.state.write();
        self.authorize(&state, caller, *selectors::REMOVE_USER_ROLE)?;

        match state.user_roles.get_mut(&user) {
            Some(roles) if roles.test(role) => roles.clear(role),
            _ => {
                debug!("User {} does not have role {}", user, role);
                return Err(RolesError::NotFound);
            }
        }

        debug!("Removed role {} from user {}", role, user);
        self.emit(RoleEvent::role_removed(user, role, self.address));
        Ok(())
    }

    pub fn has_user_role(&self, user: Address, role: Role) -> bool {
        self.state.read().user_roles(&user).test(role)
    }

    /// All roles `user` holds.
    pub fn user_roles(&self, user: Address) -> Bitset256 {
        self.state.read().user_roles(&user)
    }

    /// Grant `role` the capability `(target, selector)`.
    ///
    /// # Returns
    ///
    /// * `Ok(())` - The capability was added and `CapabilityAdded` emitted.
    /// * `Err(Unauthorized)` - `caller` may not add capabilities.
    /// * `Err(AlreadyExists)` - `role` already has the capability.
    pub fn add_role_capability(
        &self,
        caller: Address,
        role: Role,
        target: Address,
        selector: Selector,
    ) -> RolesResult<()> {
        let mut state = self.state.write();
        self.authorize(&state, caller, *selectors::ADD_ROLE_CAPABILITY)?;

        let capability = Capability::new(target, selector);
        let roles = state.capability_roles.entry(capability).or_default();
        if roles.test(role) {
            debug!("Role {} already has capability {}", role, capability);
            return Err(RolesError::AlreadyExists);
        }
        roles.set(role);

        debug!("Added capability {} to role {}", capability, role);
        self.emit(RoleEvent::capability_added(role, target, selector, self.address));
        Ok(())
    }

    /// Revoke the capability `(target, selector)` from `role`.
    ///
    /// # Returns
    ///
    /// * `Ok(())` - The capability was removed and `CapabilityRemoved` emitted.
    /// * `Err(Unauthorized)` - `caller` may not remove capabilities.
    /// * `Err(NotFound)` - `role` does not have the capability.
    pub fn remove_role_capability(
        &self,
        caller: Address,
        role: Role,
        target: Address,
        selector: Selector,
    ) -> RolesResult<()> {
        let mut state = self.state.write();
        self.authorize(&state, caller, *selectors::REMOVE_ROLE_CAPABILITY)?;

        let capability = Capability::new(target, selector);
        match state.capability_roles.get_mut(&capability) {
            Some(roles) if roles.test(role) => roles.clear(role),
            _ => {
                debug!("Role {} does not have capability {}", role, capability);
                return Err(RolesError::NotFound);
            }
        }

        debug!("Removed capability {} from role {}", capability, role);
        self.emit(RoleEvent::capability_removed(role, target, selector, self.address));
        Ok(())
    }

    /// Roles that have the capability `(target, selector)`.
    pub fn capability_roles(&self, target: Address, selector: Selector) -> Bitset256 {
        self.state
            .read()
            .capability_roles(&Capability::new(target, selector))
    }

    pub fn role_has_capability(&self, role: Role, target: Address, selector: Selector) -> bool {
        self.capability_roles(target, selector).test(role)
    }

    /// Make `user` bypass (or stop bypassing) every role check.
    pub fn set_root_user(&self, caller: Address, user: Address, enabled: bool) -> RolesResult<()> {
        let mut state = self.state.write();
        self.authorize(&state, caller, *selectors::SET_ROOT_USER)?;

        state.root_users.insert(user, enabled);
        debug!("Set root flag of {} to {}", user, enabled);
        Ok(())
    }

    pub fn is_root_user(&self, user: Address) -> bool {
        self.state.read().is_root(&user)
    }

    /// Open `(target, selector)` to every caller, or close it again.
    ///
    /// Closing emits `PublicCapabilityRemoved`.
    pub fn set_public_capability(
        &self,
        caller: Address,
        target: Address,
        selector: Selector,
        enabled: bool,
    ) -> RolesResult<()> {
        let mut state = self.state.write();
        self.authorize(&state, caller, *selectors::SET_PUBLIC_CAPABILITY)?;

        let capability = Capability::new(target, selector);
        state.public_capabilities.insert(capability, enabled);
        debug!("Set public flag of {} to {}", capability, enabled);
        if !enabled {
            self.emit(RoleEvent::public_capability_removed(target, selector));
        }
        Ok(())
    }

    pub fn is_public_capability(&self, target: Address, selector: Selector) -> bool {
        self.state
            .read()
            .is_public(&Capability::new(target, selector))
    }

    /// Whether `user` may call `selector` on `target`.
    pub fn can_call(&self, user: Address, target: Address, selector: Selector) -> bool {
        self.state
            .read()
            .can_call(&user, &Capability::new(target, selector))
    }

    /// Route this registry's events into `events`.
    pub fn setup_events_history(
        &self,
        caller: Address,
        events: Arc<dyn EventsSink>,
    ) -> RolesResult<()> {
        let state = self.state.read();
        self.authorize(&state, caller, *selectors::SETUP_EVENTS_HISTORY)?;

        debug!(
            "Registry {} now emits into {}",
            self.address,
            events.address()
        );
        *self.events.write() = events;
        Ok(())
    }

    /// Address of the sink currently receiving this registry's events.
    pub fn events_history(&self) -> Address {
        self.events.read().address()
    }
}

impl Authority for RoleRegistry {
    fn can_call(&self, user: Address, target: Address, selector: Selector) -> bool {
        RoleRegistry::can_call(self, user, target, selector)
    }
}

impl fmt::Debug for RoleRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RoleRegistry")
            .field("address", &self.address)
            .field("events_history", &self.events_history())
            .finish()
    }
}
