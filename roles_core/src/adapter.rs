//! Protected-call adapter.
//!
//! A service embeds a [`RolesAdapter`] and runs each guarded entry point
//! through [`RolesAdapter::protect`]. The adapter resolves the capability
//! `(adapter address, selector)` and asks its registry whether the caller
//! holds it.

use lazy_static::lazy_static;
use parking_lot::RwLock;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

use crate::authority::{refuse, Authority};
use crate::error::RolesResult;
use crate::events::{EventsHistory, EventsSink, DEFAULT_HISTORY_CAPACITY};
use crate::id::{Address, Selector};
pub use crate::registry::selectors::SETUP_EVENTS_HISTORY;

lazy_static! {
    /// Selector guarding [`RolesAdapter::set_roles_registry`]
    pub static ref SET_ROLES_REGISTRY: Selector =
        Selector::from_signature("setRoles2Library(address)");
}

#[derive(Clone)]
pub struct RolesAdapter {
    address: Address,
    deployer: Address,
    registry: Arc<RwLock<Option<Arc<dyn Authority>>>>,
    events: Arc<RwLock<Arc<dyn EventsSink>>>,
}

impl RolesAdapter {
    /// Create an adapter with no registry set.
    ///
    /// Until a registry is set, the only call allowed is `deployer` setting
    /// one.
    pub fn new(address: Address, deployer: Address) -> Self {
        Self {
            address,
            deployer,
            registry: Arc::new(RwLock::new(None)),
            events: Arc::new(RwLock::new(Arc::new(EventsHistory::new(
                address,
                DEFAULT_HISTORY_CAPACITY,
            )))),
        }
    }

    pub fn with_registry(self, registry: Arc<dyn Authority>) -> Self {
        *self.registry.write() = Some(registry);
        self
    }

    pub fn with_events(self, events: Arc<dyn EventsSink>) -> Self {
        *self.events.write() = events;
        self
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn deployer(&self) -> Address {
        self.deployer
    }

    pub fn has_registry(&self) -> bool {
        self.registry.read().is_some()
    }

    /// Address of the sink currently receiving this adapter's events.
    pub fn events_history(&self) -> Address {
        self.events.read().address()
    }

    fn allowed(&self, registry: Option<&Arc<dyn Authority>>, caller: Address, selector: Selector) -> bool {
        match registry {
            Some(registry) => registry.can_call(caller, self.address, selector),
            None => selector == *SET_ROLES_REGISTRY && caller == self.deployer,
        }
    }

    fn check_with(
        &self,
        registry: Option<&Arc<dyn Authority>>,
        caller: Address,
        selector: Selector,
    ) -> RolesResult<()> {
        if self.allowed(registry, caller, selector) {
            debug!("Allowed {} calling {} on {}", caller, selector, self.address);
            return Ok(());
        }
        Err(refuse(
            self.events.read().as_ref(),
            self.address,
            caller,
            selector,
        ))
    }

    /// Check whether `caller` may run the operation identified by `selector`.
    ///
    /// # Returns
    ///
    /// * `Ok(())` - The call may proceed.
    /// * `Err(Unauthorized)` - The call was refused and `AuthFailedError`
    ///   emitted.
    pub fn check(&self, caller: Address, selector: Selector) -> RolesResult<()> {
        let registry = self.registry.read().clone();
        self.check_with(registry.as_ref(), caller, selector)
    }

    /// Run `op` only if `caller` may call `selector`.
    ///
    /// A refused call never runs `op`.
    pub fn protect<T, F>(&self, caller: Address, selector: Selector, op: F) -> RolesResult<T>
    where
        F: FnOnce() -> T,
    {
        self.check(caller, selector)?;
        Ok(op())
    }

    /// Point the adapter at a registry, or unset it with `None`.
    ///
    /// No adapter lock is held while the current registry is consulted, so
    /// an [`Authority`] may read this adapter back.
    pub fn set_roles_registry(
        &self,
        caller: Address,
        registry: Option<Arc<dyn Authority>>,
    ) -> RolesResult<()> {
        self.check(caller, *SET_ROLES_REGISTRY)?;

        debug!(
            "Adapter {} registry {}",
            self.address,
            if registry.is_some() { "set" } else { "unset" }
        );
        *self.registry.write() = registry;
        Ok(())
    }

    /// Route this adapter's events into `events`.
    pub fn setup_events_history(
        &self,
        caller: Address,
        events: Arc<dyn EventsSink>,
    ) -> RolesResult<()> {
        self.check(caller, *SETUP_EVENTS_HISTORY)?;

        debug!("Adapter {} now emits into {}", self.address, events.address());
        *self.events.write() = events;
        Ok(())
    }
}

impl fmt::Debug for RolesAdapter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RolesAdapter")
            .field("address", &self.address)
            .field("deployer", &self.deployer)
            .field("has_registry", &self.has_registry())
            .field("events_history", &self.events_history())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{status_of, StatusCode};
    use crate::events::RoleEvent;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Allows exactly one (user, selector) pair
    struct AllowOne {
        user: Address,
        selector: Selector,
        calls: AtomicUsize,
    }

    impl Authority for AllowOne {
        fn can_call(&self, user: Address, _target: Address, selector: Selector) -> bool {
            self.calls.fetch_add(1, Ordering::SeqCst);
            user == self.user && selector == self.selector
        }
    }

    fn addr(n: u64) -> Address {
        Address::from_low_u64(n)
    }

    fn adapter() -> (RolesAdapter, EventsHistory) {
        let history = EventsHistory::new(addr(0xe0), 32);
        let adapter = RolesAdapter::new(addr(0xad), addr(1)).with_events(Arc::new(history.clone()));
        (adapter, history)
    }

    #[test]
    fn test_deployer_sets_first_registry() {
        let (adapter, history) = adapter();
        assert!(!adapter.has_registry());

        let registry: Arc<dyn Authority> = Arc::new(AllowOne {
            user: addr(2),
            selector: Selector::new([1; 4]),
            calls: AtomicUsize::new(0),
        });
        adapter.set_roles_registry(addr(1), Some(registry)).unwrap();
        assert!(adapter.has_registry());
        assert!(history.is_empty());
    }

    #[test]
    fn test_non_deployer_cannot_set_first_registry() {
        let (adapter, history) = adapter();
        let registry: Arc<dyn Authority> = Arc::new(AllowOne {
            user: addr(2),
            selector: Selector::new([1; 4]),
            calls: AtomicUsize::new(0),
        });

        let result = adapter.set_roles_registry(addr(2), Some(registry));
        assert_eq!(status_of(&result), StatusCode::Unauthorized);
        assert!(!adapter.has_registry());
        assert_eq!(
            history.named("AuthFailedError"),
            vec![RoleEvent::auth_failed(addr(0xad), addr(2), *SET_ROLES_REGISTRY)]
        );
    }

    #[test]
    fn test_without_registry_everything_else_is_refused() {
        let (adapter, history) = adapter();
        let result = adapter.check(addr(1), Selector::new([1; 4]));
        assert!(result.unwrap_err().is_unauthorized());
        assert_eq!(history.len(), 1);
    }

    #[test]
    fn test_protect_runs_op_only_when_allowed() {
        let (adapter, history) = adapter();
        let sel = Selector::new([7; 4]);
        let authority = Arc::new(AllowOne {
            user: addr(2),
            selector: sel,
            calls: AtomicUsize::new(0),
        });
        let adapter = adapter.with_registry(authority.clone());

        let mut ran = 0;
        assert_eq!(adapter.protect(addr(2), sel, || { ran += 1; 42 }), Ok(42));
        let result = adapter.protect(addr(3), sel, || ran += 1);
        assert_eq!(status_of(&result), StatusCode::Unauthorized);
        assert_eq!(ran, 1);
        assert_eq!(authority.calls.load(Ordering::SeqCst), 2);

        let records = history.records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].emitter, addr(0xad));
        assert_eq!(records[0].event, RoleEvent::auth_failed(addr(0xad), addr(3), sel));
    }

    #[test]
    fn test_unset_registry() {
        let (adapter, _history) = adapter();
        let authority = Arc::new(AllowOne {
            user: addr(1),
            selector: *SET_ROLES_REGISTRY,
            calls: AtomicUsize::new(0),
        });
        let adapter = adapter.with_registry(authority);

        adapter.set_roles_registry(addr(1), None).unwrap();
        assert!(!adapter.has_registry());

        // Back to the primordial rule
        adapter
            .set_roles_registry(
                addr(1),
                Some(Arc::new(AllowOne {
                    user: addr(9),
                    selector: Selector::new([0; 4]),
                    calls: AtomicUsize::new(0),
                })),
            )
            .unwrap();
        assert!(adapter.has_registry());
    }

    #[test]
    fn test_setup_events_history() {
        let (adapter, old) = adapter();
        let authority = Arc::new(AllowOne {
            user: addr(1),
            selector: *SETUP_EVENTS_HISTORY,
            calls: AtomicUsize::new(0),
        });
        let adapter = adapter.with_registry(authority);
        let new = EventsHistory::new(addr(0xe1), 32);

        let result = adapter.setup_events_history(addr(2), Arc::new(new.clone()));
        assert_eq!(status_of(&result), StatusCode::Unauthorized);
        assert_eq!(adapter.events_history(), addr(0xe0));
        assert_eq!(old.len(), 1);

        adapter
            .setup_events_history(addr(1), Arc::new(new.clone()))
            .unwrap();
        assert_eq!(adapter.events_history(), addr(0xe1));

        let _ = adapter.check(addr(2), Selector::new([5; 4]));
        assert_eq!(new.len(), 1);
        assert_eq!(old.len(), 1);
    }

    /// Allows `user` only while the adapter it guards has a registry
    struct ReadsAdapterBack {
        adapter: RolesAdapter,
        user: Address,
    }

    impl Authority for ReadsAdapterBack {
        fn can_call(&self, user: Address, _target: Address, _selector: Selector) -> bool {
            self.adapter.has_registry() && user == self.user
        }
    }

    #[test]
    fn test_authority_may_read_adapter_while_registry_changes() {
        let (adapter, history) = adapter();
        let authority = Arc::new(ReadsAdapterBack {
            adapter: adapter.clone(),
            user: addr(2),
        });
        let adapter = adapter.with_registry(authority.clone());

        let result = adapter.set_roles_registry(addr(3), None);
        assert_eq!(status_of(&result), StatusCode::Unauthorized);
        assert_eq!(history.len(), 1);

        adapter.set_roles_registry(addr(2), Some(authority)).unwrap();
        adapter.set_roles_registry(addr(2), None).unwrap();
        assert!(!adapter.has_registry());
    }

    #[test]
    fn test_default_events_history_is_self() {
        let adapter = RolesAdapter::new(addr(0xad), addr(1));
        assert_eq!(adapter.events_history(), addr(0xad));
    }
}
