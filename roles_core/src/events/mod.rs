mod history;
mod record;

pub use history::{EventsHistory, DEFAULT_HISTORY_CAPACITY, MAX_HISTORY_CAPACITY};
pub use record::EventRecord;

use serde::{Deserialize, Serialize};

use crate::id::{Address, Role, Selector};

/// Notifications emitted by registries and adapters
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event")]
pub enum RoleEvent {
    /// A principal gained a role
    RoleAdded {
        user: Address,
        role: Role,
        /// Registry that made the change
        #[serde(rename = "self")]
        source: Address,
    },
    /// A principal lost a role
    RoleRemoved {
        user: Address,
        role: Role,
        #[serde(rename = "self")]
        source: Address,
    },
    /// A role was granted a capability
    CapabilityAdded {
        role: Role,
        target: Address,
        selector: Selector,
        #[serde(rename = "self")]
        source: Address,
    },
    /// A role lost a capability
    CapabilityRemoved {
        role: Role,
        target: Address,
        selector: Selector,
        #[serde(rename = "self")]
        source: Address,
    },
    /// A capability stopped being public
    PublicCapabilityRemoved { target: Address, selector: Selector },
    /// A guarded call was refused
    AuthFailedError {
        /// The guarding instance
        code: Address,
        /// The refused caller
        sender: Address,
        /// The refused operation
        sig: Selector,
    },
}

impl RoleEvent {
    pub fn role_added(user: Address, role: Role, source: Address) -> Self {
        RoleEvent::RoleAdded { user, role, source }
    }

    pub fn role_removed(user: Address, role: Role, source: Address) -> Self {
        RoleEvent::RoleRemoved { user, role, source }
    }

    pub fn capability_added(role: Role, target: Address, selector: Selector, source: Address) -> Self {
        RoleEvent::CapabilityAdded {
            role,
            target,
            selector,
            source,
        }
    }

    pub fn capability_removed(
        role: Role,
        target: Address,
        selector: Selector,
        source: Address,
    ) -> Self {
        RoleEvent::CapabilityRemoved {
            role,
            target,
            selector,
            source,
        }
    }

    pub fn public_capability_removed(target: Address, selector: Selector) -> Self {
        RoleEvent::PublicCapabilityRemoved { target, selector }
    }

    pub fn auth_failed(code: Address, sender: Address, sig: Selector) -> Self {
        RoleEvent::AuthFailedError { code, sender, sig }
    }

    /// Event name as it appears in the log
    pub fn name(&self) -> &'static str {
        match self {
            RoleEvent::RoleAdded { .. } => "RoleAdded",
            RoleEvent::RoleRemoved { .. } => "RoleRemoved",
            RoleEvent::CapabilityAdded { .. } => "CapabilityAdded",
            RoleEvent::CapabilityRemoved { .. } => "CapabilityRemoved",
            RoleEvent::PublicCapabilityRemoved { .. } => "PublicCapabilityRemoved",
            RoleEvent::AuthFailedError { .. } => "AuthFailedError",
        }
    }

    /// The instance the event is about, for events that carry one
    pub fn source(&self) -> Option<Address> {
        match self {
            RoleEvent::RoleAdded { source, .. }
            | RoleEvent::RoleRemoved { source, .. }
            | RoleEvent::CapabilityAdded { source, .. }
            | RoleEvent::CapabilityRemoved { source, .. } => Some(*source),
            RoleEvent::AuthFailedError { code, .. } => Some(*code),
            RoleEvent::PublicCapabilityRemoved { .. } => None,
        }
    }
}

/// Destination for emitted events.
///
/// A sink may be shared by any number of registries and adapters; each
/// emission carries the emitter's address so records can be told apart.
pub trait EventsSink: Send + Sync {
    /// The address this sink is known by
    fn address(&self) -> Address;

    /// Record one event. Emission never fails from the emitter's side.
    fn emit(&self, emitter: Address, event: RoleEvent);
}
