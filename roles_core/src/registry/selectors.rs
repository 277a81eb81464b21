//! Selectors of the registry's guarded operations.
//!
//! Granting a role one of these capabilities on the registry's own address
//! delegates the matching administrative operation to holders of that role.

use lazy_static::lazy_static;

use crate::id::Selector;

lazy_static! {
    pub static ref ADD_USER_ROLE: Selector = Selector::from_signature("addUserRole(address,uint8)");
    pub static ref REMOVE_USER_ROLE: Selector =
        Selector::from_signature("removeUserRole(address,uint8)");
    pub static ref ADD_ROLE_CAPABILITY: Selector =
        Selector::from_signature("addRoleCapability(uint8,address,bytes4)");
    pub static ref REMOVE_ROLE_CAPABILITY: Selector =
        Selector::from_signature("removeRoleCapability(uint8,address,bytes4)");
    pub static ref SET_ROOT_USER: Selector = Selector::from_signature("setRootUser(address,bool)");
    pub static ref SET_PUBLIC_CAPABILITY: Selector =
        Selector::from_signature("setPublicCapability(address,bytes4,bool)");
    pub static ref SETUP_EVENTS_HISTORY: Selector =
        Selector::from_signature("setupEventsHistory(address)");
}

/// Every guarded registry selector with its signature
pub fn all() -> Vec<(&'static str, Selector)> {
    vec![
        ("addUserRole(address,uint8)", *ADD_USER_ROLE),
        ("removeUserRole(address,uint8)", *REMOVE_USER_ROLE),
        ("addRoleCapability(uint8,address,bytes4)", *ADD_ROLE_CAPABILITY),
        ("removeRoleCapability(uint8,address,bytes4)", *REMOVE_ROLE_CAPABILITY),
        ("setRootUser(address,bool)", *SET_ROOT_USER),
        ("setPublicCapability(address,bytes4,bool)", *SET_PUBLIC_CAPABILITY),
        ("setupEventsHistory(address)", *SETUP_EVENTS_HISTORY),
    ]
}
