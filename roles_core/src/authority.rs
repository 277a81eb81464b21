//! The authorization predicate guarded code depends on.

use tracing::warn;

use crate::error::RolesError;
use crate::events::{EventsSink, RoleEvent};
use crate::id::{Address, Capability, Selector};

/// Decides whether `user` may call `selector` on `target`.
///
/// The adapter only ever talks to a registry through this trait, so any
/// implementation (a [`RoleRegistry`](crate::RoleRegistry), a test double)
/// can stand in for one.
pub trait Authority: Send + Sync {
    fn can_call(&self, user: Address, target: Address, selector: Selector) -> bool;
}

/// Record a refused call on `code` and build the matching error.
pub(crate) fn refuse(
    sink: &dyn EventsSink,
    code: Address,
    caller: Address,
    selector: Selector,
) -> RolesError {
    warn!("Refused {} calling {} on {}", caller, selector, code);
    sink.emit(code, RoleEvent::auth_failed(code, caller, selector));
    RolesError::Unauthorized {
        caller,
        capability: Capability::new(code, selector),
    }
}
