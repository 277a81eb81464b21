use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use super::RoleEvent;
use crate::id::Address;

/// One emitted event as stored by a sink
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventRecord {
    /// Unique identifier for this record
    pub event_id: Uuid,
    /// When the event was emitted
    pub timestamp: DateTime<Utc>,
    /// Address of the registry or adapter that emitted it
    pub emitter: Address,
    pub event: RoleEvent,
}

impl EventRecord {
    pub fn new(emitter: Address, event: RoleEvent) -> Self {
        Self {
            event_id: Uuid::new_v4(),
            timestamp: Utc::now(),
            emitter,
            event,
        }
    }

    pub fn name(&self) -> &'static str {
        self.event.name()
    }
}

impl fmt::Display for EventRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {} {:?}", self.timestamp, self.emitter, self.event)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::id::Role;

    #[test]
    fn test_record_creation() {
        let emitter = Address::from_low_u64(9);
        let record = EventRecord::new(
            emitter,
            RoleEvent::role_added(Address::from_low_u64(1), Role(3), emitter),
        );
        let other = EventRecord::new(
            emitter,
            RoleEvent::role_added(Address::from_low_u64(1), Role(3), emitter),
        );

        assert_ne!(record.event_id, other.event_id);
        assert_eq!(record.name(), "RoleAdded");
        assert!(record.to_string().contains("RoleAdded"));
        assert!(record.to_string().contains(&emitter.to_string()));
    }
}
