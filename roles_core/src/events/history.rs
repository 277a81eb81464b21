use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::debug;

use super::{EventRecord, EventsSink, RoleEvent};
use crate::id::Address;

pub const DEFAULT_HISTORY_CAPACITY: usize = 1024;

/// Largest number of records a history keeps.
pub const MAX_HISTORY_CAPACITY: usize = 1 << 20;

/// A shared, bounded, in-memory event log.
///
/// Clones share the same records. When full, the oldest record is dropped.
#[derive(Debug, Clone)]
pub struct EventsHistory {
    address: Address,
    capacity: usize,
    records: Arc<Mutex<VecDeque<EventRecord>>>,
    notifier: broadcast::Sender<EventRecord>,
}

impl EventsHistory {
    /// Create a new events history known by `address`, keeping at most
    /// `capacity` records (clamped to `1..=MAX_HISTORY_CAPACITY`)
    pub fn new(address: Address, capacity: usize) -> Self {
        let capacity = capacity.clamp(1, MAX_HISTORY_CAPACITY);
        // Subscribers lagging further than this miss records
        let (notifier, _) = broadcast::channel(capacity.min(DEFAULT_HISTORY_CAPACITY));
        Self {
            address,
            capacity,
            records: Arc::new(Mutex::new(VecDeque::new())),
            notifier,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    fn push(&self, record: EventRecord) {
        let mut records = self.records.lock();
        if records.len() >= self.capacity {
            records.pop_front();
        }
        records.push_back(record);
    }

    /// Append previously stored records without notifying subscribers
    pub fn import<I: IntoIterator<Item = EventRecord>>(&self, records: I) {
        for record in records {
            self.push(record);
        }
    }

    /// Get all records, oldest first
    pub fn records(&self) -> Vec<EventRecord> {
        self.records.lock().iter().cloned().collect()
    }

    /// Get records emitted by one registry or adapter
    pub fn records_from(&self, emitter: Address) -> Vec<EventRecord> {
        self.records
            .lock()
            .iter()
            .filter(|r| r.emitter == emitter)
            .cloned()
            .collect()
    }

    /// Get records of one event kind, e.g. `"RoleAdded"`
    pub fn named(&self, name: &str) -> Vec<RoleEvent> {
        self.records
            .lock()
            .iter()
            .filter(|r| r.name() == name)
            .map(|r| r.event.clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.lock().is_empty()
    }

    pub fn clear(&self) {
        self.records.lock().clear();
    }

    /// Receive every record emitted from now on
    pub fn subscribe(&self) -> broadcast::Receiver<EventRecord> {
        self.notifier.subscribe()
    }
}

impl EventsSink for EventsHistory {
    fn address(&self) -> Address {
        self.address
    }

    fn emit(&self, emitter: Address, event: RoleEvent) {
        let record = EventRecord::new(emitter, event);
        debug!("Emitting {} from {} into {}", record.name(), emitter, self.address);
        self.push(record.clone());
        // No subscribers is fine
        let _ = self.notifier.send(record);
    }
}
