pub mod adapter;
pub mod authority;
pub mod bitset;
pub mod config;
pub mod error;
pub mod events;
pub mod id;
pub mod registry;

pub use adapter::RolesAdapter;
pub use authority::Authority;
pub use bitset::Bitset256;
pub use config::{load_config, RegistryConfig};
pub use error::{
    status_of, ConfigError, ParseIdError, RolesError, RolesResult, SnapshotError, StatusCode,
};
pub use events::{EventRecord, EventsHistory, EventsSink, RoleEvent};
pub use id::{parse_capability, Address, Capability, Role, Selector};
pub use registry::{RegistrySnapshot, RoleRegistry};
