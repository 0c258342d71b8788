pub mod backend;
pub mod bridge;
pub mod snapshot;
pub mod store;

pub use backend::{ConfiguredBackend, DisabledBackend, HttpBackend, SyncBackend};
pub use bridge::{PersistenceBridge, SyncOutcome};
pub use snapshot::{snapshot_key, SessionSnapshot, SyncPayload};
pub use store::{MemoryStore, SnapshotStore};
