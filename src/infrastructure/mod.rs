pub mod cleanup;
pub mod store;

pub use cleanup::{spawn_cleanup_coordinator, CleanupCoordinator, CleanupSchedule};
pub use store::{connect_store, KvStore, MemoryStore, RedisStore, SharedStore, StoreError};
