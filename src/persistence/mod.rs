pub mod memory;
pub mod snapshot;
pub mod traits;

pub use memory::{MemoryPersistence, WriteEvent};
pub use snapshot::{SnapshotItem, StoreSnapshot};
pub use traits::{CohortStore, ContentStore, DirectiveStore, MigrationStore};
