mod cohorts;
mod core;
mod store;

pub use self::core::{MemoryPersistence, WriteEvent};
