// 1. 基础模块
pub mod common;

// 2. 存储接口与实现
pub mod persistence;

// 3. 迁移核心
pub mod migration;

pub use common::{MigrationConfig, MigrationError, Result};
pub use migration::{CohortMigrationJob, MigrationJobBuilder, MigrationReport};
pub use persistence::{MemoryPersistence, StoreSnapshot};
