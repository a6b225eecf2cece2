pub mod config;
pub mod error;
pub mod keys;
pub mod model;
pub mod telemetry;
pub mod time;
pub(crate) mod utils;

// 导出配置
pub use config::{ENROLLMENT_TRACK_PARTITION_ID, InUsePolicy, JobConfig, MigrationConfig, StoreConfig};

// 导出错误类型
pub use error::{MigrationError, Result};

// 导出 Key 类型
pub use keys::{CourseKey, KeyError, LibraryKey, UsageKey};

// 导出核心模型
pub use model::{
    AccessRules, Actor, AssignmentType, CohortGroup, CohortId, ContentItem, CourseRecord,
    EnrollmentTrack, GroupId, GroupUsage, MigrationDirective, PartitionGroup, PartitionGroupLink,
    PartitionId, PublishState, UserPartition, VerifiedTrackBinding, latest_directives,
};

pub use telemetry::init_tracing;
pub use time::TimeUtils;
// 内部工具的快捷访问
pub(crate) use utils::new_run_id;
