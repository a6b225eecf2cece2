pub mod builder;
pub mod job;
pub mod partitions;
pub mod prune;
pub mod report;
pub mod rewrite;

pub use builder::MigrationJobBuilder;
pub use job::CohortMigrationJob;
pub use partitions::{PartitionService, PartitionUsage};
pub use prune::{PruneOutcome, prune_groups};
pub use report::{CourseReport, GroupRef, MigrationReport};
pub use rewrite::{RewriteDecision, SkipReason, TrackTarget, plan_rewrite};
