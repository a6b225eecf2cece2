use thiserror::Error;

use crate::common::model::{CohortId, GroupId, GroupUsage, PartitionId};

/// 迁移任务统一结果类型
///
/// 使用此别名可以简化函数签名：`fn do_something() -> Result<()>`
pub type Result<T> = std::result::Result<T, MigrationError>;

#[derive(Error, Debug)]
pub enum MigrationError {
    // ==========================================
    // 1. 配置与启动错误 (Configuration & Startup)
    // ==========================================
    /// 配置错误
    ///
    /// - 触发场景: 配置项校验不通过，或 Builder 缺少必填组件。
    /// - 处理: 检查配置文件。
    #[error("Configuration error: {0}")]
    Config(String),

    /// 配置文件解析失败
    #[error("Failed to parse configuration: {0}")]
    ConfigParse(#[from] toml::de::Error),

    // ==========================================
    // 2. 指令解析错误 (Directive Resolution)
    // ==========================================
    /// 课程 ID 无法解析
    ///
    /// - 触发场景: 标准格式与旧格式都无法解析指令中的 `course_id`。
    #[error("Invalid course_key: '{0}'.")]
    InvalidCourseKey(String),

    /// 课程不存在
    ///
    /// - 触发场景: 课程下没有任何内容单元。
    #[error("Course with {0} key not found.")]
    CourseNotFound(String),

    /// 课程缺少 verified cohort 绑定
    #[error("No verified track cohort binding found for course: {0}")]
    MissingVerifiedTrack(String),

    /// verified cohort 不存在
    #[error("Verified cohort '{name}' not found for course: {course}")]
    VerifiedCohortNotFound { course: String, name: String },

    /// 同名 verified cohort 不唯一
    #[error("Verified cohort '{name}' is ambiguous for course {course} ({count} matches)")]
    AmbiguousVerifiedCohort {
        course: String,
        name: String,
        count: usize,
    },

    /// verified cohort 没有唯一的分组绑定
    ///
    /// - 触发场景: 该 cohort 没有绑定或绑定了多个 (分组, 成员组)。
    #[error("Verified cohort {cohort} must be linked to exactly one partition group ({count} found)")]
    VerifiedCohortUnlinked { cohort: CohortId, count: usize },

    /// 选课模式缺失
    #[error("Audit or Verified course modes are not defined for course: {0}")]
    MissingEnrollmentTracks(String),

    // ==========================================
    // 3. 迁移执行错误 (Rewrite & Prune)
    // ==========================================
    /// 需要改写的内容仍是草稿
    ///
    /// - 后果: 整次运行中止，该内容保持原样。
    /// - 处理: 先发布该内容，再重新运行。
    #[error("XBlock {location} for course, {course} needs access changes, but is a draft")]
    DraftNeedsAccessChange { course: String, location: String },

    /// 课程分组配置中找不到分组
    #[error("User partition {partition} not found in course {course}")]
    PartitionNotFound {
        course: String,
        partition: PartitionId,
    },

    /// 成员组仍被内容引用，不能删除
    ///
    /// - `usages`: 引用该成员组的内容位置与显示名。
    #[error(
        "Content group {group} in partition {partition} is in use and cannot be deleted. Used by: {}",
        list_usages(.usages)
    )]
    GroupInUse {
        partition: PartitionId,
        group: GroupId,
        usages: Vec<GroupUsage>,
    },

    // ==========================================
    // 4. 基础设施与 IO 错误 (Infrastructure & IO)
    // ==========================================
    /// 序列化/反序列化失败
    #[error("Serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    /// 通用 IO 错误
    #[error("IO operation failed: {0}")]
    Io(#[from] std::io::Error),

    /// 持久化层通用错误
    #[error("Persistence layer failure: {0}")]
    Persistence(String),
}

fn list_usages(usages: &[GroupUsage]) -> String {
    usages
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

impl MigrationError {
    /// 进程退出码
    ///
    /// - `2`: 配置、IO、存储等环境问题，数据本身未被判定。
    /// - `1`: 数据或迁移逻辑错误。
    pub fn exit_code(&self) -> i32 {
        match self {
            MigrationError::Config(_)
            | MigrationError::ConfigParse(_)
            | MigrationError::Serialization(_)
            | MigrationError::Io(_)
            | MigrationError::Persistence(_) => 2,

            MigrationError::InvalidCourseKey(_)
            | MigrationError::CourseNotFound(_)
            | MigrationError::MissingVerifiedTrack(_)
            | MigrationError::VerifiedCohortNotFound { .. }
            | MigrationError::AmbiguousVerifiedCohort { .. }
            | MigrationError::VerifiedCohortUnlinked { .. }
            | MigrationError::MissingEnrollmentTracks(_)
            | MigrationError::DraftNeedsAccessChange { .. }
            | MigrationError::PartitionNotFound { .. }
            | MigrationError::GroupInUse { .. } => 1,
        }
    }
}
