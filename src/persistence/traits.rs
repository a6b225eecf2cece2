use async_trait::async_trait;

use crate::common::error::Result;
use crate::common::{
    Actor, AssignmentType, CohortGroup, CohortId, ContentItem, CourseKey, CourseRecord,
    EnrollmentTrack, MigrationDirective, PartitionGroupLink, UsageKey, VerifiedTrackBinding,
};

// ==========================================
// 1. 指令存储接口 (DirectiveStore)
// ==========================================

/// 迁移指令存储
///
/// **职责**: 提供版本化的迁移指令。
/// 实现层只需要返回每个逻辑指令的最新版本，历史版本对任务不可见。
#[async_trait]
pub trait DirectiveStore: Send + Sync + 'static {
    /// 查询指令 (Find Directives)
    ///
    /// 返回每个 `course_id` 的最新版本中，`enabled` 与参数一致的那些。
    async fn find_directives(&self, enabled: bool) -> Result<Vec<MigrationDirective>>;
}

// ==========================================
// 2. 内容存储接口 (ContentStore)
// ==========================================

/// 课程内容存储
///
/// **职责**: 课程元数据与内容单元的读写、发布。
/// **特点**:
/// - 每次写操作立即对其他读者可见，不存在跨内容单元的事务。
/// - 所有写操作都显式携带执行者 (`Actor`)。
#[async_trait]
pub trait ContentStore: Send + Sync + 'static {
    /// 列出课程下的全部内容单元 (草稿视图)
    ///
    /// 课程不存在时返回空列表。
    async fn get_items(&self, course: &CourseKey) -> Result<Vec<ContentItem>>;

    /// 内容单元是否存在已发布版本
    async fn has_published_version(&self, location: &UsageKey) -> Result<bool>;

    /// 更新内容单元 (写入草稿)
    async fn update_item(&self, item: &ContentItem, actor: Actor) -> Result<()>;

    /// 发布内容单元 (草稿 -> 已发布)
    async fn publish(&self, location: &UsageKey, actor: Actor) -> Result<()>;

    /// 读取课程元数据 (包含分组配置)
    async fn get_course(&self, course: &CourseKey) -> Result<Option<CourseRecord>>;

    /// 更新课程元数据
    async fn update_course(&self, course: &CourseRecord, actor: Actor) -> Result<()>;
}

// ==========================================
// 3. Cohort 查询接口 (CohortStore)
// ==========================================

/// Cohort 与选课模式查询
///
/// **职责**: 按课程解析 cohort、cohort 的分组绑定、verified 绑定和选课模式。
/// 只读接口，迁移任务不会修改这些数据。
#[async_trait]
pub trait CohortStore: Send + Sync + 'static {
    /// 按名称与分配策略查询 cohort
    ///
    /// 名称不存在或策略不匹配的直接忽略，不报错。
    async fn find_cohort_groups(
        &self,
        course: &CourseKey,
        names: &[String],
        assignment: AssignmentType,
    ) -> Result<Vec<CohortGroup>>;

    /// 按名称查询 cohort (不限分配策略)
    ///
    /// 由调用方决定 0 个或多个结果是否算错误。
    async fn find_cohorts_by_name(&self, course: &CourseKey, name: &str)
    -> Result<Vec<CohortGroup>>;

    /// 查询 cohort 的分组绑定
    async fn find_partition_links(&self, cohort_ids: &[CohortId])
    -> Result<Vec<PartitionGroupLink>>;

    /// 查询课程的 verified cohort 绑定
    async fn find_verified_binding(&self, course: &CourseKey)
    -> Result<Option<VerifiedTrackBinding>>;

    /// 按 slug 查询课程的选课模式
    async fn find_enrollment_track(
        &self,
        course: &CourseKey,
        slug: &str,
    ) -> Result<Option<EnrollmentTrack>>;
}

/// 迁移任务需要的全部存储能力
///
/// 任何同时实现了三个接口的类型都自动满足。
pub trait MigrationStore: DirectiveStore + ContentStore + CohortStore {}

impl<T> MigrationStore for T where T: DirectiveStore + ContentStore + CohortStore {}
