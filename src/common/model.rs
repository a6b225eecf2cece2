use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::{
    collections::{BTreeMap, HashMap},
    fmt,
};

use crate::common::{CourseKey, UsageKey};

// ==========================================
// 1. 基础标识 (Identifiers)
// ==========================================

/// 分组配置 (User Partition) ID
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PartitionId(pub i64);

/// 分组配置内的成员组 ID
///
/// 在 enrollment track 分组下，组 ID 就是选课模式 (CourseMode) 的 ID。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GroupId(pub i64);

/// Cohort ID
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CohortId(pub u64);

/// 写操作的执行者身份
///
/// 所有 update / publish 都必须显式携带，不使用全局的"当前用户"。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Actor(pub i64);

impl Actor {
    /// 管理命令的保留身份
    pub const MGMT_COMMAND: Actor = Actor(-1);
}

impl fmt::Display for PartitionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for GroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for CohortId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for Actor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ==========================================
// 2. 迁移指令 (MigrationDirective)
// ==========================================

/// 迁移指令 (版本化配置记录)
///
/// - 同一个 `course_id` 可能存在多个历史版本，只有最新版本生效。
/// - 任务运行期间只读，任务本身从不修改指令。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MigrationDirective {
    /// 课程 ID 原始字符串 (尚未解析)
    pub course_id: String,

    /// 逗号分隔的 audit cohort 名称列表
    #[serde(default)]
    pub audit_cohort_names: String,

    /// 是否启用
    #[serde(default)]
    pub enabled: bool,

    /// 该版本的生效时间
    pub change_date: DateTime<Utc>,

    /// 修改人 (仅用于审计)
    #[serde(default)]
    pub changed_by: Option<String>,
}

impl MigrationDirective {
    pub fn new(course_id: &str, audit_cohort_names: &str, enabled: bool) -> Self {
        Self {
            course_id: course_id.to_string(),
            audit_cohort_names: audit_cohort_names.to_string(),
            enabled,
            change_date: Utc::now(),
            changed_by: None,
        }
    }

    pub fn with_change_date(mut self, change_date: DateTime<Utc>) -> Self {
        self.change_date = change_date;
        self
    }

    /// 拆分 audit cohort 名称，丢弃空项
    ///
    /// 每个名称两端的空白也会去掉 (有意为之)：`"A, B"` 中的 ` B` 按 `B` 匹配。
    pub fn audit_cohort_names(&self) -> Vec<String> {
        self.audit_cohort_names
            .split(',')
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(str::to_string)
            .collect()
    }
}

/// 从指令历史中选出每个 `course_id` 的最新版本，再按 `enabled` 过滤
///
/// `change_date` 相同时，以后插入的版本为准。返回顺序与各课程首次出现的顺序一致。
pub fn latest_directives(history: &[MigrationDirective], enabled: bool) -> Vec<MigrationDirective> {
    let mut order: Vec<&str> = Vec::new();
    let mut latest: HashMap<&str, &MigrationDirective> = HashMap::new();

    for directive in history {
        match latest.get(directive.course_id.as_str()) {
            Some(current) if current.change_date > directive.change_date => {}
            Some(_) => {
                latest.insert(&directive.course_id, directive);
            }
            None => {
                order.push(&directive.course_id);
                latest.insert(&directive.course_id, directive);
            }
        }
    }

    order
        .into_iter()
        .filter_map(|course_id| latest.get(course_id).copied())
        .filter(|directive| directive.enabled == enabled)
        .cloned()
        .collect()
}

// ==========================================
// 3. 访问规则 (AccessRules)
// ==========================================

/// 内容单元的访问控制规则
///
/// 分组 ID -> 允许访问的成员组列表。列表保持插入顺序。
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(
    from = "Option<BTreeMap<PartitionId, Vec<GroupId>>>",
    into = "Option<BTreeMap<PartitionId, Vec<GroupId>>>"
)]
pub enum AccessRules {
    /// 无访问限制
    #[default]
    None,
    /// 按分组限制
    ByPartition(BTreeMap<PartitionId, Vec<GroupId>>),
}

impl AccessRules {
    /// 仅包含一个分组的规则
    pub fn single(partition: PartitionId, groups: Vec<GroupId>) -> Self {
        AccessRules::ByPartition(BTreeMap::from([(partition, groups)]))
    }

    /// 没有任何规则 (包括空映射)
    pub fn is_empty(&self) -> bool {
        match self {
            AccessRules::None => true,
            AccessRules::ByPartition(map) => map.is_empty(),
        }
    }

    /// 指定分组下是否包含该成员组
    pub fn grants(&self, partition: PartitionId, group: GroupId) -> bool {
        match self {
            AccessRules::None => false,
            AccessRules::ByPartition(map) => map
                .get(&partition)
                .is_some_and(|groups| groups.contains(&group)),
        }
    }

    /// 遍历所有 (分组, 成员组) 对
    pub fn pairs(&self) -> impl Iterator<Item = (PartitionId, GroupId)> + '_ {
        let map = match self {
            AccessRules::None => None,
            AccessRules::ByPartition(map) => Some(map),
        };
        map.into_iter().flat_map(|map| {
            map.iter()
                .flat_map(|(partition, groups)| groups.iter().map(move |g| (*partition, *g)))
        })
    }
}

impl From<Option<BTreeMap<PartitionId, Vec<GroupId>>>> for AccessRules {
    fn from(value: Option<BTreeMap<PartitionId, Vec<GroupId>>>) -> Self {
        match value {
            Some(map) => AccessRules::ByPartition(map),
            None => AccessRules::None,
        }
    }
}

impl From<AccessRules> for Option<BTreeMap<PartitionId, Vec<GroupId>>> {
    fn from(value: AccessRules) -> Self {
        match value {
            AccessRules::None => None,
            AccessRules::ByPartition(map) => Some(map),
        }
    }
}

// ==========================================
// 4. 内容单元 (ContentItem)
// ==========================================

/// 发布状态 (三态)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PublishState {
    /// 存在已发布版本
    Published,
    /// 仅有草稿
    Draft,
    /// 内容库内容，没有发布概念
    NotApplicable,
}

impl PublishState {
    pub fn is_published(&self) -> bool {
        matches!(self, PublishState::Published)
    }
}

/// 课程内容树中的一个节点
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentItem {
    pub location: UsageKey,

    #[serde(default)]
    pub display_name: Option<String>,

    /// 访问规则
    #[serde(default)]
    pub access: AccessRules,

    /// 最后一次修改的执行者
    #[serde(default)]
    pub edited_by: Option<Actor>,

    /// 最后一次修改时间
    #[serde(default)]
    pub edited_on: Option<DateTime<Utc>>,
}

impl ContentItem {
    pub fn new(location: UsageKey) -> Self {
        Self {
            location,
            display_name: None,
            access: AccessRules::None,
            edited_by: None,
            edited_on: None,
        }
    }

    pub fn with_access(mut self, access: AccessRules) -> Self {
        self.access = access;
        self
    }
}

/// 一条成员组引用记录：引用方的位置与显示名
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupUsage {
    pub location: UsageKey,
    pub display_name: Option<String>,
}

impl fmt::Display for GroupUsage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.display_name {
            Some(name) => write!(f, "'{}' ({})", name, self.location),
            None => write!(f, "{}", self.location),
        }
    }
}

// ==========================================
// 5. Cohort 与选课模式 (Cohorts & Tracks)
// ==========================================

/// Cohort 分配策略
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssignmentType {
    /// 学员随机分配
    Random,
    /// 手动分配
    Manual,
}

/// 课程内的 Cohort
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CohortGroup {
    pub id: CohortId,
    pub course_key: CourseKey,
    pub name: String,
    pub assignment: AssignmentType,
}

/// Cohort 与 (分组, 成员组) 的绑定
///
/// 访问规则里引用的正是这里的 `partition_id` / `group_id`。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PartitionGroupLink {
    pub cohort_id: CohortId,
    pub partition_id: PartitionId,
    pub group_id: GroupId,
}

/// 选课模式 (enrollment track)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnrollmentTrack {
    /// 作为 enrollment track 分组下的成员组 ID 使用
    pub id: GroupId,
    pub course_key: CourseKey,
    pub slug: String,
    #[serde(default)]
    pub name: String,
}

impl EnrollmentTrack {
    pub const AUDIT: &'static str = "audit";
    pub const VERIFIED: &'static str = "verified";
}

/// 课程的 verified cohort 绑定 (每门课最多一个)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerifiedTrackBinding {
    pub course_key: CourseKey,
    pub verified_cohort_name: String,
}

// ==========================================
// 6. 课程分组配置 (CourseRecord)
// ==========================================

/// 分组配置内的成员组定义
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartitionGroup {
    pub id: GroupId,
    pub name: String,
}

/// 分组配置 (User Partition)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserPartition {
    pub id: PartitionId,
    pub name: String,
    /// 分组方案，例如 "cohort"、"enrollment_track"
    #[serde(default)]
    pub scheme: String,
    #[serde(default)]
    pub groups: Vec<PartitionGroup>,
}

impl UserPartition {
    /// 移除匹配的成员组，返回是否确实移除
    pub fn remove_group(&mut self, group: GroupId) -> bool {
        match self.groups.iter().position(|g| g.id == group) {
            Some(index) => {
                self.groups.remove(index);
                true
            }
            None => false,
        }
    }
}

/// 课程元数据及其分组配置
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CourseRecord {
    pub key: CourseKey,
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub user_partitions: Vec<UserPartition>,
    #[serde(default)]
    pub edited_by: Option<Actor>,
}

impl CourseRecord {
    pub fn new(key: CourseKey, display_name: &str) -> Self {
        Self {
            key,
            display_name: display_name.to_string(),
            user_partitions: Vec::new(),
            edited_by: None,
        }
    }

    pub fn partition(&self, id: PartitionId) -> Option<&UserPartition> {
        self.user_partitions.iter().find(|p| p.id == id)
    }

    pub fn partition_mut(&mut self, id: PartitionId) -> Option<&mut UserPartition> {
        self.user_partitions.iter_mut().find(|p| p.id == id)
    }
}
