use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::common::{Actor, CourseKey, GroupId, PartitionGroupLink, PartitionId, UsageKey};

/// (分组, 成员组) 引用
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct GroupRef {
    pub partition_id: PartitionId,
    pub group_id: GroupId,
}

impl From<&PartitionGroupLink> for GroupRef {
    fn from(link: &PartitionGroupLink) -> Self {
        Self {
            partition_id: link.partition_id,
            group_id: link.group_id,
        }
    }
}

/// 单门课程的迁移结果
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CourseReport {
    pub course_key: CourseKey,
    /// 扫描过的内容单元数量
    pub items_scanned: usize,
    /// 访问规则被改写的内容单元
    pub rewritten: Vec<UsageKey>,
    /// 已从分组配置中删除的成员组
    pub pruned: Vec<GroupRef>,
    /// 仍被引用而保留的成员组 (仅 `warn` 策略)
    pub retained_in_use: Vec<GroupRef>,
}

impl CourseReport {
    pub fn new(course_key: CourseKey) -> Self {
        Self {
            course_key,
            items_scanned: 0,
            rewritten: Vec::new(),
            pruned: Vec::new(),
            retained_in_use: Vec::new(),
        }
    }
}

/// 一次运行的汇总
#[derive(Debug, Clone, Serialize)]
pub struct MigrationReport {
    pub run_id: String,
    pub actor: Actor,
    pub started_at: DateTime<Utc>,
    pub elapsed_ms: u64,
    pub courses: Vec<CourseReport>,
}

impl MigrationReport {
    pub fn total_rewritten(&self) -> usize {
        self.courses.iter().map(|c| c.rewritten.len()).sum()
    }

    pub fn total_pruned(&self) -> usize {
        self.courses.iter().map(|c| c.pruned.len()).sum()
    }

    /// 按课程查找
    pub fn course(&self, key: &CourseKey) -> Option<&CourseReport> {
        self.courses.iter().find(|c| c.course_key == *key)
    }
}
