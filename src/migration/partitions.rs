use std::collections::BTreeMap;

use crate::common::error::{MigrationError, Result};
use crate::common::{
    Actor, ContentItem, CourseKey, CourseRecord, GroupId, GroupUsage, PartitionId, UserPartition,
};
use crate::persistence::ContentStore;

/// 课程内各 (分组, 成员组) 的引用情况
///
/// 只统计课程分组配置中存在的分组，访问规则里的孤儿分组会被忽略。
#[derive(Debug, Clone, Default)]
pub struct PartitionUsage {
    usages: BTreeMap<PartitionId, BTreeMap<GroupId, Vec<GroupUsage>>>,
}

impl PartitionUsage {
    /// 扫描内容单元的访问规则
    pub fn scan(items: &[ContentItem], course: &CourseRecord) -> Self {
        let mut usages: BTreeMap<PartitionId, BTreeMap<GroupId, Vec<GroupUsage>>> =
            BTreeMap::new();

        for item in items {
            for (partition, group) in item.access.pairs() {
                if course.partition(partition).is_none() {
                    continue;
                }
                usages
                    .entry(partition)
                    .or_default()
                    .entry(group)
                    .or_default()
                    .push(GroupUsage {
                        location: item.location.clone(),
                        display_name: item.display_name.clone(),
                    });
            }
        }

        Self { usages }
    }

    /// 引用了该成员组的内容
    pub fn usages(&self, partition: PartitionId, group: GroupId) -> &[GroupUsage] {
        self.usages
            .get(&partition)
            .and_then(|groups| groups.get(&group))
            .map_or(&[][..], Vec::as_slice)
    }
}

/// 课程分组服务
///
/// 绑定到一门课程，负责读取课程分组配置并扫描引用情况。
pub struct PartitionService<'a, S: ContentStore + ?Sized> {
    store: &'a S,
    course_key: CourseKey,
}

impl<'a, S: ContentStore + ?Sized> PartitionService<'a, S> {
    pub fn new(store: &'a S, course_key: CourseKey) -> Self {
        Self { store, course_key }
    }

    pub fn course_key(&self) -> &CourseKey {
        &self.course_key
    }

    /// 读取课程元数据
    pub async fn get_course(&self) -> Result<CourseRecord> {
        self.store
            .get_course(&self.course_key)
            .await?
            .ok_or_else(|| MigrationError::CourseNotFound(self.course_key.to_string()))
    }

    /// 在课程中查找分组配置
    pub fn get_user_partition<'c>(
        &self,
        course: &'c CourseRecord,
        partition: PartitionId,
    ) -> Result<&'c UserPartition> {
        course
            .partition(partition)
            .ok_or_else(|| MigrationError::PartitionNotFound {
                course: self.course_key.to_string(),
                partition,
            })
    }

    /// 写回课程元数据
    pub async fn update_course(&self, course: &CourseRecord, actor: Actor) -> Result<()> {
        self.store.update_course(course, actor).await
    }

    /// 重新读取课程内容并扫描引用
    pub async fn usage(&self, course: &CourseRecord) -> Result<PartitionUsage> {
        let items = self.store.get_items(&self.course_key).await?;
        Ok(PartitionUsage::scan(&items, course))
    }
}
