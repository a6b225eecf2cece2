//! 数据快照
//!
//! 命令行入口使用 JSON 快照作为数据源：启动时加载进 [`MemoryPersistence`]，
//! 迁移成功后再导出写回同一个文件。
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::common::error::Result;
use crate::common::{
    CohortGroup, ContentItem, CourseKey, CourseRecord, EnrollmentTrack, MigrationDirective,
    PartitionGroupLink, VerifiedTrackBinding,
};
use crate::persistence::MemoryPersistence;

/// 快照中的内容单元
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotItem {
    pub course: CourseKey,
    pub draft: ContentItem,
    /// 已发布版本，为空表示仅有草稿
    #[serde(default)]
    pub published: Option<ContentItem>,
}

/// 全量数据快照
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreSnapshot {
    #[serde(default)]
    pub directives: Vec<MigrationDirective>,
    #[serde(default)]
    pub courses: Vec<CourseRecord>,
    #[serde(default)]
    pub items: Vec<SnapshotItem>,
    #[serde(default)]
    pub cohorts: Vec<CohortGroup>,
    #[serde(default)]
    pub links: Vec<PartitionGroupLink>,
    #[serde(default)]
    pub tracks: Vec<EnrollmentTrack>,
    #[serde(default)]
    pub bindings: Vec<VerifiedTrackBinding>,
}

impl StoreSnapshot {
    /// 从 JSON 文件读取
    pub fn read_from(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&contents)?)
    }

    /// 写入 JSON 文件
    ///
    /// 先写临时文件再重命名，避免中途失败留下半个文件。
    pub fn write_to(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, json)?;
        std::fs::rename(&tmp, path)?;
        Ok(())
    }
}

impl MemoryPersistence {
    /// 从快照构建内存存储
    pub fn from_snapshot(snapshot: StoreSnapshot) -> Self {
        let store = Self::new();
        for directive in snapshot.directives {
            store.insert_directive(directive);
        }
        for course in snapshot.courses {
            store.insert_course(course);
        }
        for item in snapshot.items {
            store.insert_item_versions(&item.course, item.draft, item.published);
        }
        for cohort in snapshot.cohorts {
            store.insert_cohort(cohort);
        }
        for link in snapshot.links {
            store.insert_link(link);
        }
        for track in snapshot.tracks {
            store.insert_track(track);
        }
        for binding in snapshot.bindings {
            store.insert_binding(binding);
        }
        store
    }

    /// 导出当前状态
    ///
    /// 课程、cohort、绑定按 Key 排序；内容单元保持插入顺序。
    pub fn snapshot(&self) -> StoreSnapshot {
        let mut courses: Vec<CourseRecord> =
            self.courses.iter().map(|entry| entry.value().clone()).collect();
        courses.sort_by(|a, b| a.key.cmp(&b.key));

        let mut stored: Vec<_> = self.items.iter().map(|entry| entry.value().clone()).collect();
        stored.sort_by_key(|item| item.seq);
        let items = stored
            .into_iter()
            .map(|item| SnapshotItem {
                course: item.course,
                draft: item.draft,
                published: item.published,
            })
            .collect();

        let mut cohorts: Vec<CohortGroup> =
            self.cohorts.iter().map(|entry| entry.value().clone()).collect();
        cohorts.sort_by_key(|cohort| cohort.id);

        let mut bindings: Vec<VerifiedTrackBinding> =
            self.bindings.iter().map(|entry| entry.value().clone()).collect();
        bindings.sort_by(|a, b| a.course_key.cmp(&b.course_key));

        StoreSnapshot {
            directives: self.directives.read().clone(),
            courses,
            items,
            cohorts,
            links: self.links.read().clone(),
            tracks: self.tracks.read().clone(),
            bindings,
        }
    }
}
