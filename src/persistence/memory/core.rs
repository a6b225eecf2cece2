use dashmap::DashMap;
use parking_lot::{Mutex, RwLock};
use std::sync::{
    Arc,
    atomic::{AtomicU64, Ordering},
};

use crate::common::{
    Actor, CohortGroup, CohortId, ContentItem, CourseKey, CourseRecord, EnrollmentTrack, GroupId,
    MigrationDirective, PartitionGroupLink, PartitionId, UsageKey, VerifiedTrackBinding,
};

/// 内存中的内容单元 (草稿 + 已发布版本)
#[derive(Debug, Clone)]
pub(crate) struct StoredItem {
    /// 所属课程
    pub(crate) course: CourseKey,
    /// 插入序号，用于保证列表顺序稳定
    pub(crate) seq: u64,
    pub(crate) draft: ContentItem,
    pub(crate) published: Option<ContentItem>,
}

/// 写操作记录
///
/// 内存实现会按顺序记录每一次写操作，方便测试断言写入次数、顺序和执行者。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteEvent {
    ItemUpdated { location: UsageKey, actor: Actor },
    ItemPublished { location: UsageKey, actor: Actor },
    CourseUpdated { course: CourseKey, actor: Actor },
}

/// 内存持久化实现 (In-Memory Persistence)
///
/// 同时实现了 DirectiveStore、ContentStore 和 CohortStore。
/// - 命令行入口: 从 JSON 快照加载，运行后写回。
/// - 测试: 作为假存储直接注入迁移任务。
#[derive(Debug, Default)]
pub struct MemoryPersistence {
    /// 【指令历史】按插入顺序保存所有版本
    pub(crate) directives: Arc<RwLock<Vec<MigrationDirective>>>,

    /// 【课程】CourseKey -> 课程元数据
    pub(crate) courses: Arc<DashMap<CourseKey, CourseRecord>>,

    /// 【内容】UsageKey -> 草稿与已发布版本
    /// - DashMap: 分片锁，读写不排队
    pub(crate) items: Arc<DashMap<UsageKey, StoredItem>>,

    /// 内容插入序号
    pub(crate) item_seq: Arc<AtomicU64>,

    /// 【Cohort】
    pub(crate) cohorts: Arc<DashMap<CohortId, CohortGroup>>,

    /// 【分组绑定】保持插入顺序
    pub(crate) links: Arc<RwLock<Vec<PartitionGroupLink>>>,

    /// 【选课模式】
    pub(crate) tracks: Arc<RwLock<Vec<EnrollmentTrack>>>,

    /// 【verified 绑定】每门课最多一个
    pub(crate) bindings: Arc<DashMap<CourseKey, VerifiedTrackBinding>>,

    /// 写操作日志
    pub(crate) writes: Arc<Mutex<Vec<WriteEvent>>>,
}

impl MemoryPersistence {
    /// 创建一个空的内存存储
    pub fn new() -> Self {
        Self::default()
    }

    // ==========================================
    // 数据准备 (Seeding)
    // ==========================================

    /// 追加一个指令版本
    pub fn insert_directive(&self, directive: MigrationDirective) {
        self.directives.write().push(directive);
    }

    pub fn insert_course(&self, course: CourseRecord) {
        self.courses.insert(course.key.clone(), course);
    }

    /// 插入内容单元
    ///
    /// `published` 为 true 时，同时写入一份相同的已发布版本。
    pub fn insert_item(&self, course: &CourseKey, item: ContentItem, published: bool) {
        let published = published.then(|| item.clone());
        self.insert_item_versions(course, item, published);
    }

    /// 插入内容单元的草稿与已发布版本
    pub fn insert_item_versions(
        &self,
        course: &CourseKey,
        draft: ContentItem,
        published: Option<ContentItem>,
    ) {
        let seq = self.item_seq.fetch_add(1, Ordering::Relaxed);
        self.items.insert(
            draft.location.clone(),
            StoredItem {
                course: course.clone(),
                seq,
                draft,
                published,
            },
        );
    }

    pub fn insert_cohort(&self, cohort: CohortGroup) {
        self.cohorts.insert(cohort.id, cohort);
    }

    /// 插入 cohort 及其分组绑定
    pub fn insert_linked_cohort(
        &self,
        cohort: CohortGroup,
        partition_id: PartitionId,
        group_id: GroupId,
    ) {
        self.insert_link(PartitionGroupLink {
            cohort_id: cohort.id,
            partition_id,
            group_id,
        });
        self.insert_cohort(cohort);
    }

    pub fn insert_link(&self, link: PartitionGroupLink) {
        self.links.write().push(link);
    }

    pub fn insert_track(&self, track: EnrollmentTrack) {
        self.tracks.write().push(track);
    }

    pub fn insert_binding(&self, binding: VerifiedTrackBinding) {
        self.bindings.insert(binding.course_key.clone(), binding);
    }

    // ==========================================
    // 状态读取 (Inspection)
    // ==========================================

    /// 内容单元的草稿版本
    pub fn item(&self, location: &UsageKey) -> Option<ContentItem> {
        self.items.get(location).map(|stored| stored.draft.clone())
    }

    /// 内容单元的已发布版本
    pub fn published_item(&self, location: &UsageKey) -> Option<ContentItem> {
        self.items
            .get(location)
            .and_then(|stored| stored.published.clone())
    }

    pub fn course(&self, key: &CourseKey) -> Option<CourseRecord> {
        self.courses.get(key).map(|course| course.clone())
    }

    /// 迄今为止的全部写操作
    pub fn writes(&self) -> Vec<WriteEvent> {
        self.writes.lock().clone()
    }

    pub(super) fn record(&self, event: WriteEvent) {
        self.writes.lock().push(event);
    }

    /// 课程下的内容 (按插入顺序)
    pub(super) fn items_of(&self, course: &CourseKey) -> Vec<StoredItem> {
        let mut items: Vec<StoredItem> = self
            .items
            .iter()
            .filter(|entry| entry.course == *course)
            .map(|entry| entry.value().clone())
            .collect();
        items.sort_by_key(|stored| stored.seq);
        items
    }
}

// Clone 实现：因为内部都是 Arc，所以 Clone 是廉价的，且共享同一份数据
impl Clone for MemoryPersistence {
    fn clone(&self) -> Self {
        Self {
            directives: self.directives.clone(),
            courses: self.courses.clone(),
            items: self.items.clone(),
            item_seq: self.item_seq.clone(),
            cohorts: self.cohorts.clone(),
            links: self.links.clone(),
            tracks: self.tracks.clone(),
            bindings: self.bindings.clone(),
            writes: self.writes.clone(),
        }
    }
}
