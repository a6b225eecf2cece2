mod support;

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use cohort_track_migrate::common::{
    AccessRules, Actor, AssignmentType, CohortGroup, CohortId, ContentItem, CourseKey,
    CourseRecord, EnrollmentTrack, InUsePolicy, JobConfig, LibraryKey, MigrationDirective,
    PartitionGroupLink, UsageKey, VerifiedTrackBinding,
};
use cohort_track_migrate::persistence::{CohortStore, ContentStore, DirectiveStore, WriteEvent};
use cohort_track_migrate::{
    MemoryPersistence, MigrationError, MigrationJobBuilder, MigrationReport, Result,
};

use support::*;

const ACTOR: Actor = Actor(-1);

async fn run(store: &MemoryPersistence) -> Result<MigrationReport> {
    MigrationJobBuilder::new()
        .store(Arc::new(store.clone()))
        .config(JobConfig::default())
        .build()?
        .run(ACTOR)
        .await
}

#[tokio::test]
async fn end_to_end_rewrites_and_prunes() {
    let store = seeded_course();
    store.insert_item(&course_key(), item("audit", cohort_access(&[COHORT_A_GROUP])), true);
    store.insert_item(&course_key(), item("verified", cohort_access(&[COHORT_V_GROUP])), true);
    store.insert_item(&course_key(), item("plain", AccessRules::None), true);

    let report = run(&store).await.expect("migration");

    assert_eq!(
        store.item(&location("audit")).expect("audit").access,
        AccessRules::single(ENROLLMENT_PARTITION, vec![AUDIT_TRACK])
    );
    assert_eq!(
        store.item(&location("verified")).expect("verified").access,
        AccessRules::single(ENROLLMENT_PARTITION, vec![VERIFIED_TRACK])
    );
    assert_eq!(
        store.item(&location("plain")).expect("plain").access,
        AccessRules::None
    );

    // 改写后的内容已经发布
    assert_eq!(
        store.published_item(&location("audit")).expect("published").access,
        AccessRules::single(ENROLLMENT_PARTITION, vec![AUDIT_TRACK])
    );

    // CohortA、CohortB、CohortV 被删除，手动分配的 CohortM 保留
    assert_eq!(remaining_groups(&store), vec![COHORT_M_GROUP]);

    let course = report.course(&course_key()).expect("course report");
    assert_eq!(course.items_scanned, 3);
    assert_eq!(course.rewritten, vec![location("audit"), location("verified")]);
    assert_eq!(course.pruned.len(), 3);
    assert!(course.retained_in_use.is_empty());
}

#[tokio::test]
async fn both_tracks_keep_audit_before_verified() {
    let store = seeded_course();
    store.insert_item(
        &course_key(),
        item("both", cohort_access(&[COHORT_V_GROUP, COHORT_B_GROUP])),
        true,
    );

    run(&store).await.expect("migration");

    assert_eq!(
        store.item(&location("both")).expect("both").access,
        AccessRules::single(ENROLLMENT_PARTITION, vec![AUDIT_TRACK, VERIFIED_TRACK])
    );
}

#[tokio::test]
async fn unrelated_access_rules_are_unchanged() {
    let store = seeded_course();
    let manual_only = cohort_access(&[COHORT_M_GROUP]);
    store.insert_item(&course_key(), item("manual", manual_only.clone()), true);

    let report = run(&store).await.expect("migration");

    assert_eq!(store.item(&location("manual")).expect("item").access, manual_only);
    assert!(report.course(&course_key()).expect("report").rewritten.is_empty());
    assert!(
        store
            .writes()
            .iter()
            .all(|w| matches!(w, WriteEvent::CourseUpdated { .. }))
    );
}

#[tokio::test]
async fn every_write_carries_the_actor_and_publish_follows_update() {
    let store = seeded_course();
    store.insert_item(&course_key(), item("audit", cohort_access(&[COHORT_A_GROUP])), true);

    MigrationJobBuilder::new()
        .store(Arc::new(store.clone()))
        .build()
        .expect("job")
        .run(Actor(42))
        .await
        .expect("migration");

    let writes = store.writes();
    assert_eq!(
        &writes[..2],
        &[
            WriteEvent::ItemUpdated {
                location: location("audit"),
                actor: Actor(42),
            },
            WriteEvent::ItemPublished {
                location: location("audit"),
                actor: Actor(42),
            },
        ]
    );
    // 三个候选 (CohortA, CohortB, CohortV) 各写回一次课程
    let course_updates: Vec<_> = writes[2..].iter().collect();
    assert_eq!(course_updates.len(), 3);
    assert!(course_updates.iter().all(|w| matches!(
        w,
        WriteEvent::CourseUpdated { actor: Actor(42), .. }
    )));
    assert_eq!(store.item(&location("audit")).expect("item").edited_by, Some(Actor(42)));
}

#[tokio::test]
async fn draft_needing_rewrite_aborts_and_stays_untouched() {
    let store = seeded_course();
    let original = cohort_access(&[COHORT_A_GROUP]);
    store.insert_item(&course_key(), item("draft", original.clone()), false);

    let err = run(&store).await.expect_err("draft must abort");
    assert!(matches!(err, MigrationError::DraftNeedsAccessChange { .. }));
    assert!(err.to_string().contains("needs access changes, but is a draft"));
    assert!(err.to_string().contains(COURSE_ID));

    assert_eq!(store.item(&location("draft")).expect("item").access, original);
    assert!(store.writes().is_empty());
    // 没有进入清理阶段
    assert_eq!(remaining_groups(&store).len(), 4);
}

#[tokio::test]
async fn library_items_count_as_unpublished() {
    let store = seeded_course();
    let lib_location = UsageKey::library_block(&LibraryKey::new("X", "Lib"), "problem", "p1");
    store.insert_item(
        &course_key(),
        ContentItem::new(lib_location.clone()).with_access(cohort_access(&[COHORT_A_GROUP])),
        true,
    );

    assert!(matches!(
        run(&store).await,
        Err(MigrationError::DraftNeedsAccessChange { .. })
    ));

    // 内容库内容不需要改写时不受影响
    let store = seeded_course();
    store.insert_item(&course_key(), ContentItem::new(lib_location), false);
    run(&store).await.expect("nothing to rewrite");
}

#[tokio::test]
async fn earlier_writes_stay_committed_after_failure() {
    let store = seeded_course();
    store.insert_item(&course_key(), item("first", cohort_access(&[COHORT_A_GROUP])), true);
    store.insert_item(&course_key(), item("second", cohort_access(&[COHORT_B_GROUP])), false);

    assert!(run(&store).await.is_err());
    assert_eq!(
        store.item(&location("first")).expect("item").access,
        AccessRules::single(ENROLLMENT_PARTITION, vec![AUDIT_TRACK])
    );
}

#[tokio::test]
async fn rerun_is_a_no_op_for_migrated_items() {
    let store = seeded_course();
    store.insert_item(&course_key(), item("audit", cohort_access(&[COHORT_A_GROUP])), true);

    run(&store).await.expect("first run");
    let after_first = store.item(&location("audit")).expect("item");

    let report = run(&store).await.expect("second run");
    assert_eq!(store.item(&location("audit")).expect("item").access, after_first.access);
    let course = report.course(&course_key()).expect("report");
    assert!(course.rewritten.is_empty());
    assert!(course.pruned.is_empty());
}

#[tokio::test]
async fn legacy_course_id_resolves() {
    let store = MemoryPersistence::new();
    store.insert_directive(MigrationDirective::new("X/Y/Z", "CohortA", true));
    assert!(matches!(
        run(&store).await,
        Err(MigrationError::CourseNotFound(id)) if id == "X/Y/Z"
    ));

    // 旧格式课程有内容时，解析继续往下走
    let legacy = CourseKey::parse_legacy("X/Y/Z").expect("legacy key");
    store.insert_item(
        &legacy,
        ContentItem::new(UsageKey::course_block(&legacy, "html", "a")),
        true,
    );
    assert!(matches!(
        run(&store).await,
        Err(MigrationError::MissingVerifiedTrack(id)) if id == "X/Y/Z"
    ));
}

#[tokio::test]
async fn resolution_failures_are_reported() {
    // 课程 ID 无法解析
    let store = MemoryPersistence::new();
    store.insert_directive(MigrationDirective::new("not a course", "", true));
    assert!(matches!(
        run(&store).await,
        Err(MigrationError::InvalidCourseKey(_))
    ));

    // 课程没有内容
    let store = seeded_course();
    assert!(matches!(
        run(&store).await,
        Err(MigrationError::CourseNotFound(_))
    ));

    // 缺少 verified 选课模式
    let mut snapshot = seeded_course().snapshot();
    snapshot.tracks.retain(|t| t.slug != EnrollmentTrack::VERIFIED);
    let store = MemoryPersistence::from_snapshot(snapshot);
    store.insert_item(&course_key(), item("a", AccessRules::None), true);
    assert!(matches!(
        run(&store).await,
        Err(MigrationError::MissingEnrollmentTracks(_))
    ));
}

#[tokio::test]
async fn verified_cohort_must_resolve_uniquely() {
    // 没有 verified 绑定
    let mut snapshot = seeded_course().snapshot();
    snapshot.bindings.clear();
    let store = MemoryPersistence::from_snapshot(snapshot);
    store.insert_item(&course_key(), item("a", AccessRules::None), true);
    assert!(matches!(
        run(&store).await,
        Err(MigrationError::MissingVerifiedTrack(_))
    ));

    // 绑定的 cohort 不存在
    let mut snapshot = seeded_course().snapshot();
    snapshot.bindings[0].verified_cohort_name = "Nobody".into();
    let store = MemoryPersistence::from_snapshot(snapshot);
    store.insert_item(&course_key(), item("a", AccessRules::None), true);
    assert!(matches!(
        run(&store).await,
        Err(MigrationError::VerifiedCohortNotFound { .. })
    ));

    // 同名 cohort 有两个
    let mut snapshot = seeded_course().snapshot();
    let mut duplicate = snapshot
        .cohorts
        .iter()
        .find(|c| c.name == "CohortV")
        .cloned()
        .expect("CohortV");
    duplicate.id = CohortId(99);
    snapshot.cohorts.push(duplicate);
    let store = MemoryPersistence::from_snapshot(snapshot);
    store.insert_item(&course_key(), item("a", AccessRules::None), true);
    assert!(matches!(
        run(&store).await,
        Err(MigrationError::AmbiguousVerifiedCohort { count: 2, .. })
    ));

    // verified cohort 没有分组绑定
    let mut snapshot = seeded_course().snapshot();
    snapshot.links.retain(|l| l.group_id != COHORT_V_GROUP);
    let store = MemoryPersistence::from_snapshot(snapshot);
    store.insert_item(&course_key(), item("a", AccessRules::None), true);
    assert!(matches!(
        run(&store).await,
        Err(MigrationError::VerifiedCohortUnlinked { count: 0, .. })
    ));
}

#[tokio::test]
async fn disabled_and_superseded_directives_are_skipped() {
    let store = seeded_course();
    store.insert_item(&course_key(), item("audit", cohort_access(&[COHORT_A_GROUP])), true);
    // 同一课程的新版本把指令关掉
    store.insert_directive(MigrationDirective::new(COURSE_ID, "CohortA", false));

    let report = run(&store).await.expect("migration");
    assert!(report.courses.is_empty());
    assert_eq!(
        store.item(&location("audit")).expect("item").access,
        cohort_access(&[COHORT_A_GROUP])
    );
}

#[tokio::test]
async fn failure_in_one_directive_stops_later_ones() {
    let store = seeded_course();
    store.insert_item(&course_key(), item("audit", cohort_access(&[COHORT_A_GROUP])), true);

    // 排在前面的指令指向一门不存在的课程
    let mut snapshot = store.snapshot();
    snapshot.directives.insert(
        0,
        MigrationDirective::new("course-v1:No+Such+Course", "", true),
    );
    let store = MemoryPersistence::from_snapshot(snapshot);

    assert!(matches!(
        run(&store).await,
        Err(MigrationError::CourseNotFound(_))
    ));
    assert_eq!(
        store.item(&location("audit")).expect("item").access,
        cohort_access(&[COHORT_A_GROUP])
    );
}

#[tokio::test]
async fn unknown_audit_names_are_ignored() {
    let store = seeded_course();
    store.insert_directive(MigrationDirective::new(COURSE_ID, "CohortA,Ghost", true));
    store.insert_item(&course_key(), item("audit", cohort_access(&[COHORT_A_GROUP])), true);

    let report = run(&store).await.expect("migration");
    let course = report.course(&course_key()).expect("report");
    assert_eq!(course.rewritten.len(), 1);
    // CohortB 不在最新指令里，保留
    assert_eq!(remaining_groups(&store), vec![COHORT_B_GROUP, COHORT_M_GROUP]);
}

/// 在清理开始 (第一次读取课程) 前插入一个引用了 CohortB 成员组的内容单元，
/// 模拟迁移过程中有人修改了课程内容。
struct LateEditStore {
    inner: MemoryPersistence,
    late_item: Mutex<Option<ContentItem>>,
}

impl LateEditStore {
    fn new(inner: MemoryPersistence, late_item: ContentItem) -> Self {
        Self {
            inner,
            late_item: Mutex::new(Some(late_item)),
        }
    }
}

#[async_trait]
impl DirectiveStore for LateEditStore {
    async fn find_directives(&self, enabled: bool) -> Result<Vec<MigrationDirective>> {
        self.inner.find_directives(enabled).await
    }
}

#[async_trait]
impl ContentStore for LateEditStore {
    async fn get_items(&self, course: &CourseKey) -> Result<Vec<ContentItem>> {
        self.inner.get_items(course).await
    }

    async fn has_published_version(&self, location: &UsageKey) -> Result<bool> {
        self.inner.has_published_version(location).await
    }

    async fn update_item(&self, item: &ContentItem, actor: Actor) -> Result<()> {
        self.inner.update_item(item, actor).await
    }

    async fn publish(&self, location: &UsageKey, actor: Actor) -> Result<()> {
        self.inner.publish(location, actor).await
    }

    async fn get_course(&self, course: &CourseKey) -> Result<Option<CourseRecord>> {
        let late = self.late_item.lock().take();
        if let Some(item) = late {
            self.inner.insert_item(course, item, true);
        }
        self.inner.get_course(course).await
    }

    async fn update_course(&self, course: &CourseRecord, actor: Actor) -> Result<()> {
        self.inner.update_course(course, actor).await
    }
}

#[async_trait]
impl CohortStore for LateEditStore {
    async fn find_cohort_groups(
        &self,
        course: &CourseKey,
        names: &[String],
        assignment: AssignmentType,
    ) -> Result<Vec<CohortGroup>> {
        self.inner.find_cohort_groups(course, names, assignment).await
    }

    async fn find_cohorts_by_name(
        &self,
        course: &CourseKey,
        name: &str,
    ) -> Result<Vec<CohortGroup>> {
        self.inner.find_cohorts_by_name(course, name).await
    }

    async fn find_partition_links(
        &self,
        cohort_ids: &[CohortId],
    ) -> Result<Vec<PartitionGroupLink>> {
        self.inner.find_partition_links(cohort_ids).await
    }

    async fn find_verified_binding(
        &self,
        course: &CourseKey,
    ) -> Result<Option<VerifiedTrackBinding>> {
        self.inner.find_verified_binding(course).await
    }

    async fn find_enrollment_track(
        &self,
        course: &CourseKey,
        slug: &str,
    ) -> Result<Option<EnrollmentTrack>> {
        self.inner.find_enrollment_track(course, slug).await
    }
}

#[tokio::test]
async fn warn_policy_keeps_a_group_that_is_still_used() {
    let store = seeded_course();
    store.insert_item(&course_key(), item("audit", cohort_access(&[COHORT_A_GROUP])), true);
    let late = item("late", cohort_access(&[COHORT_B_GROUP]));

    let report = MigrationJobBuilder::new()
        .store(Arc::new(LateEditStore::new(store.clone(), late)))
        .in_use_policy(InUsePolicy::Warn)
        .build()
        .expect("job")
        .run(ACTOR)
        .await
        .expect("migration");

    let course = report.course(&course_key()).expect("report");
    assert_eq!(course.retained_in_use.len(), 1);
    assert_eq!(course.retained_in_use[0].group_id, COHORT_B_GROUP);
    assert_eq!(
        remaining_groups(&store),
        vec![COHORT_B_GROUP, COHORT_M_GROUP]
    );
    // 保留的成员组对应的内容保持原样
    assert_eq!(
        store.item(&location("late")).expect("late").access,
        cohort_access(&[COHORT_B_GROUP])
    );
}

#[tokio::test]
async fn abort_policy_reports_the_late_usage() {
    let store = seeded_course();
    store.insert_item(&course_key(), item("audit", cohort_access(&[COHORT_A_GROUP])), true);
    let late = item("late", cohort_access(&[COHORT_B_GROUP]));

    let err = MigrationJobBuilder::new()
        .store(Arc::new(LateEditStore::new(store.clone(), late)))
        .build()
        .expect("job")
        .run(ACTOR)
        .await
        .expect_err("CohortB is still referenced");

    let MigrationError::GroupInUse { group, usages, .. } = err else {
        panic!("expected GroupInUse, got {err:?}");
    };
    assert_eq!(group, COHORT_B_GROUP);
    assert_eq!(usages.len(), 1);
    assert_eq!(usages[0].location, location("late"));
    // CohortA 在出错前已经删除
    assert_eq!(
        remaining_groups(&store),
        vec![COHORT_B_GROUP, COHORT_V_GROUP, COHORT_M_GROUP]
    );
}
