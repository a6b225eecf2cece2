#![allow(dead_code)]

use cohort_track_migrate::common::{
    AccessRules, AssignmentType, CohortGroup, CohortId, ContentItem, CourseKey, CourseRecord,
    EnrollmentTrack, GroupId, MigrationDirective, PartitionGroup, PartitionId, UsageKey,
    UserPartition, VerifiedTrackBinding,
};
use cohort_track_migrate::MemoryPersistence;

pub const COURSE_ID: &str = "course-v1:X+Y+Z";
pub const COHORT_PARTITION: PartitionId = PartitionId(1_000);
pub const ENROLLMENT_PARTITION: PartitionId = PartitionId(50);

pub const COHORT_A_GROUP: GroupId = GroupId(11);
pub const COHORT_B_GROUP: GroupId = GroupId(12);
pub const COHORT_V_GROUP: GroupId = GroupId(13);
pub const COHORT_M_GROUP: GroupId = GroupId(14);

pub const AUDIT_TRACK: GroupId = GroupId(1);
pub const VERIFIED_TRACK: GroupId = GroupId(2);

pub fn course_key() -> CourseKey {
    CourseKey::new("X", "Y", "Z")
}

pub fn location(id: &str) -> UsageKey {
    UsageKey::course_block(&course_key(), "vertical", id)
}

pub fn cohort_access(groups: &[GroupId]) -> AccessRules {
    AccessRules::single(COHORT_PARTITION, groups.to_vec())
}

pub fn item(id: &str, access: AccessRules) -> ContentItem {
    ContentItem::new(location(id)).with_access(access)
}

fn cohort(id: u64, name: &str, assignment: AssignmentType) -> CohortGroup {
    CohortGroup {
        id: CohortId(id),
        course_key: course_key(),
        name: name.to_string(),
        assignment,
    }
}

/// 一门完整配置好的课程：
/// - CohortA / CohortB: 随机分配的 audit cohort
/// - CohortV: verified cohort
/// - CohortM: 手动分配的 cohort，不参与迁移
/// - audit / verified 两个选课模式
pub fn seeded_course() -> MemoryPersistence {
    let store = MemoryPersistence::new();
    store.insert_directive(MigrationDirective::new(COURSE_ID, "CohortA,CohortB,CohortM", true));

    let mut course = CourseRecord::new(course_key(), "Verified Track Pilot");
    course.user_partitions.push(UserPartition {
        id: COHORT_PARTITION,
        name: "Cohorts".into(),
        scheme: "cohort".into(),
        groups: [
            (COHORT_A_GROUP, "CohortA"),
            (COHORT_B_GROUP, "CohortB"),
            (COHORT_V_GROUP, "CohortV"),
            (COHORT_M_GROUP, "CohortM"),
        ]
        .into_iter()
        .map(|(id, name)| PartitionGroup {
            id,
            name: name.into(),
        })
        .collect(),
    });
    store.insert_course(course);

    store.insert_linked_cohort(
        cohort(1, "CohortA", AssignmentType::Random),
        COHORT_PARTITION,
        COHORT_A_GROUP,
    );
    store.insert_linked_cohort(
        cohort(2, "CohortB", AssignmentType::Random),
        COHORT_PARTITION,
        COHORT_B_GROUP,
    );
    store.insert_linked_cohort(
        cohort(3, "CohortV", AssignmentType::Manual),
        COHORT_PARTITION,
        COHORT_V_GROUP,
    );
    store.insert_linked_cohort(
        cohort(4, "CohortM", AssignmentType::Manual),
        COHORT_PARTITION,
        COHORT_M_GROUP,
    );

    store.insert_binding(VerifiedTrackBinding {
        course_key: course_key(),
        verified_cohort_name: "CohortV".into(),
    });
    for (id, slug) in [
        (AUDIT_TRACK, EnrollmentTrack::AUDIT),
        (VERIFIED_TRACK, EnrollmentTrack::VERIFIED),
    ] {
        store.insert_track(EnrollmentTrack {
            id,
            course_key: course_key(),
            slug: slug.into(),
            name: slug.into(),
        });
    }

    store
}

/// 课程分组配置中剩余的成员组
pub fn remaining_groups(store: &MemoryPersistence) -> Vec<GroupId> {
    store
        .course(&course_key())
        .expect("course")
        .partition(COHORT_PARTITION)
        .expect("cohort partition")
        .groups
        .iter()
        .map(|g| g.id)
        .collect()
}
