use async_trait::async_trait;

use super::MemoryPersistence;
use crate::common::error::Result;
use crate::common::{
    AssignmentType, CohortGroup, CohortId, CourseKey, EnrollmentTrack, MigrationDirective,
    PartitionGroupLink, VerifiedTrackBinding, latest_directives,
};
use crate::persistence::traits::{CohortStore, DirectiveStore};

#[async_trait]
impl DirectiveStore for MemoryPersistence {
    async fn find_directives(&self, enabled: bool) -> Result<Vec<MigrationDirective>> {
        let history = self.directives.read();
        Ok(latest_directives(&history, enabled))
    }
}

impl MemoryPersistence {
    /// 满足条件的 cohort，按 ID 排序
    fn cohorts_where(&self, filter: impl Fn(&CohortGroup) -> bool) -> Vec<CohortGroup> {
        let mut cohorts: Vec<CohortGroup> = self
            .cohorts
            .iter()
            .filter(|entry| filter(entry.value()))
            .map(|entry| entry.value().clone())
            .collect();
        cohorts.sort_by_key(|cohort| cohort.id);
        cohorts
    }
}

#[async_trait]
impl CohortStore for MemoryPersistence {
    async fn find_cohort_groups(
        &self,
        course: &CourseKey,
        names: &[String],
        assignment: AssignmentType,
    ) -> Result<Vec<CohortGroup>> {
        Ok(self.cohorts_where(|cohort| {
            cohort.course_key == *course
                && cohort.assignment == assignment
                && names.iter().any(|name| *name == cohort.name)
        }))
    }

    async fn find_cohorts_by_name(
        &self,
        course: &CourseKey,
        name: &str,
    ) -> Result<Vec<CohortGroup>> {
        Ok(self.cohorts_where(|cohort| cohort.course_key == *course && cohort.name == name))
    }

    async fn find_partition_links(
        &self,
        cohort_ids: &[CohortId],
    ) -> Result<Vec<PartitionGroupLink>> {
        Ok(self
            .links
            .read()
            .iter()
            .filter(|link| cohort_ids.contains(&link.cohort_id))
            .copied()
            .collect())
    }

    async fn find_verified_binding(
        &self,
        course: &CourseKey,
    ) -> Result<Option<VerifiedTrackBinding>> {
        Ok(self.bindings.get(course).map(|binding| binding.clone()))
    }

    async fn find_enrollment_track(
        &self,
        course: &CourseKey,
        slug: &str,
    ) -> Result<Option<EnrollmentTrack>> {
        Ok(self
            .tracks
            .read()
            .iter()
            .find(|track| track.course_key == *course && track.slug == slug)
            .cloned())
    }
}
