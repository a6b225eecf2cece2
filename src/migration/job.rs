use std::sync::Arc;
use std::time::Instant;

use tracing::{Instrument, debug, info, info_span, warn};

use crate::common::error::{MigrationError, Result};
use crate::common::{
    Actor, AssignmentType, ContentItem, CourseKey, EnrollmentTrack, JobConfig, MigrationDirective,
    PartitionGroupLink, PublishState, TimeUtils, UsageKey, new_run_id,
};
use crate::migration::partitions::PartitionService;
use crate::migration::prune::prune_groups;
use crate::migration::report::{CourseReport, MigrationReport};
use crate::migration::rewrite::{RewriteDecision, TrackTarget, plan_rewrite};
use crate::persistence::MigrationStore;

/// Cohort -> Enrollment Track 迁移任务
///
/// 按顺序处理每一条启用的迁移指令：
/// 1. 解析课程 Key 并确认课程存在
/// 2. 解析 audit cohort 与 verified cohort 的分组绑定
/// 3. 解析 audit / verified 选课模式
/// 4. 改写引用了这些 cohort 的访问规则，并立即发布
/// 5. 从课程分组配置中删除这些 cohort 对应的成员组
///
/// 任何一步出错都会中止整次运行，已经写入的修改不会回滚。
pub struct CohortMigrationJob {
    store: Arc<dyn MigrationStore>,
    config: JobConfig,
}

impl CohortMigrationJob {
    pub fn new(store: Arc<dyn MigrationStore>, config: JobConfig) -> Self {
        Self { store, config }
    }

    pub fn config(&self) -> &JobConfig {
        &self.config
    }

    /// 执行全部启用的指令
    ///
    /// `actor` 会被记录到每一次写操作上。
    pub async fn run(&self, actor: Actor) -> Result<MigrationReport> {
        let run_id = new_run_id();
        let span = info_span!("cohort_migration", run_id = %run_id, actor = %actor);

        async move {
            let started_at = TimeUtils::now();
            let clock = Instant::now();

            let directives = self.store.find_directives(true).await?;
            info!(directives = directives.len(), "starting cohort migration");

            let mut courses = Vec::with_capacity(directives.len());
            for directive in &directives {
                courses.push(self.migrate_directive(directive, actor).await?);
            }

            let report = MigrationReport {
                run_id: run_id.clone(),
                actor,
                started_at,
                elapsed_ms: TimeUtils::elapsed_ms(clock),
                courses,
            };
            info!(
                courses = report.courses.len(),
                rewritten = report.total_rewritten(),
                pruned = report.total_pruned(),
                elapsed_ms = report.elapsed_ms,
                "cohort migration finished"
            );
            Ok::<_, MigrationError>(report)
        }
        .instrument(span)
        .await
    }

    /// 执行单条指令
    pub async fn migrate_directive(
        &self,
        directive: &MigrationDirective,
        actor: Actor,
    ) -> Result<CourseReport> {
        let course_id = directive.course_id.as_str();
        let course_key = parse_course_key(course_id)?;
        info!(course = %course_key, "migrating course");

        let items = self.store.get_items(&course_key).await?;
        if items.is_empty() {
            return Err(MigrationError::CourseNotFound(course_id.to_string()));
        }

        let audit_links = self
            .resolve_audit_links(&course_key, &directive.audit_cohort_names())
            .await?;
        let verified_link = self.resolve_verified_link(&course_key, course_id).await?;
        let target = self.resolve_tracks(&course_key, course_id).await?;

        let mut report = CourseReport::new(course_key.clone());
        report.items_scanned = items.len();
        report.rewritten = self
            .rewrite_items(course_id, items, &audit_links, &verified_link, &target, actor)
            .await?;

        // 候选列表与是否真的改写过无关：全部 audit 绑定 + verified 绑定
        let mut candidates = audit_links;
        candidates.push(verified_link);

        let service = PartitionService::new(self.store.as_ref(), course_key);
        let outcome =
            prune_groups(&service, &candidates, self.config.in_use_policy, actor).await?;
        report.pruned = outcome.pruned;
        report.retained_in_use = outcome.retained_in_use;

        Ok(report)
    }

    // ==========================================
    // 解析阶段 (Resolution)
    // ==========================================

    /// audit cohort 的分组绑定
    ///
    /// 只取随机分配的 cohort，不存在或策略不符的名称直接忽略。
    async fn resolve_audit_links(
        &self,
        course_key: &CourseKey,
        names: &[String],
    ) -> Result<Vec<PartitionGroupLink>> {
        let cohorts = self
            .store
            .find_cohort_groups(course_key, names, AssignmentType::Random)
            .await?;

        for name in names {
            if !cohorts.iter().any(|cohort| cohort.name == *name) {
                warn!(cohort = %name, "audit cohort not found or not randomly assigned, ignoring");
            }
        }

        let ids: Vec<_> = cohorts.iter().map(|cohort| cohort.id).collect();
        self.store.find_partition_links(&ids).await
    }

    /// verified cohort 的唯一分组绑定
    async fn resolve_verified_link(
        &self,
        course_key: &CourseKey,
        course_id: &str,
    ) -> Result<PartitionGroupLink> {
        let binding = self
            .store
            .find_verified_binding(course_key)
            .await?
            .ok_or_else(|| MigrationError::MissingVerifiedTrack(course_id.to_string()))?;

        let name = binding.verified_cohort_name;
        let mut cohorts = self.store.find_cohorts_by_name(course_key, &name).await?;
        let cohort = match cohorts.len() {
            0 => {
                return Err(MigrationError::VerifiedCohortNotFound {
                    course: course_id.to_string(),
                    name,
                });
            }
            1 => cohorts.remove(0),
            count => {
                return Err(MigrationError::AmbiguousVerifiedCohort {
                    course: course_id.to_string(),
                    name,
                    count,
                });
            }
        };

        let mut links = self.store.find_partition_links(&[cohort.id]).await?;
        if links.len() != 1 {
            return Err(MigrationError::VerifiedCohortUnlinked {
                cohort: cohort.id,
                count: links.len(),
            });
        }
        Ok(links.remove(0))
    }

    /// audit / verified 选课模式
    async fn resolve_tracks(&self, course_key: &CourseKey, course_id: &str) -> Result<TrackTarget> {
        let audit = self
            .store
            .find_enrollment_track(course_key, EnrollmentTrack::AUDIT)
            .await?;
        let verified = self
            .store
            .find_enrollment_track(course_key, EnrollmentTrack::VERIFIED)
            .await?;

        match (audit, verified) {
            (Some(audit), Some(verified)) => Ok(TrackTarget {
                partition: self.config.enrollment_track_partition_id,
                audit: audit.id,
                verified: verified.id,
            }),
            _ => Err(MigrationError::MissingEnrollmentTracks(
                course_id.to_string(),
            )),
        }
    }

    // ==========================================
    // 改写阶段 (Rewrite)
    // ==========================================

    /// 改写访问规则，返回被改写的内容单元
    async fn rewrite_items(
        &self,
        course_id: &str,
        items: Vec<ContentItem>,
        audit_links: &[PartitionGroupLink],
        verified_link: &PartitionGroupLink,
        target: &TrackTarget,
        actor: Actor,
    ) -> Result<Vec<UsageKey>> {
        let mut rewritten = Vec::new();

        for mut item in items {
            let access = match plan_rewrite(&item.access, audit_links, verified_link, target) {
                RewriteDecision::Skip(reason) => {
                    debug!(location = %item.location, ?reason, "access rules unchanged");
                    continue;
                }
                RewriteDecision::Rewrite(access) => access,
            };

            // 改写后会立即发布，所以只允许改写已发布的内容
            if !self.publish_state(&item.location).await?.is_published() {
                return Err(MigrationError::DraftNeedsAccessChange {
                    course: course_id.to_string(),
                    location: item.location.to_string(),
                });
            }

            item.access = access;
            self.store.update_item(&item, actor).await?;
            self.store.publish(&item.location, actor).await?;
            info!(location = %item.location, "access rules moved to enrollment tracks");

            rewritten.push(item.location);
        }

        Ok(rewritten)
    }

    /// 内容库内容没有发布状态
    async fn publish_state(&self, location: &UsageKey) -> Result<PublishState> {
        if location.is_library() {
            return Ok(PublishState::NotApplicable);
        }
        Ok(if self.store.has_published_version(location).await? {
            PublishState::Published
        } else {
            PublishState::Draft
        })
    }
}

/// 先按标准格式解析课程 Key，失败后回退到旧格式
fn parse_course_key(course_id: &str) -> Result<CourseKey> {
    CourseKey::parse_primary(course_id)
        .or_else(|_| CourseKey::parse_legacy(course_id))
        .map_err(|_| MigrationError::InvalidCourseKey(course_id.to_string()))
}
