use tracing::{debug, warn};

use crate::common::error::{MigrationError, Result};
use crate::common::{Actor, InUsePolicy, PartitionGroupLink};
use crate::migration::partitions::PartitionService;
use crate::migration::report::GroupRef;
use crate::persistence::ContentStore;

/// 清理结果
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PruneOutcome {
    /// 确实删除了的成员组
    pub pruned: Vec<GroupRef>,
    /// 仍被引用而保留的成员组
    pub retained_in_use: Vec<GroupRef>,
}

/// 从课程分组配置中删除迁移后不再使用的成员组
///
/// - 课程元数据只读取一次，之后在内存中修改。
/// - 每个候选都会重新扫描一次引用，并写回一次课程 (即使没有匹配的成员组)。
/// - 仍被引用时按 `policy` 处理：`Abort` 直接返回错误，`Warn` 保留该成员组并跳过写回。
pub async fn prune_groups<S>(
    service: &PartitionService<'_, S>,
    candidates: &[PartitionGroupLink],
    policy: InUsePolicy,
    actor: Actor,
) -> Result<PruneOutcome>
where
    S: ContentStore + ?Sized,
{
    let mut outcome = PruneOutcome::default();
    let mut course = service.get_course().await?;

    for link in candidates {
        let group = GroupRef::from(link);
        service.get_user_partition(&course, link.partition_id)?;

        let usage = service.usage(&course).await?;
        let usages = usage.usages(link.partition_id, link.group_id);
        if !usages.is_empty() {
            match policy {
                InUsePolicy::Abort => {
                    return Err(MigrationError::GroupInUse {
                        partition: link.partition_id,
                        group: link.group_id,
                        usages: usages.to_vec(),
                    });
                }
                InUsePolicy::Warn => {
                    warn!(
                        course = %service.course_key(),
                        partition = %link.partition_id,
                        group = %link.group_id,
                        usages = usages.len(),
                        "content group still in use, keeping it"
                    );
                    outcome.retained_in_use.push(group);
                    continue;
                }
            }
        }

        let removed = course
            .partition_mut(link.partition_id)
            .is_some_and(|partition| partition.remove_group(link.group_id));
        if removed {
            outcome.pruned.push(group);
        } else {
            debug!(
                partition = %link.partition_id,
                group = %link.group_id,
                "content group already absent"
            );
        }

        service.update_course(&course, actor).await?;
    }

    Ok(outcome)
}
