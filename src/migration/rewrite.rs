use crate::common::{AccessRules, GroupId, PartitionGroupLink, PartitionId};

/// 改写目标：enrollment track 分组及两个选课模式的 ID
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrackTarget {
    pub partition: PartitionId,
    pub audit: GroupId,
    pub verified: GroupId,
}

/// 跳过原因
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// 没有访问规则
    NoAccessRules,
    /// 访问规则没有引用任何待迁移的 cohort
    NoCohortReference,
}

/// 单个内容单元的改写决定
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RewriteDecision {
    Skip(SkipReason),
    Rewrite(AccessRules),
}

/// 计算一个内容单元的新访问规则
///
/// - audit: 任一 audit 绑定的 (分组, 成员组) 出现在规则中。
/// - verified: verified 绑定的 (分组, 成员组) 出现在规则中。
///
/// 命中时新规则只包含 enrollment track 分组，audit 在前，verified 在后。
pub fn plan_rewrite(
    access: &AccessRules,
    audit_links: &[PartitionGroupLink],
    verified_link: &PartitionGroupLink,
    target: &TrackTarget,
) -> RewriteDecision {
    if access.is_empty() {
        return RewriteDecision::Skip(SkipReason::NoAccessRules);
    }

    let audit = audit_links
        .iter()
        .any(|link| access.grants(link.partition_id, link.group_id));
    let verified = access.grants(verified_link.partition_id, verified_link.group_id);

    let mut groups = Vec::with_capacity(2);
    if audit {
        groups.push(target.audit);
    }
    if verified {
        groups.push(target.verified);
    }

    if groups.is_empty() {
        RewriteDecision::Skip(SkipReason::NoCohortReference)
    } else {
        RewriteDecision::Rewrite(AccessRules::single(target.partition, groups))
    }
}
