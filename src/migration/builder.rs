use std::sync::Arc;

use crate::common::error::{MigrationError, Result};
use crate::common::{InUsePolicy, JobConfig};
use crate::migration::job::CohortMigrationJob;
use crate::persistence::MigrationStore;

/// 迁移任务构建器
///
/// 用于一步步配置并生成 `CohortMigrationJob` 实例。
#[derive(Default)]
pub struct MigrationJobBuilder {
    /// 必填: 存储层
    store: Option<Arc<dyn MigrationStore>>,
    /// 选填: 任务配置 (默认 `JobConfig::default()`)
    config: Option<JobConfig>,
    /// 选填: 覆盖配置中的 in-use 策略
    in_use_policy: Option<InUsePolicy>,
}

impl MigrationJobBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// [必填] 注入存储层
    pub fn store<S>(mut self, store: Arc<S>) -> Self
    where
        S: MigrationStore + 'static,
    {
        self.store = Some(store);
        self
    }

    /// [可选] 任务配置
    pub fn config(mut self, config: JobConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// [可选] 覆盖 in-use 策略
    pub fn in_use_policy(mut self, policy: InUsePolicy) -> Self {
        self.in_use_policy = Some(policy);
        self
    }

    /// 构建任务
    pub fn build(self) -> Result<CohortMigrationJob> {
        let store = self
            .store
            .ok_or_else(|| MigrationError::Config("migration store is required".to_string()))?;

        let mut config = self.config.unwrap_or_default();
        if let Some(policy) = self.in_use_policy {
            config.in_use_policy = policy;
        }

        Ok(CohortMigrationJob::new(store, config))
    }
}
