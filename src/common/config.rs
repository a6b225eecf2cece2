use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::common::error::{MigrationError, Result};
use crate::common::model::{Actor, PartitionId};

/// enrollment track 分组的保留 ID
pub const ENROLLMENT_TRACK_PARTITION_ID: PartitionId = PartitionId(50);

/// 成员组仍被引用时的处理策略
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InUsePolicy {
    /// 中止整次运行 (默认)
    Abort,
    /// 记录警告，保留该成员组，继续处理
    Warn,
}

// ==========================================
// 1. 任务配置 (JobConfig)
// ==========================================

/// 迁移任务行为配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct JobConfig {
    /// enrollment track 分组 ID
    ///
    /// - 说明: 改写后的访问规则只包含这一个分组。
    /// - 默认值: 50
    pub enrollment_track_partition_id: PartitionId,

    /// 默认执行者
    ///
    /// - 说明: 命令行入口传给 `run()` 的身份，所有写操作都会记录它。
    /// - 默认值: -1 (管理命令)
    pub actor: Actor,

    /// 成员组仍被引用时的处理策略
    ///
    /// - 默认值: `abort`
    pub in_use_policy: InUsePolicy,
}

impl Default for JobConfig {
    fn default() -> Self {
        Self {
            enrollment_track_partition_id: ENROLLMENT_TRACK_PARTITION_ID,
            actor: Actor::MGMT_COMMAND,
            in_use_policy: InUsePolicy::Abort,
        }
    }
}

// ==========================================
// 2. 存储配置 (StoreConfig)
// ==========================================

/// 数据快照文件配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// 数据快照路径 (JSON)
    ///
    /// - 默认值: 无，必须由配置文件或命令行提供
    pub data_path: Option<PathBuf>,

    /// 运行成功后是否写回快照
    ///
    /// - 默认值: true
    pub write_back: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            data_path: None,
            write_back: true,
        }
    }
}

// ==========================================
// 3. 总配置入口 (MigrationConfig)
// ==========================================

/// 迁移总配置
///
/// 分层结构，支持直接从 TOML 加载，缺省的段落使用默认值。
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MigrationConfig {
    #[serde(default)]
    pub job: JobConfig,

    #[serde(default)]
    pub store: StoreConfig,
}

impl MigrationConfig {
    /// 从 TOML 字符串解析
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let config: Self = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// 从文件加载
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    /// 校验配置
    pub fn validate(&self) -> Result<()> {
        if let Some(path) = &self.store.data_path {
            if path.as_os_str().is_empty() {
                return Err(MigrationError::Config(
                    "store.data_path must not be empty".to_string(),
                ));
            }
        }
        Ok(())
    }
}
