//! cohort-track-migrate 命令行入口
//!
//! 加载配置与数据快照，执行全部启用的迁移指令，成功后写回快照。
//! 失败时打印错误并以非零状态码退出。
use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use cohort_track_migrate::common::init_tracing;
use cohort_track_migrate::{
    MemoryPersistence, MigrationConfig, MigrationError, MigrationJobBuilder, StoreSnapshot,
};

#[derive(Parser, Debug)]
#[command(name = "cohort-track-migrate")]
#[command(about = "Move course content gating from verified-track cohorts to enrollment tracks")]
struct Cli {
    /// 配置文件路径 (TOML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// 数据快照路径 (JSON)，覆盖配置中的 store.data_path
    #[arg(short, long)]
    data: Option<PathBuf>,

    /// 只运行不写回快照
    #[arg(long)]
    dry_run: bool,

    /// 输出 debug 日志
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            let code = err
                .downcast_ref::<MigrationError>()
                .map_or(2, MigrationError::exit_code);
            tracing::error!(error = %format!("{err:#}"), "cohort migration failed");
            ExitCode::from(code as u8)
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let mut config = match &cli.config {
        Some(path) => MigrationConfig::load(path)
            .with_context(|| format!("load config: {}", path.display()))?,
        None => MigrationConfig::default(),
    };
    if let Some(data) = cli.data {
        config.store.data_path = Some(data);
    }
    config.validate()?;

    let data_path = config
        .store
        .data_path
        .clone()
        .ok_or_else(|| MigrationError::Config("no data snapshot given (--data)".to_string()))?;

    let snapshot = StoreSnapshot::read_from(&data_path)
        .with_context(|| format!("read data snapshot: {}", data_path.display()))?;
    let store = Arc::new(MemoryPersistence::from_snapshot(snapshot));

    let job = MigrationJobBuilder::new()
        .store(store.clone())
        .config(config.job.clone())
        .build()?;
    let report = job.run(config.job.actor).await?;

    if cli.dry_run || !config.store.write_back {
        tracing::info!(path = %data_path.display(), "dry run, data snapshot left untouched");
    } else {
        store
            .snapshot()
            .write_to(&data_path)
            .with_context(|| format!("write data snapshot: {}", data_path.display()))?;
    }

    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
