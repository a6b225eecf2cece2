use std::sync::OnceLock;

use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

static TRACING_INIT: OnceLock<()> = OnceLock::new();

/// 初始化日志输出
///
/// - 优先读取 `RUST_LOG`，否则 `verbose` 时为 `debug`，默认 `info`。
/// - 输出到 stderr。
/// - 重复调用是安全的，只有第一次生效。
pub fn init_tracing(verbose: bool) {
    TRACING_INIT.get_or_init(|| {
        let default_level = if verbose { "debug" } else { "info" };
        let filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
        // stdout 留给运行报告
        let fmt_layer = tracing_subscriber::fmt::layer()
            .with_target(false)
            .with_writer(std::io::stderr);
        let _ = tracing_subscriber::registry()
            .with(filter)
            .with(fmt_layer)
            .try_init();
    });
}
