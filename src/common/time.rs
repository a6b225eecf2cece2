use std::time::Instant;

use chrono::{DateTime, Utc};

/// 全局统一的时间工具
pub struct TimeUtils;

impl TimeUtils {
    /// 获取当前 UTC 时间
    /// 全系统统一使用这个方法获取"现在"，方便未来 Mock 或做时钟偏移
    pub fn now() -> DateTime<Utc> {
        Utc::now()
    }

    /// 从 `start` 起经过的毫秒数
    pub fn elapsed_ms(start: Instant) -> u64 {
        start.elapsed().as_millis() as u64
    }
}
