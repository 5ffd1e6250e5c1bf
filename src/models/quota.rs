//! 配额数据模型

use tokio::time::{Duration, Instant};

/// 分钟窗口时长
pub const MINUTE_WINDOW: Duration = Duration::from_secs(60);

/// 天窗口时长
pub const DAY_WINDOW: Duration = Duration::from_secs(86_400);

/// 配额限制
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuotaLimits {
    /// 每分钟请求数上限
    pub requests_per_minute: u32,
    /// 每分钟 token 数上限
    pub tokens_per_minute: u64,
    /// 每天请求数上限
    pub requests_per_day: u32,
}

/// 配额计数状态
///
/// 仅由 QuotaTracker 持有并通过 admit 操作修改，进程内有效，不跨运行持久化。
/// 计数在窗口 elapsed 时间达到窗口时长时归零，不依赖墙钟时刻的整除巧合。
#[derive(Debug, Clone, Copy)]
pub struct QuotaState {
    /// 当前分钟窗口起点
    pub minute_window_start: Instant,
    /// 分钟窗口内已admit的请求数
    pub request_count_minute: u32,
    /// 分钟窗口内已admit的 token 数
    pub token_count_minute: u64,
    /// 当前天窗口起点
    pub day_window_start: Instant,
    /// 天窗口内已admit的请求数
    pub request_count_day: u32,
}

impl QuotaState {
    /// 创建以 `now` 为两个窗口起点的空状态
    pub fn new(now: Instant) -> Self {
        Self {
            minute_window_start: now,
            request_count_minute: 0,
            token_count_minute: 0,
            day_window_start: now,
            request_count_day: 0,
        }
    }
}
