//! 配额准入服务 - 业务能力层
//!
//! 跟踪分钟/天两个窗口的请求与 token 预算，在发起每次生成请求之前
//! 决定放行、等待或失败。
//!
//! ## 窗口语义
//! - 固定窗口，起点记录在状态里；elapsed 达到窗口时长即重置计数
//! - 分钟窗口满时阻塞等待到窗口结束，然后重新评估（循环而非递归，
//!   长批次下调用栈深度恒定）
//! - 天窗口满是致命错误，由调用方终止剩余批次
//!
//! token 计数由外部计数器提供，其自身延迟可能跨越窗口边界，计数
//! 因此是近似值。

use crate::error::{AppError, AppResult, QuotaError};
use crate::models::{QuotaLimits, QuotaState, DAY_WINDOW, MINUTE_WINDOW};
use tokio::time::{sleep, Instant};
use tracing::{debug, warn};

/// 配额准入服务
///
/// 职责：
/// - 独占持有 QuotaState，状态只通过 admit 变化
/// - 只处理单次准入决定
/// - 不发起任何网络请求
/// - 不关心调用顺序
pub struct QuotaTracker {
    limits: QuotaLimits,
    state: QuotaState,
}

impl QuotaTracker {
    /// 创建新的配额准入服务，两个窗口从当前时刻开始
    pub fn new(limits: QuotaLimits) -> Self {
        Self {
            limits,
            state: QuotaState::new(Instant::now()),
        }
    }

    /// 当前计数状态（测试与统计用）
    pub fn state(&self) -> &QuotaState {
        &self.state
    }

    /// 请求准入
    ///
    /// # 参数
    /// - `token_cost`: 本次请求的预估 token 成本
    ///
    /// # 返回
    /// 放行时返回 Ok；每日配额耗尽时返回 `QuotaError::DailyQuotaExceeded`。
    /// 分钟配额满时在内部等待剩余窗口时间后重新评估，不向调用方暴露。
    pub async fn admit(&mut self, token_cost: u64) -> AppResult<()> {
        loop {
            let now = Instant::now();

            // 窗口重置以 elapsed 时间为准
            if now.duration_since(self.state.minute_window_start) >= MINUTE_WINDOW {
                self.state.request_count_minute = 0;
                self.state.token_count_minute = 0;
                self.state.minute_window_start = now;
            }
            if now.duration_since(self.state.day_window_start) >= DAY_WINDOW {
                self.state.request_count_day = 0;
                self.state.day_window_start = now;
            }

            if self.state.request_count_day >= self.limits.requests_per_day {
                return Err(AppError::Quota(QuotaError::DailyQuotaExceeded {
                    limit: self.limits.requests_per_day,
                }));
            }

            let request_slot_free =
                self.state.request_count_minute < self.limits.requests_per_minute;
            let token_budget_free =
                self.state.token_count_minute + token_cost <= self.limits.tokens_per_minute;

            if !request_slot_free || !token_budget_free {
                // 等待到分钟窗口结束再重新评估；上面刚保证 elapsed < 窗口时长，
                // 等待时间不会为负
                let wait = MINUTE_WINDOW - now.duration_since(self.state.minute_window_start);
                warn!(
                    "⏳ 达到每分钟配额上限，等待 {:.1} 秒后重试...",
                    wait.as_secs_f64()
                );
                sleep(wait).await;
                continue;
            }

            self.state.request_count_minute += 1;
            self.state.token_count_minute += token_cost;
            self.state.request_count_day += 1;

            debug!(
                "✓ 准入: 分钟窗口 {}/{} 次, {}/{} token, 今日 {}/{} 次",
                self.state.request_count_minute,
                self.limits.requests_per_minute,
                self.state.token_count_minute,
                self.limits.tokens_per_minute,
                self.state.request_count_day,
                self.limits.requests_per_day
            );

            return Ok(());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::{advance, Duration};

    fn limits(rpm: u32, tpm: u64, rpd: u32) -> QuotaLimits {
        QuotaLimits {
            requests_per_minute: rpm,
            tokens_per_minute: tpm,
            requests_per_day: rpd,
        }
    }

    /// 背靠背三次 10 token 请求：前两次立即放行，第三次阻塞到窗口重置
    #[tokio::test(start_paused = true)]
    async fn test_minute_limit_blocks_third_request() {
        let mut tracker = QuotaTracker::new(limits(2, 1000, 100));

        tracker.admit(10).await.unwrap();
        tracker.admit(10).await.unwrap();
        assert_eq!(tracker.state().request_count_minute, 2);
        assert_eq!(tracker.state().token_count_minute, 20);

        let before = Instant::now();
        tracker.admit(10).await.unwrap();
        let waited = Instant::now().duration_since(before);

        // 第三次请求等满剩余窗口时间后在新窗口放行
        assert!(waited >= Duration::from_secs(60) && waited < Duration::from_secs(61));
        assert_eq!(tracker.state().request_count_minute, 1);
        assert_eq!(tracker.state().token_count_minute, 10);
    }

    /// 阻塞时长恰好是窗口剩余时间，而不是完整窗口
    #[tokio::test(start_paused = true)]
    async fn test_wait_is_remaining_window_time() {
        let mut tracker = QuotaTracker::new(limits(1, 1000, 100));

        tracker.admit(5).await.unwrap();
        advance(Duration::from_secs(20)).await;

        let before = Instant::now();
        tracker.admit(5).await.unwrap();
        let waited = Instant::now().duration_since(before);

        assert!(waited >= Duration::from_secs(40) && waited < Duration::from_secs(41));
    }

    /// token 预算满同样触发阻塞等待，请求数未满也一样
    #[tokio::test(start_paused = true)]
    async fn test_token_budget_blocks() {
        let mut tracker = QuotaTracker::new(limits(10, 100, 100));

        tracker.admit(60).await.unwrap();

        let before = Instant::now();
        tracker.admit(50).await.unwrap();
        let waited = Instant::now().duration_since(before);

        assert!(waited >= Duration::from_secs(60));
        assert_eq!(tracker.state().token_count_minute, 50);
    }

    /// 窗口过期后计数重置，请求立即放行
    #[tokio::test(start_paused = true)]
    async fn test_window_reset_after_elapsed() {
        let mut tracker = QuotaTracker::new(limits(1, 1000, 100));

        tracker.admit(5).await.unwrap();
        advance(Duration::from_secs(60)).await;

        let before = Instant::now();
        tracker.admit(5).await.unwrap();
        let waited = Instant::now().duration_since(before);

        assert!(waited < Duration::from_secs(1));
        assert_eq!(tracker.state().request_count_minute, 1);
    }

    /// 超过每日上限的首次尝试失败，之后的尝试持续失败
    #[tokio::test(start_paused = true)]
    async fn test_daily_limit_is_fatal() {
        let mut tracker = QuotaTracker::new(limits(10, 1000, 2));

        tracker.admit(1).await.unwrap();
        tracker.admit(1).await.unwrap();

        let err = tracker.admit(1).await.unwrap_err();
        assert!(err.is_daily_quota_exceeded());
        // 计数不会因失败的尝试而变化
        assert_eq!(tracker.state().request_count_day, 2);

        let err = tracker.admit(1).await.unwrap_err();
        assert!(err.is_daily_quota_exceeded());
    }
}
