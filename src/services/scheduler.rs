//! 请求调度服务 - 业务能力层
//!
//! 负责单次生成请求的完整路径：组装提示词 → 估算 token 成本 →
//! 配额准入（可能阻塞等待）→ 通过活动代理发起调用。
//!
//! 只处理单个 (提示词, 评论) 组合，不出现行/分析索引，不关心批处理顺序。

use crate::clients::ContentGenerator;
use crate::error::AppResult;
use crate::services::QuotaTracker;
use tracing::debug;

/// 请求调度服务
pub struct RequestScheduler {
    generator: Box<dyn ContentGenerator>,
    tracker: QuotaTracker,
    separator: String,
}

impl RequestScheduler {
    /// 创建新的请求调度服务
    pub fn new(
        generator: Box<dyn ContentGenerator>,
        tracker: QuotaTracker,
        separator: impl Into<String>,
    ) -> Self {
        Self {
            generator,
            tracker,
            separator: separator.into(),
        }
    }

    /// 组装完整提示词：基础提示词 + 分隔文本 + 评论内容
    pub fn render_prompt(&self, template: &str, review: &str) -> String {
        format!("{} {} {}", template, self.separator, review)
    }

    /// 执行一次生成请求
    ///
    /// # 参数
    /// - `template`: 分析的基础提示词
    /// - `review`: 该行的评论文本
    ///
    /// # 返回
    /// 生成文本；响应结构缺失时为固定占位文本。
    /// 每日配额耗尽向上传播（运行级致命），其余错误由调用方按单元隔离。
    pub async fn generate(&mut self, template: &str, review: &str) -> AppResult<String> {
        let prompt = self.render_prompt(template, review);
        debug!("完整提示词长度: {} 字符", prompt.chars().count());

        let token_cost = self.generator.count_tokens(&prompt).await?;
        self.tracker.admit(token_cost).await?;

        self.generator.generate(&prompt).await
    }

    /// 配额计数状态（统计用）
    pub fn quota_state(&self) -> &crate::models::QuotaState {
        self.tracker.state()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::QuotaLimits;
    use async_trait::async_trait;

    struct FixedGenerator;

    #[async_trait]
    impl ContentGenerator for FixedGenerator {
        async fn count_tokens(&self, prompt: &str) -> AppResult<u64> {
            Ok(prompt.chars().count() as u64)
        }

        async fn generate(&self, _prompt: &str) -> AppResult<String> {
            Ok("positivo".to_string())
        }
    }

    fn scheduler() -> RequestScheduler {
        let limits = QuotaLimits {
            requests_per_minute: 10,
            tokens_per_minute: 100_000,
            requests_per_day: 100,
        };
        RequestScheduler::new(
            Box::new(FixedGenerator),
            QuotaTracker::new(limits),
            "Questo è il commento da analizzare:",
        )
    }

    #[test]
    fn test_render_prompt() {
        let scheduler = scheduler();
        let prompt = scheduler.render_prompt("Classifica il sentimento.", "Ottimo prodotto!");
        assert_eq!(
            prompt,
            "Classifica il sentimento. Questo è il commento da analizzare: Ottimo prodotto!"
        );
    }

    #[tokio::test]
    async fn test_generate_consumes_quota() {
        let mut scheduler = scheduler();
        let text = scheduler.generate("Classifica.", "Buono.").await.unwrap();
        assert_eq!(text, "positivo");
        assert_eq!(scheduler.quota_state().request_count_minute, 1);
        assert!(scheduler.quota_state().token_count_minute > 0);
    }
}
