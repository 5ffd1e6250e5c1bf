//! 代理池服务 - 业务能力层
//!
//! 持有候选代理序列，按输入顺序逐个验证，第一个通过的候选被固定为
//! 本次运行的活动代理。
//!
//! 验证严格串行：并行探测会对被探测的服务造成自我制造的突发请求。
//! 选定之后不再重新验证，也不做运行中故障转移。

use crate::error::{AppError, AppResult, ProxyError};
use crate::models::ProxyDescriptor;
use std::future::Future;
use tracing::{info, warn};

/// 代理池
pub struct ProxyPool {
    candidates: Vec<ProxyDescriptor>,
    active: Option<ProxyDescriptor>,
}

impl ProxyPool {
    /// 以给定顺序的候选序列创建代理池
    pub fn new(candidates: Vec<ProxyDescriptor>) -> Self {
        Self {
            candidates,
            active: None,
        }
    }

    /// 当前活动代理
    pub fn active(&self) -> Option<&ProxyDescriptor> {
        self.active.as_ref()
    }

    /// 候选数量
    pub fn candidate_count(&self) -> usize {
        self.candidates.len()
    }

    /// 按顺序验证候选，选定第一个通过的代理
    ///
    /// # 参数
    /// - `test_fn`: 对单个候选发起一次真实探测请求，返回是否可用
    ///
    /// # 返回
    /// 第一个通过验证的候选；验证在首个成功处短路，之后的候选不再探测。
    /// 已有活动代理时直接返回，不重新探测。
    /// 所有候选都失败时返回 `ProxyError::NoWorkingProxy`。
    pub async fn select_working<F, Fut>(&mut self, test_fn: F) -> AppResult<ProxyDescriptor>
    where
        F: Fn(ProxyDescriptor) -> Fut,
        Fut: Future<Output = bool>,
    {
        if let Some(active) = &self.active {
            return Ok(active.clone());
        }

        let total = self.candidates.len();
        for (index, candidate) in self.candidates.iter().enumerate() {
            info!(
                "🌐 正在验证代理 {}/{}: {}",
                index + 1,
                total,
                candidate.endpoint()
            );

            if test_fn(candidate.clone()).await {
                info!("✓ 找到可用代理: {}", candidate.endpoint());
                self.active = Some(candidate.clone());
                return Ok(candidate.clone());
            }

            warn!("❌ 代理不可用: {}", candidate.endpoint());
        }

        Err(AppError::Proxy(ProxyError::NoWorkingProxy { tried: total }))
    }
}
