//! # Review Analysis Batch
//!
//! 一个通过出口代理批量调用生成服务、为评论数据集追加分析列的 Rust 应用程序
//!
//! ## 架构设计
//!
//! 本系统采用严格的三层架构：
//!
//! ### ① 客户端层（Clients）
//! - `clients/` - 持有 HTTP 客户端，只暴露外部服务能力
//! - `GeminiClient` - 生成与 token 计数能力（经活动代理）
//! - `WebshareClient` - 代理列表获取能力（直连）
//!
//! ### ② 业务能力层（Services）
//! - `services/` - 描述"我能做什么"，只处理单次操作
//! - `QuotaTracker` - 分钟/天双窗口配额准入
//! - `ProxyPool` - 候选代理串行验证与选定
//! - `RequestScheduler` - 单次生成请求的组装与调度
//! - `ErrorLog` - 单元失败记录
//!
//! ### ③ 编排层（Orchestration）
//! - `orchestrator/batch_processor` - 批量处理器，管理资源与运行状态
//! - `orchestrator/row_processor` - 单行处理器，遍历分析列表
//!
//! ## 关键保证
//!
//! - 单元严格按行优先、行内按分析声明顺序执行，不重排不跳过
//! - 每个单元完成后立即保存整表快照，崩溃最多丢失进行中的单元
//! - 单个单元失败不会中止批处理，只有运行级资源耗尽才会提前结束

pub mod clients;
pub mod config;
pub mod error;
pub mod logger;
pub mod models;
pub mod orchestrator;
pub mod services;

// 重新导出常用类型
pub use clients::{probe_via_proxy, ContentGenerator, GeminiClient, WebshareClient};
pub use config::Config;
pub use error::{AppError, AppResult};
pub use models::{AnalysisSpec, CellState, DataTable, ProxyDescriptor, QuotaLimits, QuotaState};
pub use orchestrator::{App, BatchReport, BatchRunner, RunState, StopReason};
pub use services::{ErrorLog, ErrorRecord, ProxyPool, QuotaTracker, RequestScheduler};
