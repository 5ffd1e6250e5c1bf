//! 编排层（Orchestration Layer）
//!
//! ## 职责
//!
//! 本层负责批量处理和流程调度，是整个系统的"指挥中心"。
//!
//! ## 模块划分
//!
//! ### `batch_processor` - 批量处理器
//! - 管理应用生命周期（初始化、运行、收尾）
//! - 获取代理列表并串行验证选定活动代理
//! - 行优先驱动全部 (行, 分析) 单元
//! - 维护运行状态机与单元状态网格
//! - 导出最终产物并输出全局统计
//!
//! ### `row_processor` - 单行处理器
//! - 按分析声明顺序处理单行的所有单元
//! - 单元失败隔离：失败记入错误日志后继续
//! - 每个成功单元之后立即保存整表快照
//! - 每个单元之间的固定间隔
//!
//! ## 层次关系
//!
//! ```text
//! batch_processor (处理整个数据表)
//!     ↓
//! row_processor (处理单行 × Vec<AnalysisSpec>)
//!     ↓
//! services (能力层：quota / proxy / scheduler / error_log)
//!     ↓
//! clients (客户端：生成服务 / 代理列表服务)
//! ```
//!
//! ## 设计原则
//!
//! 1. **单一职责**：batch_processor 管批量，row_processor 管单行
//! 2. **严格串行**：单工作者，单元之间不并发发起请求
//! 3. **失败隔离**：只有运行级资源耗尽才会离开单元循环
//! 4. **先保存再继续**：崩溃最多丢失进行中的单元

pub mod batch_processor;
pub mod row_processor;

pub use batch_processor::{App, BatchReport, BatchRunner, RunState};
pub use row_processor::{process_row, RowContext, RowRun, RowStats, StopReason};
