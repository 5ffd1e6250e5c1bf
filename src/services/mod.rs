//! 业务能力层
//!
//! 每个服务只负责一种能力，不关心批处理流程：
//! - `QuotaTracker` - 多窗口配额准入
//! - `ProxyPool` - 候选代理验证与选定
//! - `RequestScheduler` - 单次生成请求的组装与调度
//! - `ErrorLog` - 单元失败记录

pub mod error_log;
pub mod proxy_pool;
pub mod quota_tracker;
pub mod scheduler;

pub use error_log::{ErrorLog, ErrorRecord};
pub use proxy_pool::ProxyPool;
pub use quota_tracker::QuotaTracker;
pub use scheduler::RequestScheduler;
