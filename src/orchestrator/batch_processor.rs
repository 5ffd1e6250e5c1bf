//! 批量处理器 - 编排层
//!
//! ## 职责
//!
//! 本模块是整个应用的入口，负责批量单元的处理和资源管理。
//!
//! ## 核心功能
//!
//! 1. **应用初始化**：校验配置、加载数据集与分析配置
//! 2. **代理选定**：获取候选列表，串行验证，首个可用者固定为活动代理
//! 3. **严格串行**：单工作者按行优先顺序驱动全部单元
//! 4. **失败隔离**：单元失败不会中止批处理
//! 5. **进度持久化**：每个单元之后整表快照，运行结束时最终导出
//! 6. **全局统计**：汇总所有单元的处理结果

use anyhow::Result;
use std::fs;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::time::Duration;
use tracing::{info, warn};

use crate::clients::{probe_via_proxy, GeminiClient, WebshareClient};
use crate::config::Config;
use crate::error::AppResult;
use crate::models::{load_analysis_specs, AnalysisSpec, CellState, DataTable};
use crate::orchestrator::row_processor::{self, RowContext, StopReason};
use crate::services::{ErrorLog, ProxyPool, QuotaTracker, RequestScheduler};

/// 运行状态机
///
/// Idle → Running → Completed；单元状态的流转不会让运行提前离开 Running
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Idle,
    Running,
    Completed { errors_present: bool },
}

/// 批处理最终报告
#[derive(Debug)]
pub struct BatchReport {
    pub total_cells: usize,
    pub succeeded: usize,
    pub failed: usize,
    /// 因提前结束未处理的单元数
    pub remaining: usize,
    pub stopped: Option<StopReason>,
    pub errors_present: bool,
}

/// 应用主结构
pub struct App {
    runner: BatchRunner,
}

impl App {
    /// 初始化应用
    pub async fn initialize(config: Config) -> Result<Self> {
        // 初始化日志文件
        init_log_file(&config.output_log_file)?;

        log_startup(&config);

        config.validate()?;

        // 加载分析配置与数据集
        let analyses = load_analysis_specs(&config.analyses_file).await?;
        let mut table = DataTable::load_csv(&config.input_file).await?;
        let review_column = table.require_column(&config.review_column)?;
        info!(
            "✓ 加载数据集: {} 行 ({})",
            table.row_count(),
            config.input_file
        );

        let output_columns: Vec<usize> = analyses
            .iter()
            .map(|spec| table.ensure_column(&spec.column))
            .collect();
        let column_names: Vec<&str> = analyses.iter().map(|spec| spec.column.as_str()).collect();
        info!("📝 将填充的分析列: {}", column_names.join(", "));

        // 获取候选代理并串行验证选定
        let webshare = WebshareClient::new(&config);
        let candidates = webshare.fetch_proxies().await?;
        let mut pool = ProxyPool::new(candidates);
        let probe_config = config.clone();
        let active = pool
            .select_working(|candidate| {
                let config = probe_config.clone();
                async move { probe_via_proxy(&config, &candidate).await }
            })
            .await?;

        // 活动代理固定后只构建一次生成客户端
        let client = GeminiClient::with_proxy(&config, &active)?;
        let scheduler = RequestScheduler::new(
            Box::new(client),
            QuotaTracker::new(config.quota_limits()),
            config.prompt_separator.clone(),
        );

        let runner = BatchRunner::new(
            config,
            table,
            analyses,
            output_columns,
            review_column,
            scheduler,
        );

        Ok(Self { runner })
    }

    /// 运行应用主逻辑
    pub async fn run(mut self) -> Result<()> {
        // Ctrl-C 触发协作式停止，在当前单元检查点之后生效
        let shutdown = self.runner.shutdown_handle();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("🛑 收到中断信号，将在当前单元检查点之后停止...");
                shutdown.store(true, Ordering::SeqCst);
            }
        });

        let report = self.runner.run().await?;

        print_final_stats(&report, self.runner.config());

        Ok(())
    }
}

/// 批处理运行器
///
/// 职责：
/// - 独占持有数据表、分析配置、调度器与单元状态网格
/// - 行优先、行内按分析声明顺序驱动全部单元，顺序严格可重现
/// - 只有运行级资源耗尽（每日配额）和停止请求会离开单元循环
/// - 运行结束时导出最终表格并刷新错误日志，提前结束时同样执行
pub struct BatchRunner {
    config: Config,
    table: DataTable,
    analyses: Vec<AnalysisSpec>,
    output_columns: Vec<usize>,
    review_column: usize,
    scheduler: RequestScheduler,
    error_log: ErrorLog,
    cells: Vec<Vec<CellState>>,
    state: RunState,
    shutdown: Arc<AtomicBool>,
}

impl BatchRunner {
    /// 创建新的批处理运行器
    ///
    /// 代理已在外部选定，调度器已装配完成
    pub fn new(
        config: Config,
        table: DataTable,
        analyses: Vec<AnalysisSpec>,
        output_columns: Vec<usize>,
        review_column: usize,
        scheduler: RequestScheduler,
    ) -> Self {
        let cells = vec![vec![CellState::Pending; analyses.len()]; table.row_count()];
        let error_log = ErrorLog::new(config.error_log_file.clone());

        Self {
            config,
            table,
            analyses,
            output_columns,
            review_column,
            scheduler,
            error_log,
            cells,
            state: RunState::Idle,
            shutdown: Arc::new(AtomicBool::new(false)),
        }
    }

    /// 协作式停止句柄
    pub fn shutdown_handle(&self) -> Arc<AtomicBool> {
        self.shutdown.clone()
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    pub fn cells(&self) -> &[Vec<CellState>] {
        &self.cells
    }

    pub fn table(&self) -> &DataTable {
        &self.table
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn error_log(&self) -> &ErrorLog {
        &self.error_log
    }

    /// 运行全部单元
    pub async fn run(&mut self) -> AppResult<BatchReport> {
        self.state = RunState::Running;

        let total_rows = self.table.row_count();
        let total_cells = total_rows * self.analyses.len();

        if total_cells == 0 {
            warn!("⚠️ 数据集中没有待处理的单元");
        }

        log_batch_start(total_rows, self.analyses.len(), &self.config);

        let ctx = RowContext {
            analyses: &self.analyses,
            output_columns: &self.output_columns,
            review_column: self.review_column,
            progress_path: &self.config.progress_file,
            politeness_delay: Duration::from_secs(self.config.politeness_delay_secs),
            verbose_logging: self.config.verbose_logging,
        };

        let mut stats = BatchStats::default();
        let mut stopped = None;

        for row_index in 0..total_rows {
            let row_run = row_processor::process_row(
                &mut self.scheduler,
                &mut self.table,
                &mut self.error_log,
                &mut self.cells[row_index],
                &ctx,
                row_index,
                &self.shutdown,
            )
            .await?;

            stats.succeeded += row_run.stats.succeeded;
            stats.failed += row_run.stats.failed;

            if let Some(reason) = row_run.stopped {
                stopped = Some(reason);
                break;
            }
        }

        // 收尾：最终导出 + 错误日志刷新，提前结束时同样执行
        self.table.save_csv(&self.config.final_file).await?;
        self.error_log.flush().await?;

        let errors_present = !self.error_log.is_empty();
        let attempted = stats.succeeded + stats.failed;
        let report = BatchReport {
            total_cells,
            succeeded: stats.succeeded,
            failed: stats.failed,
            remaining: total_cells - attempted,
            stopped,
            errors_present,
        };

        self.state = RunState::Completed { errors_present };

        Ok(report)
    }
}

/// 处理统计
#[derive(Debug, Default)]
struct BatchStats {
    succeeded: usize,
    failed: usize,
}

// ========== 日志辅助函数 ==========

fn init_log_file(log_file_path: &str) -> Result<()> {
    let log_header = format!(
        "{}\n评论分析日志 - {}\n{}\n\n",
        "=".repeat(60),
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
        "=".repeat(60)
    );
    fs::write(log_file_path, log_header)?;
    Ok(())
}

fn log_startup(config: &Config) {
    info!("{}", "=".repeat(60));
    info!("🚀 程序启动 - 批量评论分析模式");
    info!(
        "📊 配额限制: {} 次/分钟, {} token/分钟, {} 次/天",
        config.requests_per_minute, config.tokens_per_minute, config.requests_per_day
    );
    info!("{}", "=".repeat(60));
}

fn log_batch_start(total_rows: usize, analyses: usize, config: &Config) {
    info!("\n{}", "=".repeat(60));
    info!(
        "📦 开始处理: {} 行 × {} 个分析 = {} 个单元",
        total_rows,
        analyses,
        total_rows * analyses
    );
    info!("📄 进度快照: {}", config.progress_file);
    info!("{}", "=".repeat(60));
}

fn print_final_stats(report: &BatchReport, config: &Config) {
    info!("\n{}", "=".repeat(60));
    info!("📊 全部处理完成统计");
    info!(
        "完成时间: {}",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    );
    info!("{}", "=".repeat(60));
    info!("✅ 成功: {}/{}", report.succeeded, report.total_cells);
    info!("❌ 失败: {}", report.failed);
    if report.remaining > 0 {
        warn!("⚠️ 尚有 {} 个单元未处理", report.remaining);
    }
    match report.stopped {
        Some(StopReason::DailyQuotaExhausted) => {
            warn!("🚫 已达每日请求上限，运行提前结束");
        }
        Some(StopReason::ShutdownRequested) => {
            warn!("🛑 因停止请求提前结束");
        }
        None => {}
    }
    if report.errors_present {
        warn!("⚠️ 发现错误，详见错误日志: {}", config.error_log_file);
    }
    info!("💾 最终结果已保存至: {}", config.final_file);
    info!("{}", "=".repeat(60));
}
