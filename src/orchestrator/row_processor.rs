//! 单行处理器 - 编排层
//!
//! 按分析声明顺序处理单行的所有 (行, 分析) 单元

use std::sync::atomic::{AtomicBool, Ordering};
use tokio::time::{sleep, Duration};
use tracing::{error, info};

use crate::error::AppResult;
use crate::models::{AnalysisSpec, CellState, DataTable};
use crate::services::{ErrorLog, RequestScheduler};

/// 行内单元统计
#[derive(Debug, Default)]
pub struct RowStats {
    pub succeeded: usize,
    pub failed: usize,
}

/// 运行提前结束的原因
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// 每日请求配额耗尽
    DailyQuotaExhausted,
    /// 收到协作式停止请求
    ShutdownRequested,
}

/// 单行处理结果
#[derive(Debug)]
pub struct RowRun {
    pub stats: RowStats,
    pub stopped: Option<StopReason>,
}

/// 行处理上下文（运行期间不变的部分）
pub struct RowContext<'a> {
    pub analyses: &'a [AnalysisSpec],
    pub output_columns: &'a [usize],
    pub review_column: usize,
    pub progress_path: &'a str,
    pub politeness_delay: Duration,
    pub verbose_logging: bool,
}

/// 处理单行的所有分析单元
///
/// # 参数
/// - `cells`: 该行的单元状态（与 `ctx.analyses` 等长）
/// - `row_index`: 行索引（0 起）
/// - `shutdown`: 协作式停止标志，每个单元开始前检查一次
///
/// # 返回
/// 行内统计与提前结束原因。单个单元失败记入错误日志后继续处理下一个
/// 单元；只有每日配额耗尽和停止请求会结束运行，且都发生在检查点之后，
/// 不会在写入中途停止。
pub async fn process_row(
    scheduler: &mut RequestScheduler,
    table: &mut DataTable,
    error_log: &mut ErrorLog,
    cells: &mut [CellState],
    ctx: &RowContext<'_>,
    row_index: usize,
    shutdown: &AtomicBool,
) -> AppResult<RowRun> {
    let total = ctx.analyses.len();
    let review_text = table
        .get(row_index, ctx.review_column)
        .unwrap_or("")
        .to_string();

    log_row_start(row_index, &review_text);

    let mut stats = RowStats::default();

    for (analysis_index, spec) in ctx.analyses.iter().enumerate() {
        if shutdown.load(Ordering::SeqCst) {
            info!("🛑 收到停止请求，在上一个检查点处停止");
            return Ok(RowRun {
                stats,
                stopped: Some(StopReason::ShutdownRequested),
            });
        }

        log_cell_start(row_index, analysis_index, total, &spec.column);

        match scheduler.generate(&spec.prompt, &review_text).await {
            Ok(text) => {
                table.set(row_index, ctx.output_columns[analysis_index], text.clone());
                cells[analysis_index] = CellState::Success;
                // 先保存整表快照再继续，单元完成即持久化
                table.save_csv(ctx.progress_path).await?;
                stats.succeeded += 1;
                log_cell_success(row_index, analysis_index, &text, ctx.verbose_logging);
            }
            Err(err) if err.is_daily_quota_exceeded() => {
                error!("[行 {}] 🚫 {}", row_index + 1, err);
                return Ok(RowRun {
                    stats,
                    stopped: Some(StopReason::DailyQuotaExhausted),
                });
            }
            Err(err) => {
                cells[analysis_index] = CellState::Failed;
                error!(
                    "[行 {}] ❌ 分析 {} 失败: {}",
                    row_index + 1,
                    analysis_index + 1,
                    err
                );
                error_log.append(row_index, analysis_index, err.to_string());
                stats.failed += 1;
            }
        }

        // 单元之间的固定间隔，独立于配额状态
        if ctx.politeness_delay > Duration::ZERO {
            sleep(ctx.politeness_delay).await;
        }
    }

    log_row_complete(row_index, &stats, total);

    Ok(RowRun {
        stats,
        stopped: None,
    })
}

/// 截断长文本用于日志显示
pub fn truncate_text(text: &str, max_len: usize) -> String {
    if text.chars().count() > max_len {
        text.chars().take(max_len).collect::<String>() + "..."
    } else {
        text.to_string()
    }
}

// ========== 日志辅助函数 ==========

fn log_row_start(row_index: usize, review_text: &str) {
    info!("\n[行 {}] {}", row_index + 1, "─".repeat(30));
    info!(
        "[行 {}] 评论内容: {}",
        row_index + 1,
        truncate_text(review_text, 80)
    );
}

fn log_cell_start(row_index: usize, analysis_index: usize, total: usize, column: &str) {
    info!(
        "[行 {}] 🤖 分析 {}/{} ({})...",
        row_index + 1,
        analysis_index + 1,
        total,
        column
    );
}

fn log_cell_success(row_index: usize, analysis_index: usize, text: &str, verbose: bool) {
    if verbose {
        info!(
            "[行 {}] ✓ 分析 {} 结果: {}",
            row_index + 1,
            analysis_index + 1,
            truncate_text(text, 120)
        );
    } else {
        info!("[行 {}] ✓ 分析 {} 完成", row_index + 1, analysis_index + 1);
    }
}

fn log_row_complete(row_index: usize, stats: &RowStats, total: usize) {
    info!(
        "[行 {}] 单元统计: 成功 {}, 失败 {}, 总计 {}",
        row_index + 1,
        stats.succeeded,
        stats.failed,
        total
    );
}
