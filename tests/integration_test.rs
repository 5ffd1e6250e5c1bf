use async_trait::async_trait;
use review_analysis_batch::clients::{probe_via_proxy, ContentGenerator, GeminiClient, WebshareClient};
use review_analysis_batch::config::Config;
use review_analysis_batch::error::{AppError, AppResult};
use review_analysis_batch::logger;
use review_analysis_batch::models::{AnalysisSpec, CellState, DataTable, QuotaLimits};
use review_analysis_batch::orchestrator::{BatchRunner, RunState, StopReason};
use review_analysis_batch::services::{ProxyPool, QuotaTracker, RequestScheduler};
use std::sync::atomic::Ordering;
use std::sync::{Arc, Mutex};

/// 可编排的生成器：按提示词内容决定成功或失败，并记录调用顺序
struct ScriptedGenerator {
    /// 提示词同时包含这两个标记时返回失败
    fail_when_contains: Option<(String, String)>,
    prompts_seen: Arc<Mutex<Vec<String>>>,
}

impl ScriptedGenerator {
    fn ok() -> Self {
        Self {
            fail_when_contains: None,
            prompts_seen: Arc::new(Mutex::new(Vec::new())),
        }
    }

    fn failing_on(template_marker: &str, review_marker: &str) -> Self {
        Self {
            fail_when_contains: Some((template_marker.to_string(), review_marker.to_string())),
            prompts_seen: Arc::new(Mutex::new(Vec::new())),
        }
    }

    fn prompts_handle(&self) -> Arc<Mutex<Vec<String>>> {
        self.prompts_seen.clone()
    }
}

#[async_trait]
impl ContentGenerator for ScriptedGenerator {
    async fn count_tokens(&self, prompt: &str) -> AppResult<u64> {
        // 对提示词长度单调即可
        Ok(prompt.chars().count() as u64)
    }

    async fn generate(&self, prompt: &str) -> AppResult<String> {
        self.prompts_seen.lock().unwrap().push(prompt.to_string());

        if let Some((template_marker, review_marker)) = &self.fail_when_contains {
            if prompt.contains(template_marker) && prompt.contains(review_marker) {
                return Err(AppError::api_bad_status(
                    "generateContent",
                    500,
                    "errore simulato",
                ));
            }
        }

        Ok(format!("esito:{}", prompt.chars().count()))
    }
}

// ========== 构建辅助函数 ==========

fn test_config(dir: &tempfile::TempDir) -> Config {
    let path = |name: &str| dir.path().join(name).to_string_lossy().into_owned();
    Config {
        politeness_delay_secs: 0,
        progress_file: path("progress.csv"),
        final_file: path("final.csv"),
        error_log_file: path("error_log.txt"),
        ..Config::default()
    }
}

fn test_table(rows: usize) -> DataTable {
    let mut table = DataTable::new(vec!["review text".to_string()]);
    for i in 0..rows {
        table.push_row(vec![format!("recensione-{}", i)]);
    }
    table
}

fn test_analyses() -> Vec<AnalysisSpec> {
    vec![
        AnalysisSpec {
            column: "sentiment".to_string(),
            prompt: "analisi-0".to_string(),
        },
        AnalysisSpec {
            column: "topic".to_string(),
            prompt: "analisi-1".to_string(),
        },
    ]
}

fn open_limits() -> QuotaLimits {
    QuotaLimits {
        requests_per_minute: 1000,
        tokens_per_minute: 10_000_000,
        requests_per_day: 10_000,
    }
}

fn build_runner(
    dir: &tempfile::TempDir,
    rows: usize,
    generator: Box<dyn ContentGenerator>,
    limits: QuotaLimits,
) -> BatchRunner {
    let config = test_config(dir);
    let mut table = test_table(rows);
    let analyses = test_analyses();
    let review_column = table.require_column("review text").unwrap();
    let output_columns: Vec<usize> = analyses
        .iter()
        .map(|spec| table.ensure_column(&spec.column))
        .collect();
    let scheduler = RequestScheduler::new(
        generator,
        QuotaTracker::new(limits),
        config.prompt_separator.clone(),
    );

    BatchRunner::new(
        config,
        table,
        analyses,
        output_columns,
        review_column,
        scheduler,
    )
}

// ========== 批处理测试 ==========

/// N×M 个单元全部被尝试；单个单元失败只产生一条错误记录，
/// 不妨碍之后的单元成功
#[tokio::test]
async fn test_cell_failure_is_isolated() {
    let dir = tempfile::tempdir().unwrap();
    // 行 1 (0 起) 的分析 1 (0 起) 失败
    let generator = ScriptedGenerator::failing_on("analisi-1", "recensione-1");
    let mut runner = build_runner(&dir, 3, Box::new(generator), open_limits());

    let report = runner.run().await.unwrap();

    assert_eq!(report.total_cells, 6);
    assert_eq!(report.succeeded, 5);
    assert_eq!(report.failed, 1);
    assert_eq!(report.remaining, 0);
    assert_eq!(report.stopped, None);
    assert!(report.errors_present);
    assert_eq!(
        runner.state(),
        RunState::Completed {
            errors_present: true
        }
    );

    // 失败的单元之后的单元照常成功
    assert_eq!(runner.cells()[1][1], CellState::Failed);
    assert_eq!(runner.cells()[2][0], CellState::Success);
    assert_eq!(runner.cells()[2][1], CellState::Success);

    // 恰好一条错误记录，指向正确的单元
    let records = runner.error_log().records();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].row_index, 1);
    assert_eq!(records[0].analysis_index, 1);

    // 错误日志文件一行一条失败，编号按 1 起显示
    let log_content = std::fs::read_to_string(&runner.config().error_log_file).unwrap();
    let lines: Vec<&str> = log_content.lines().collect();
    assert_eq!(lines.len(), 1);
    assert!(lines[0].contains("行 2, 分析 2"));

    // 最终导出：失败单元为空，其余已填充
    let final_content = std::fs::read_to_string(&runner.config().final_file).unwrap();
    let final_table = DataTable::from_csv_str(&final_content, "final.csv").unwrap();
    let topic = final_table.require_column("topic").unwrap();
    let sentiment = final_table.require_column("sentiment").unwrap();
    assert_eq!(final_table.get(1, topic), Some(""));
    assert!(!final_table.get(1, sentiment).unwrap().is_empty());
    assert!(!final_table.get(2, topic).unwrap().is_empty());
}

/// 单元严格按行优先、行内按分析声明顺序执行
#[tokio::test]
async fn test_row_major_iteration_order() {
    let dir = tempfile::tempdir().unwrap();
    let generator = ScriptedGenerator::ok();
    let prompts = generator.prompts_handle();
    let mut runner = build_runner(&dir, 2, Box::new(generator), open_limits());

    runner.run().await.unwrap();

    let seen = prompts.lock().unwrap();
    let expected = [
        ("analisi-0", "recensione-0"),
        ("analisi-1", "recensione-0"),
        ("analisi-0", "recensione-1"),
        ("analisi-1", "recensione-1"),
    ];
    assert_eq!(seen.len(), expected.len());
    for (prompt, (template, review)) in seen.iter().zip(expected.iter()) {
        assert!(prompt.contains(template), "提示词顺序不符: {}", prompt);
        assert!(prompt.contains(review), "提示词顺序不符: {}", prompt);
    }
}

/// 每日配额耗尽时优雅停止：已完成进度保留在快照中，
/// 快照恰好包含迭代顺序上的前缀，不多不少
#[tokio::test]
async fn test_daily_quota_stops_gracefully() {
    let dir = tempfile::tempdir().unwrap();
    let limits = QuotaLimits {
        requests_per_minute: 1000,
        tokens_per_minute: 10_000_000,
        requests_per_day: 3,
    };
    let mut runner = build_runner(&dir, 2, Box::new(ScriptedGenerator::ok()), limits);

    let report = runner.run().await.unwrap();

    assert_eq!(report.stopped, Some(StopReason::DailyQuotaExhausted));
    assert_eq!(report.succeeded, 3);
    assert_eq!(report.failed, 0);
    assert_eq!(report.remaining, 1);
    assert!(!report.errors_present);
    assert_eq!(
        runner.state(),
        RunState::Completed {
            errors_present: false
        }
    );

    // 进度快照：前 3 个单元已填充，第 4 个为空
    let progress_content = std::fs::read_to_string(&runner.config().progress_file).unwrap();
    let progress = DataTable::from_csv_str(&progress_content, "progress.csv").unwrap();
    let sentiment = progress.require_column("sentiment").unwrap();
    let topic = progress.require_column("topic").unwrap();
    assert!(!progress.get(0, sentiment).unwrap().is_empty());
    assert!(!progress.get(0, topic).unwrap().is_empty());
    assert!(!progress.get(1, sentiment).unwrap().is_empty());
    assert_eq!(progress.get(1, topic), Some(""));

    // 未被准入的单元保持 Pending
    assert_eq!(runner.cells()[1][1], CellState::Pending);

    // 最终导出与空错误日志同样写出
    assert!(std::path::Path::new(&runner.config().final_file).exists());
    assert!(std::path::Path::new(&runner.config().error_log_file).exists());
}

/// 停止请求在任何单元开始前生效时，不处理任何单元
#[tokio::test]
async fn test_shutdown_before_first_cell() {
    let dir = tempfile::tempdir().unwrap();
    let mut runner = build_runner(&dir, 2, Box::new(ScriptedGenerator::ok()), open_limits());

    runner.shutdown_handle().store(true, Ordering::SeqCst);
    let report = runner.run().await.unwrap();

    assert_eq!(report.stopped, Some(StopReason::ShutdownRequested));
    assert_eq!(report.succeeded, 0);
    assert_eq!(report.remaining, 4);
    for row in runner.cells() {
        for cell in row {
            assert_eq!(*cell, CellState::Pending);
        }
    }
}

// ========== 真实服务测试（需要凭据，默认忽略） ==========

#[tokio::test]
#[ignore] // 默认忽略，需要手动运行：cargo test -- --ignored
async fn test_fetch_proxies_live() {
    // 初始化日志
    logger::init();

    // 加载配置
    let config = Config::from_env();

    let client = WebshareClient::new(&config);
    let proxies = client.fetch_proxies().await.expect("获取代理列表失败");

    println!("找到 {} 个代理", proxies.len());
    assert!(!proxies.is_empty(), "应该至少返回一个代理");
}

#[tokio::test]
#[ignore]
async fn test_generate_through_proxy_live() {
    // 初始化日志
    logger::init();

    // 加载配置
    let config = Config::from_env();

    // 获取并验证代理
    let client = WebshareClient::new(&config);
    let candidates = client.fetch_proxies().await.expect("获取代理列表失败");
    let mut pool = ProxyPool::new(candidates);
    let probe_config = config.clone();
    let active = pool
        .select_working(|candidate| {
            let config = probe_config.clone();
            async move { probe_via_proxy(&config, &candidate).await }
        })
        .await
        .expect("没有可用代理");

    // 通过活动代理发起一次真实生成请求
    let gemini = GeminiClient::with_proxy(&config, &active).expect("构建生成客户端失败");
    let mut scheduler = RequestScheduler::new(
        Box::new(gemini),
        QuotaTracker::new(config.quota_limits()),
        config.prompt_separator.clone(),
    );

    let text = scheduler
        .generate(
            "Classifica il sentimento della recensione in positivo, negativo o neutro.",
            "Prodotto fantastico, lo ricomprerei subito.",
        )
        .await
        .expect("生成请求失败");

    println!("生成结果: {}", text);
    assert!(!text.is_empty());
}
