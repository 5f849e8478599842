//! 批量图片处理器 - 编排层
//!
//! ## 职责
//!
//! 本模块是整个应用的入口，负责一次完整运行的编排。
//!
//! ## 核心流程
//!
//! 1. **准备输出目录**：确保日志和结果目录存在
//! 2. **加载工作**：读取源 CSV，测试模式下截断到上限
//! 3. **分批处理**：委托 `BatchScheduler`，每批完成后再开始下一批
//! 4. **写入结果**：每批结果立即追加到结果 CSV
//! 5. **保存索引**：add 模式按间隔保存，结束时再保存一次
//! 6. **全局统计**：输出并返回 `RunSummary`
//!
//! 没有断点续跑：崩溃后重新运行会从头开始。

use crate::clients::IndexClient;
use crate::config::{Config, OutputPaths, RunMode};
use crate::error::AppResult;
use crate::models::{read_source_csv, DispatchOutcome, OutcomeKind, WorkItem, WorkSource};
use crate::orchestrator::batch_scheduler::{BatchReport, BatchScheduler};
use crate::services::{
    CheckpointManager, CheckpointReason, MissingFileWriter, RequestDispatcher, ResultSink,
    SearchResultSink, SubmitResultSink,
};
use crate::utils::logging::{
    log_batch_complete, log_batch_start, log_items_loaded, log_startup, print_final_stats,
    truncate_text,
};
use anyhow::{Context, Result};
use tracing::{error, info, warn};

/// 运行状态（仅存在于内存中，不做持久化）
#[derive(Debug, Default, Clone, Copy)]
pub struct RunState {
    pub total_items: usize,
    pub processed_count: usize,
    pub batch_index: usize,
}

/// 运行统计
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RunSummary {
    /// 源 CSV 中的记录总数（截断前）
    pub total_records: usize,
    /// 本次计划处理的数量
    pub total_items: usize,
    pub processed: usize,
    pub batches: usize,
    pub success: usize,
    pub failed: usize,
    pub missing: usize,
    /// search 模式下写入的匹配行数
    pub matches: usize,
    /// 写入结果 CSV 的行数
    pub rows_written: usize,
    /// 发出的保存索引请求数
    pub checkpoints: usize,
    /// 测试模式达到上限提前停止
    pub stopped_at_cap: bool,
}

/// 应用主结构
pub struct App {
    config: Config,
    mode: RunMode,
    paths: OutputPaths,
    client: IndexClient,
}

impl App {
    /// 初始化应用
    pub fn initialize(config: Config, mode: RunMode) -> AppResult<Self> {
        config.validate()?;
        let paths = OutputPaths::for_mode(&config, mode);
        let client = IndexClient::new(&config)?;

        Ok(Self {
            config,
            mode,
            paths,
            client,
        })
    }

    pub fn paths(&self) -> &OutputPaths {
        &self.paths
    }

    /// 运行应用主逻辑
    ///
    /// 只有加载失败、输出目录或结果文件无法写入会返回错误，
    /// 错误在这里记录日志后返回，由调用方决定退出码。
    pub async fn run(&self) -> Result<RunSummary> {
        match self.run_inner().await {
            Ok(summary) => Ok(summary),
            Err(e) => {
                error!("❌ 运行终止: {:#}", e);
                Err(e)
            }
        }
    }

    async fn run_inner(&self) -> Result<RunSummary> {
        std::fs::create_dir_all(&self.paths.dir)
            .with_context(|| format!("无法创建输出目录: {}", self.paths.dir.display()))?;

        log_startup(self.mode, &self.config);

        let (total_records, items) = self.load_items()?;
        let mut summary = RunSummary {
            total_records,
            total_items: items.len(),
            ..Default::default()
        };

        if items.is_empty() {
            warn!("⚠️ 没有找到待处理的图片");
        }

        self.process_all(&items, &mut summary).await?;

        print_final_stats(self.mode, &summary, &self.paths);

        Ok(summary)
    }

    /// 加载工作项，返回 (源记录总数, 本次要处理的工作项)
    fn load_items(&self) -> Result<(usize, Vec<WorkItem>)> {
        info!("\n📁 正在读取 {}", self.config.source_csv.display());
        let records = read_source_csv(&self.config.source_csv, &self.config.columns)
            .with_context(|| format!("无法加载源 CSV: {}", self.config.source_csv.display()))?;
        let total_records = records.len();

        let items = WorkSource::new(&self.config.base_path).load(records);
        let limit = self.config.test_mode.then_some(self.config.test_limit);
        if let Some(limit) = limit {
            info!("🧪 测试模式已开启，只处理前 {} 张图片", limit);
        }
        let items = WorkSource::bounded(items, limit);

        log_items_loaded(items.len(), self.config.batch_size);
        Ok((total_records, items))
    }

    /// 处理所有批次
    async fn process_all(&self, items: &[WorkItem], summary: &mut RunSummary) -> Result<()> {
        let scheduler = BatchScheduler::new(self.config.batch_size);
        let dispatcher = RequestDispatcher::new(self.client.clone(), self.mode);
        let mut sink = self.result_sink();
        let missing_writer = self
            .paths
            .missing_files_log
            .as_ref()
            .map(MissingFileWriter::with_path);
        let mut checkpoints = match self.mode {
            RunMode::Submit => Some(CheckpointManager::new(
                self.client.clone(),
                self.config.index_path.as_str(),
                self.config.save_interval,
            )),
            RunMode::Query => None,
        };

        let mut state = RunState {
            total_items: items.len(),
            ..Default::default()
        };
        let total_batches = scheduler.batch_count(items.len());

        for batch in scheduler.partition(items) {
            state.batch_index = batch.number;
            log_batch_start(batch.number, total_batches, batch.start + 1, batch.end(), state.total_items);

            // 批次屏障：本批全部完成后才继续
            let report = scheduler.run_batch(&dispatcher, &batch).await;

            log_outcomes(&report.outcomes);
            if let Some(writer) = &missing_writer {
                record_missing_files(writer, &report.outcomes);
            }

            let written = sink.append(&report.outcomes)?;
            if written > 0 {
                info!("第 {} 批结果已保存到 {} ({} 行)", batch.number, sink.path().display(), written);
            }

            let success = tally(summary, &report, written, self.mode);
            state.processed_count += batch.len();
            summary.processed = state.processed_count;
            summary.batches += 1;
            log_batch_complete(batch.number, success, batch.len());

            if let Some(manager) = checkpoints.as_mut() {
                if self.config.test_mode {
                    // 测试模式不做间隔保存
                    manager.advance(batch.len());
                } else {
                    manager.record_processed(batch.len()).await;
                }
            }

            if self.config.test_mode && state.processed_count >= self.config.test_limit {
                info!("🧪 测试模式：已处理 {} 张图片，停止", state.processed_count);
                summary.stopped_at_cap = true;
                if let Some(manager) = checkpoints.as_mut() {
                    info!("💾 保存索引...");
                    manager.checkpoint(CheckpointReason::TestCap).await;
                }
                break;
            }
        }

        if let Some(manager) = checkpoints.as_mut() {
            if !summary.stopped_at_cap {
                if state.processed_count > 0 {
                    info!("💾 保存最终索引...");
                    manager.checkpoint(CheckpointReason::Final).await;
                } else {
                    info!("没有处理任何图片，跳过最终保存");
                }
            }
            summary.checkpoints = manager.issued();
        }

        Ok(())
    }

    fn result_sink(&self) -> Box<dyn ResultSink> {
        match self.mode {
            RunMode::Submit => Box::new(SubmitResultSink::new(&self.paths.results_csv)),
            RunMode::Query => Box::new(SearchResultSink::new(&self.paths.results_csv)),
        }
    }
}

/// 统计一批结果，返回本批成功数
fn tally(summary: &mut RunSummary, report: &BatchReport, written: usize, mode: RunMode) -> usize {
    let mut success = 0;
    for outcome in &report.outcomes {
        match outcome.kind {
            OutcomeKind::Success => success += 1,
            OutcomeKind::ResourceMissing => summary.missing += 1,
            OutcomeKind::RemoteError | OutcomeKind::TransportError => summary.failed += 1,
        }
    }
    summary.success += success;
    summary.missing += report.skipped;
    summary.rows_written += written;
    if mode == RunMode::Query {
        summary.matches += written;
    }
    success
}

fn log_outcomes(outcomes: &[DispatchOutcome]) {
    for outcome in outcomes {
        match outcome.kind {
            OutcomeKind::Success => info!(
                "[{}] ✓ {} 匹配 {} 条 | {}",
                outcome.item_id,
                outcome.kind,
                outcome.matches.len(),
                truncate_text(&outcome.payload, 120)
            ),
            _ => warn!(
                "[{}] ⚠️ {} 状态码 {:?} | {}",
                outcome.item_id,
                outcome.kind,
                outcome.status_code,
                truncate_text(&outcome.payload, 200)
            ),
        }
    }
}

fn record_missing_files(writer: &MissingFileWriter, outcomes: &[DispatchOutcome]) {
    for outcome in outcomes
        .iter()
        .filter(|o| o.kind == OutcomeKind::ResourceMissing)
    {
        if let Err(e) = writer.write(&outcome.resource_path) {
            error!("无法写入缺失文件日志: {:#}", e);
        }
    }
}
