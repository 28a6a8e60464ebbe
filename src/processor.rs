//! 并发文件处理模块
//!
//! 一次性批处理：所有任务预先装入容量不小于任务数的队列并关闭发送端，
//! 固定数量的Worker从共享队列中拉取任务直到队列耗尽，调用方等待全部Worker退出后读取统计。
//!
//! 每个任务依次经过：路径解析 → 跳过检查 → 读取源文件 → 空跑短路 → 调用翻译后端（带超时）
//! → 提取译文 → 写入目标文件，并且恰好落入 处理成功/跳过/失败/空跑 之一。

// 标准库导入
use std::path::PathBuf;
use std::sync::Arc;

// 第三方crate导入
use futures::future::join_all;
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, error, info, warn};

// 本地模块导入
use crate::config::RunConfig;
use crate::error::{Result, TaskFailure, TranslationError};
use crate::extraction::TranslationExtractor;
use crate::persistence::{write_translation, WriteOutcome};
use crate::stats::{PipelineStats, StatsSnapshot};
use crate::translation_error;
use crate::translator::Translator;
use crate::utils::display_relative;

/// 单个翻译任务：文件相对于源/目标根目录的路径
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranslationTask {
    relative_path: PathBuf,
}

impl TranslationTask {
    pub fn new(relative_path: impl Into<PathBuf>) -> Self {
        Self {
            relative_path: relative_path.into(),
        }
    }

    pub fn relative_path(&self) -> &std::path::Path {
        &self.relative_path
    }
}

/// 任务的成功终态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskOutcome {
    /// 翻译并写入完成
    Processed,
    /// 目标文件已存在且未开启覆盖
    Skipped,
    /// 空跑模式下模拟处理
    DryRun,
}

/// Worker之间共享的只读上下文
struct WorkerContext {
    config: RunConfig,
    translator: Option<Arc<dyn Translator>>,
    extractor: TranslationExtractor,
    stats: Arc<PipelineStats>,
}

/// 文件处理器：持有运行配置和翻译后端，负责调度Worker池
pub struct FileProcessor {
    config: RunConfig,
    translator: Option<Arc<dyn Translator>>,
    extractor: TranslationExtractor,
}

impl FileProcessor {
    /// 创建处理器，Worker数量必须大于0
    ///
    /// 空跑模式下 `translator` 可以为 `None`
    pub fn new(config: RunConfig, translator: Option<Arc<dyn Translator>>) -> Result<Self> {
        if config.workers() == 0 {
            return Err(translation_error!(config, "concurrency", "并发数必须大于 0"));
        }
        if translator.is_none() && !config.dry_run() {
            warn!("⚠️  非空跑模式下未提供翻译器，所有需要翻译的文件都将失败");
        }

        Ok(Self {
            config,
            translator,
            extractor: TranslationExtractor::new()?,
        })
    }

    /// 处理所有文件，阻塞直到每个Worker都退出，返回最终统计
    pub async fn process_files(&self, files: Vec<PathBuf>) -> Result<StatsSnapshot> {
        let total = files.len();
        let workers = self.config.workers();
        let stats = Arc::new(PipelineStats::new(total));
        info!("🚀 开始处理 {} 个文件，使用 {} 个 Worker...", total, workers);

        // 容量等于任务数，装载阶段不会阻塞
        let (sender, receiver) = mpsc::channel::<TranslationTask>(total.max(1));
        for path in files {
            sender
                .try_send(TranslationTask::new(path))
                .map_err(|e| anyhow::anyhow!("任务入队失败: {}", e))?;
        }
        // 关闭发送端，队列耗尽后Worker自然退出
        drop(sender);

        let queue = Arc::new(Mutex::new(receiver));
        let context = Arc::new(WorkerContext {
            config: self.config.clone(),
            translator: self.translator.clone(),
            extractor: self.extractor.clone(),
            stats: Arc::clone(&stats),
        });

        let handles: Vec<_> = (1..=workers)
            .map(|id| {
                let queue = Arc::clone(&queue);
                let context = Arc::clone(&context);
                tokio::spawn(run_worker(id, queue, context))
            })
            .collect();

        let mut panicked = 0;
        for result in join_all(handles).await {
            if let Err(e) = result {
                error!("❌ Worker 异常退出: {}", e);
                panicked += 1;
            }
        }

        info!("所有 Worker 已完成工作");
        let mut snapshot = stats.snapshot();
        if panicked > 0 {
            // 异常退出的Worker手中的任务以及队列中剩余的任务都计为失败
            let lost = snapshot.total_files.saturating_sub(snapshot.accounted());
            error!(
                "❌ {} 个 Worker 异常退出，{} 个文件未能完成，计为失败",
                panicked, lost
            );
            snapshot.failed += lost;
        }

        Ok(snapshot)
    }
}

/// Worker主循环：从共享队列拉取任务直到队列关闭且为空
async fn run_worker(
    id: usize,
    queue: Arc<Mutex<mpsc::Receiver<TranslationTask>>>,
    context: Arc<WorkerContext>,
) {
    debug!("[Worker {}] 启动", id);

    loop {
        // 锁只在取任务期间持有
        let task = { queue.lock().await.recv().await };
        let Some(task) = task else { break };

        match process_task(id, &task, &context).await {
            Ok(TaskOutcome::Processed) => context.stats.record_processed(),
            Ok(TaskOutcome::Skipped) => context.stats.record_skipped(),
            Ok(TaskOutcome::DryRun) => context.stats.record_dry_run(),
            Err(failure) => {
                error!(
                    "[Worker {}] ❌ {} 处理失败: {}",
                    id,
                    failure.path().display(),
                    failure
                );
                context.stats.record_failed();
            }
        }
    }

    debug!("[Worker {}] 结束", id);
}

/// 处理单个任务，返回其终态
async fn process_task(
    id: usize,
    task: &TranslationTask,
    context: &WorkerContext,
) -> std::result::Result<TaskOutcome, TaskFailure> {
    let config = &context.config;
    let source_path = config.source_root().join(task.relative_path());
    let target_path = config.target_root().join(task.relative_path());

    info!(
        "[Worker {}] 正在处理: {} -> {}",
        id,
        display_relative(task.relative_path()),
        target_path.display()
    );

    // --- 跳过检查：仅在非空跑且未开启覆盖时 ---
    if !config.overwrite() && !config.dry_run() {
        match tokio::fs::metadata(&target_path).await {
            Ok(_) => {
                info!("[Worker {}] ⏭️  跳过已存在的文件: {}", id, target_path.display());
                return Ok(TaskOutcome::Skipped);
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                return Err(TaskFailure::StatCheck {
                    path: target_path,
                    source: e,
                })
            }
        }
    }

    // --- 读取源文件 ---
    let content = tokio::fs::read_to_string(&source_path)
        .await
        .map_err(|e| TaskFailure::Read {
            path: source_path.clone(),
            source: e,
        })?;

    // --- 空跑短路 ---
    if config.dry_run() {
        info!(
            "[Worker {}] [空跑模式] 将翻译并写入 (模拟): {}",
            id,
            target_path.display()
        );
        return Ok(TaskOutcome::DryRun);
    }

    let translator = match &context.translator {
        Some(translator) => translator,
        None => return Err(TaskFailure::BackendMissing { path: source_path }),
    };

    // --- 调用翻译后端，超时只取消本次调用 ---
    let timeout = config.call_timeout();
    let raw_output = match tokio::time::timeout(timeout, translator.translate(&content)).await {
        Ok(Ok(raw)) => raw,
        Ok(Err(e)) => {
            return Err(TaskFailure::Backend {
                path: source_path,
                source: e,
            })
        }
        Err(_) => {
            return Err(TaskFailure::BackendTimeout {
                path: source_path,
                seconds: timeout.as_secs_f64(),
            })
        }
    };

    // --- 提取译文 ---
    let translated = context
        .extractor
        .extract(&raw_output)
        .map_err(|e| TaskFailure::Extraction {
            path: source_path.clone(),
            source: e,
        })?;

    // --- 写入目标文件 ---
    let overwrite = config.overwrite();
    let write_path = target_path.clone();
    let join = tokio::task::spawn_blocking(move || {
        write_translation(&write_path, &translated, overwrite)
    })
    .await;
    let outcome = match join {
        Ok(Ok(outcome)) => outcome,
        Ok(Err(e)) => {
            return Err(TaskFailure::Write {
                path: target_path,
                source: e,
            })
        }
        Err(e) => {
            return Err(TaskFailure::Write {
                path: target_path,
                source: TranslationError::Internal {
                    source: anyhow::anyhow!("写入任务执行失败: {}", e),
                },
            })
        }
    };

    match outcome {
        WriteOutcome::Written => {
            info!("[Worker {}] ✅ 成功处理并写入: {}", id, target_path.display());
        }
        WriteOutcome::AlreadyExists => {
            // 跳过检查之后文件才出现，仍计为处理成功
            warn!(
                "[Worker {}] 目标文件在写入前已存在，保持原文件: {}",
                id,
                target_path.display()
            );
        }
    }
    Ok(TaskOutcome::Processed)
}
