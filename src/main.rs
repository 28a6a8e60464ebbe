use std::sync::Arc;
use std::time::Instant;

use chrono::Local;
use clap::Parser;
use tracing::{error, info, warn};

use markdown_translator::api_constants::service_config::INTERRUPTED_EXIT_CODE;
use markdown_translator::discovery::find_markdown_files;
use markdown_translator::stats::print_summary;
use markdown_translator::translator::{new_translator, BackendGuard, Translator};
use markdown_translator::utils::init_logging;
use markdown_translator::{AppConfig, Cli, FileProcessor, RunReport, StatsSnapshot};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // 初始化日志系统
    init_logging(cli.verbose, cli.quiet);

    tokio::spawn(wait_for_shutdown_signal());

    let code = run(&cli).await;
    std::process::exit(code);
}

/// 执行一次完整的翻译运行，返回进程退出码
///
/// 翻译后端守卫在本函数返回前释放，保证 `process::exit` 之前已调用 `close`
async fn run(cli: &Cli) -> i32 {
    let config = match AppConfig::load(cli) {
        Ok(config) => config,
        Err(e) => {
            error!("❌ 配置错误: {}", e);
            return 1;
        }
    };
    let run_config = &config.run;

    info!("🚀 启动 Markdown 翻译工具");
    info!("📂 源目录: {}", run_config.source_root().display());
    info!("📄 目标目录: {}", run_config.target_root().display());
    info!("🌐 提供商: {}", config.provider);
    if let Some(model) = &config.model {
        info!("🤖 模型: {}", model);
    }
    if let Some(endpoint) = &config.endpoint {
        info!("🔗 API 端点: {}", endpoint);
    }
    info!("📝 Prompt 模板: {}", config.prompt_file.display());
    info!(
        "⚙️  并发数: {}, 覆盖: {}, 超时: {}秒",
        run_config.workers(),
        run_config.overwrite(),
        run_config.call_timeout().as_secs()
    );
    if run_config.dry_run() {
        warn!("⚠️  *** 空跑模式已启用 ***: 不会调用 API，也不会写入任何文件");
    }

    let started_at = Local::now();
    let start = Instant::now();

    let files = match find_markdown_files(run_config.source_root()) {
        Ok(files) => files,
        Err(e) => {
            error!("❌ 查找 Markdown 文件失败: {}", e);
            return 1;
        }
    };
    if files.is_empty() {
        info!("在源目录 '{}' 中未找到 Markdown 文件", run_config.source_root().display());
        let report = RunReport::new(
            StatsSnapshot::default(),
            started_at,
            start.elapsed(),
            run_config.dry_run(),
        );
        print_summary(&report);
        return report.exit_code();
    }
    info!("🔍 找到 {} 个 Markdown 文件待处理", files.len());

    // 空跑模式不创建翻译后端
    let guard = if run_config.dry_run() {
        None
    } else {
        let translator = config
            .backend_settings()
            .and_then(|settings| Ok(new_translator(&settings)?));
        match translator {
            Ok(translator) => {
                info!("✅ 已初始化 {} 翻译器", translator.name());
                Some(BackendGuard::new(translator))
            }
            Err(e) => {
                error!("❌ 初始化 LLM 翻译器失败: {}", e);
                return 1;
            }
        }
    };
    let translator: Option<Arc<dyn Translator>> = guard.as_ref().map(BackendGuard::translator);

    let processor = match FileProcessor::new(run_config.clone(), translator) {
        Ok(processor) => processor,
        Err(e) => {
            error!("❌ 初始化处理器失败: {}", e);
            return 1;
        }
    };
    let stats = match processor.process_files(files).await {
        Ok(stats) => stats,
        Err(e) => {
            error!("❌ 处理过程中出现错误: {}", e);
            return 1;
        }
    };

    let report = RunReport::new(stats, started_at, start.elapsed(), run_config.dry_run());
    print_summary(&report);

    if cli.json {
        match serde_json::to_string_pretty(&report) {
            Ok(json) => println!("{}", json),
            Err(e) => warn!("序列化运行报告失败: {}", e),
        }
    }

    if report.stats.has_failures() {
        error!("⚠️  {} 个文件处理失败，请检查上面的日志", report.stats.failed);
    } else {
        info!("✅ 所有文件处理完毕");
    }

    report.exit_code()
}

/// 等待 Ctrl-C 或 SIGTERM，收到后立即以中断退出码终止进程
async fn wait_for_shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("无法监听 Ctrl-C 信号: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!("无法监听 SIGTERM 信号: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("\n收到 Ctrl-C 信号，正在退出..."),
        _ = terminate => info!("\n收到终止信号，正在退出..."),
    }

    std::process::exit(INTERRUPTED_EXIT_CODE);
}
