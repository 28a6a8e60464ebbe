//! 配置管理模块
//!
//! 提供CLI参数解析、TOML配置文件加载以及流水线运行配置。
//! 优先级：显式命令行参数 > TOML配置文件 > 内置默认值；
//! API密钥：配置文件 `api.key` > 环境变量 `MK_TRANSLATOR_API_KEY`。

// 标准库导入
use std::path::{Path, PathBuf};
use std::time::Duration;

// 第三方crate导入
use anyhow::{Context, Result};
use clap::Parser;
use serde::Deserialize;
use tracing::info;

// 本地模块导入
use crate::api_constants::{api_config, is_valid_api_url, service_config};
use crate::translator::{BackendSettings, PromptTemplate, ProviderKind};

/// 流水线运行配置
///
/// 在整个运行期间只读，Worker数量固定不变。支持Builder模式进行链式配置。
///
/// # Examples
///
/// ```rust
/// use markdown_translator::config::RunConfig;
///
/// let config = RunConfig::new("pages", "pages.zh")
///     .with_workers(8)
///     .with_overwrite(true)
///     .with_dry_run(false);
/// assert_eq!(config.workers(), 8);
/// ```
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// 源目录
    source_root: PathBuf,
    /// 目标目录
    target_root: PathBuf,
    /// 并发Worker数量
    workers: usize,
    /// 是否覆盖已存在的目标文件
    overwrite: bool,
    /// 空跑模式：不调用API、不写文件
    dry_run: bool,
    /// 单次翻译调用超时
    call_timeout: Duration,
}

impl RunConfig {
    /// 创建新的配置实例
    ///
    /// 默认值：
    /// - Worker数量: 5
    /// - 覆盖: false
    /// - 空跑: false
    /// - 调用超时: 120秒
    pub fn new(source_root: impl Into<PathBuf>, target_root: impl Into<PathBuf>) -> Self {
        Self {
            source_root: source_root.into(),
            target_root: target_root.into(),
            workers: service_config::DEFAULT_CONCURRENCY,
            overwrite: false,
            dry_run: false,
            call_timeout: Duration::from_secs(service_config::REQUEST_TIMEOUT_SECONDS),
        }
    }

    pub fn source_root(&self) -> &Path {
        &self.source_root
    }

    pub fn target_root(&self) -> &Path {
        &self.target_root
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    pub fn overwrite(&self) -> bool {
        self.overwrite
    }

    pub fn dry_run(&self) -> bool {
        self.dry_run
    }

    pub fn call_timeout(&self) -> Duration {
        self.call_timeout
    }

    /// 设置Worker数量
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    /// 设置覆盖模式
    pub fn with_overwrite(mut self, overwrite: bool) -> Self {
        self.overwrite = overwrite;
        self
    }

    /// 设置空跑模式
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// 设置单次调用超时
    pub fn with_call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout = timeout;
        self
    }
}

/// CLI参数结构
///
/// 可被配置文件覆盖的选项使用 `Option`，以便区分"未指定"和"显式指定"
#[derive(Parser, Debug, Default)]
#[command(author, version, about = "并发批量Markdown翻译工具 - 支持OpenAI、Claude、Gemini", long_about = None)]
pub struct Cli {
    /// 源目录 (包含英文 md 文件) [默认: pages]
    #[arg(long, value_name = "DIR")]
    pub source: Option<PathBuf>,

    /// 目标目录 (用于输出翻译文件) [默认: pages.zh]
    #[arg(long, value_name = "DIR")]
    pub target: Option<PathBuf>,

    /// 并发 Worker 数量 [默认: 5]
    #[arg(short, long)]
    pub concurrency: Option<usize>,

    /// 使用的 LLM 提供商 (openai, claude, gemini) [默认: openai]
    #[arg(short, long)]
    pub provider: Option<String>,

    /// LLM API 端点 URL (对于某些提供商可能是基础 URL)
    #[arg(long = "api-url", value_name = "URL")]
    pub api_url: Option<String>,

    /// 使用的 LLM 模型名称 (可选, 取决于提供商默认值)
    #[arg(short, long)]
    pub model: Option<String>,

    /// LLM Prompt 模板文件路径 [默认: prompt.template]
    #[arg(long = "prompt-file", value_name = "FILE")]
    pub prompt_file: Option<PathBuf>,

    /// 覆盖已存在的目标文件
    #[arg(long)]
    pub overwrite: bool,

    /// 空跑模式 (不调用 API, 不写入文件)
    #[arg(long = "dry-run")]
    pub dry_run: bool,

    /// TOML 配置文件路径
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// 单次翻译调用超时（秒）[默认: 120]
    #[arg(long, value_name = "SECONDS")]
    pub timeout: Option<u64>,

    /// 详细输出模式
    #[arg(short, long)]
    pub verbose: bool,

    /// 静默模式 (仅输出总结)
    #[arg(short, long)]
    pub quiet: bool,

    /// 额外以JSON格式输出运行报告
    #[arg(long)]
    pub json: bool,
}

/// TOML 配置文件结构
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct TomlConfig {
    pub api: ApiSection,
    pub general: GeneralSection,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ApiSection {
    pub provider: Option<String>,
    pub endpoint: Option<String>,
    pub key: Option<String>,
    pub model: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct GeneralSection {
    pub source_dir: Option<PathBuf>,
    pub target_dir: Option<PathBuf>,
    pub concurrency: Option<usize>,
    pub prompt_file: Option<PathBuf>,
    pub overwrite: Option<bool>,
    pub timeout_secs: Option<u64>,
}

impl TomlConfig {
    /// 从文件加载
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("读取配置文件失败: {}", path.display()))?;
        let config = Self::parse(&content)
            .with_context(|| format!("解析 TOML 文件失败: {}", path.display()))?;
        info!("📄 已从配置文件 '{}' 加载设置", path.display());
        Ok(config)
    }

    pub fn parse(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }
}

/// 完整的应用配置：流水线配置 + 后端参数
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub run: RunConfig,
    pub provider: ProviderKind,
    pub endpoint: Option<String>,
    pub api_key: Option<String>,
    pub model: Option<String>,
    pub prompt_file: PathBuf,
    pub prompt: PromptTemplate,
}

impl AppConfig {
    /// 解析CLI参数、配置文件和环境变量，并进行校验
    pub fn load(cli: &Cli) -> Result<Self> {
        let env_key = std::env::var(api_config::API_KEY_ENV).ok();
        let file = match &cli.config {
            Some(path) => TomlConfig::from_file(path)?,
            None => TomlConfig::default(),
        };
        let config = Self::resolve(cli, file, env_key)?;

        // 在非空跑模式下, 确保目标目录存在
        if !config.run.dry_run() {
            let target = config.run.target_root();
            std::fs::create_dir_all(target)
                .with_context(|| format!("创建目标目录 '{}' 失败", target.display()))?;
            info!("📁 已确保目标目录 '{}' 存在", target.display());
        }

        Ok(config)
    }

    /// 合并各来源的配置并校验，不产生文件系统写入
    pub fn resolve(cli: &Cli, file: TomlConfig, env_key: Option<String>) -> Result<Self> {
        let TomlConfig { api, general } = file;

        let provider_name = cli
            .provider
            .clone()
            .or(api.provider)
            .unwrap_or_else(|| service_config::DEFAULT_PROVIDER.to_string());
        let provider: ProviderKind = provider_name.parse()?;

        let endpoint = non_empty(cli.api_url.clone().or(api.endpoint));
        if let Some(url) = &endpoint {
            if !is_valid_api_url(url) {
                anyhow::bail!("API 端点必须以 http:// 或 https:// 开头: {}", url);
            }
        }
        let model = non_empty(cli.model.clone().or(api.model));
        let api_key = non_empty(api.key.or(env_key));

        let source = cli
            .source
            .clone()
            .or(general.source_dir)
            .unwrap_or_else(|| PathBuf::from(service_config::DEFAULT_SOURCE_DIR));
        let target = cli
            .target
            .clone()
            .or(general.target_dir)
            .unwrap_or_else(|| PathBuf::from(service_config::DEFAULT_TARGET_DIR));
        let workers = cli
            .concurrency
            .or(general.concurrency)
            .unwrap_or(service_config::DEFAULT_CONCURRENCY);
        let timeout_secs = cli
            .timeout
            .or(general.timeout_secs)
            .unwrap_or(service_config::REQUEST_TIMEOUT_SECONDS);
        let overwrite = cli.overwrite || general.overwrite.unwrap_or(false);
        let dry_run = cli.dry_run;
        let prompt_file = cli
            .prompt_file
            .clone()
            .or(general.prompt_file)
            .unwrap_or_else(|| PathBuf::from(service_config::DEFAULT_PROMPT_FILE));

        // --- 配置项校验 ---
        if api_key.is_none() && !dry_run {
            anyhow::bail!(
                "必须设置 API Key (通过环境变量 {} 或配置文件) (除非使用 --dry-run)",
                api_config::API_KEY_ENV
            );
        }
        if workers == 0 {
            anyhow::bail!("并发数 (--concurrency) 必须大于 0");
        }
        if timeout_secs == 0 {
            anyhow::bail!("超时时间 (--timeout) 必须大于 0");
        }
        if !source.exists() {
            anyhow::bail!("源目录 '{}' 不存在", source.display());
        }

        let prompt = PromptTemplate::load(&prompt_file)?;

        let run = RunConfig::new(source, target)
            .with_workers(workers)
            .with_overwrite(overwrite)
            .with_dry_run(dry_run)
            .with_call_timeout(Duration::from_secs(timeout_secs));

        Ok(Self {
            run,
            provider,
            endpoint,
            api_key,
            model,
            prompt_file,
            prompt,
        })
    }

    /// 构建翻译后端参数
    pub fn backend_settings(&self) -> Result<BackendSettings> {
        let api_key = self
            .api_key
            .clone()
            .with_context(|| format!("缺少 API Key (环境变量 {})", api_config::API_KEY_ENV))?;

        Ok(BackendSettings {
            provider: self.provider,
            endpoint: self.endpoint.clone(),
            api_key,
            model: self.model.clone(),
            prompt: self.prompt.clone(),
            request_timeout: self.run.call_timeout(),
        })
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}
