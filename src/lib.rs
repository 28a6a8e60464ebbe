//! Markdown Translator - 并发批量Markdown翻译工具库
//!
//! 这个库提供了文件发现、LLM翻译后端、译文提取、原子写入和并发处理统计等核心功能。

pub mod api_constants;
pub mod config;
pub mod discovery;
pub mod error;
pub mod extraction;
pub mod persistence;
pub mod processor;
pub mod stats;
pub mod translator;
pub mod utils;

pub use config::{AppConfig, Cli, RunConfig};
pub use error::{Result, TaskFailure, TranslationError};
pub use processor::FileProcessor;
pub use stats::{RunReport, StatsSnapshot};
pub use translator::{new_translator, BackendGuard, Translator};
