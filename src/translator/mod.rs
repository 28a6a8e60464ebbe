//! 翻译后端模块
//!
//! 定义所有LLM提供商共同实现的 [`Translator`] 接口，以及根据配置创建具体实现的工厂函数。
//! 流水线只依赖 `Arc<dyn Translator>`，不关心背后是哪个提供商。

mod claude;
mod gemini;
mod openai;
mod prompt;

pub use claude::ClaudeTranslator;
pub use gemini::GeminiTranslator;
pub use openai::OpenAiTranslator;
pub use prompt::PromptTemplate;

// 标准库导入
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

// 第三方crate导入
use anyhow::Context;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use tracing::{info, warn};

// 本地模块导入
use crate::api_constants::api_config::SUPPORTED_PROVIDERS;
use crate::api_constants::extraction_config::RESPONSE_PREVIEW_CHARS;
use crate::error::{Result, TranslationError};
use crate::translation_error;
use crate::utils::preview_text;

/// 翻译后端接口
///
/// 实现必须可以被多个Worker并发调用。超时由调用方通过丢弃future控制。
#[async_trait]
pub trait Translator: Send + Sync {
    /// 翻译一篇文档，返回LLM的原始输出（译文标签的提取由调用方完成）
    async fn translate(&self, content: &str) -> Result<String>;

    /// 提供商名称，用于日志
    fn name(&self) -> &str;

    /// 释放后端持有的资源
    fn close(&self) -> Result<()> {
        Ok(())
    }
}

/// 支持的LLM提供商
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    OpenAi,
    Claude,
    Gemini,
}

impl ProviderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::OpenAi => "openai",
            ProviderKind::Claude => "claude",
            ProviderKind::Gemini => "gemini",
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderKind {
    type Err = TranslationError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "openai" => Ok(ProviderKind::OpenAi),
            "claude" => Ok(ProviderKind::Claude),
            "gemini" => Ok(ProviderKind::Gemini),
            other => Err(translation_error!(
                config,
                "provider",
                format!(
                    "不支持的 LLM 提供商 '{}'. 支持的提供商: {}",
                    other,
                    SUPPORTED_PROVIDERS.join(", ")
                )
            )),
        }
    }
}

/// 创建翻译后端所需的参数
#[derive(Debug, Clone)]
pub struct BackendSettings {
    pub provider: ProviderKind,
    /// 为空时使用提供商默认端点
    pub endpoint: Option<String>,
    pub api_key: String,
    /// 为空时使用提供商默认模型
    pub model: Option<String>,
    pub prompt: PromptTemplate,
    pub request_timeout: Duration,
}

/// 根据配置创建翻译后端
///
/// 所有提供商共享同一个HTTP客户端
pub fn new_translator(settings: &BackendSettings) -> Result<Arc<dyn Translator>> {
    info!("🔧 初始化 LLM 翻译器 (提供商: {})", settings.provider);

    let client = Client::builder()
        .timeout(settings.request_timeout)
        .build()
        .context("创建HTTP客户端失败")?;

    let translator: Arc<dyn Translator> = match settings.provider {
        ProviderKind::OpenAi => Arc::new(OpenAiTranslator::new(
            client,
            &settings.api_key,
            settings.endpoint.as_deref(),
            settings.model.as_deref(),
            settings.prompt.clone(),
        )?),
        ProviderKind::Claude => Arc::new(ClaudeTranslator::new(
            client,
            &settings.api_key,
            settings.endpoint.as_deref(),
            settings.model.as_deref(),
            settings.prompt.clone(),
        )?),
        ProviderKind::Gemini => Arc::new(GeminiTranslator::new(
            client,
            &settings.api_key,
            settings.endpoint.as_deref(),
            settings.model.as_deref(),
            settings.prompt.clone(),
        )?),
    };

    Ok(translator)
}

/// 持有翻译后端并在离开作用域时调用 [`Translator::close`]
///
/// 无论运行成功、失败还是提前返回，资源都会被释放
pub struct BackendGuard {
    translator: Arc<dyn Translator>,
}

impl BackendGuard {
    pub fn new(translator: Arc<dyn Translator>) -> Self {
        Self { translator }
    }

    pub fn translator(&self) -> Arc<dyn Translator> {
        Arc::clone(&self.translator)
    }
}

impl Drop for BackendGuard {
    fn drop(&mut self) {
        info!("关闭 LLM 翻译器连接 ({})...", self.translator.name());
        if let Err(e) = self.translator.close() {
            warn!("关闭 LLM 翻译器时出错: {}", e);
        }
    }
}

/// 校验API密钥非空
pub(crate) fn require_api_key(provider: &str, api_key: &str) -> Result<String> {
    if api_key.trim().is_empty() {
        return Err(translation_error!(config, "api_key", format!("{} API 密钥不能为空", provider)));
    }
    Ok(api_key.to_string())
}

/// 将非成功HTTP状态码归类为认证错误或普通API错误
pub(crate) fn status_error(provider: &str, status: StatusCode, body: &str) -> TranslationError {
    let preview = preview_text(body, RESPONSE_PREVIEW_CHARS);
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            translation_error!(auth, provider, format!("状态码 {}. 响应体预览: {}", status.as_u16(), preview))
        }
        _ => translation_error!(
            translation_api,
            provider,
            status.as_u16(),
            format!("API 返回非成功状态码. 响应体预览: {}", preview)
        ),
    }
}

/// 解码失败时附带响应体预览
pub(crate) fn decode_error(provider: &str, status: StatusCode, err: serde_json::Error, body: &str) -> TranslationError {
    translation_error!(
        malformed,
        provider,
        format!(
            "解码 API 响应失败 (状态码 {}): {}. 响应体预览: {}",
            status.as_u16(),
            err,
            preview_text(body, RESPONSE_PREVIEW_CHARS)
        )
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_provider_parsing() {
        assert_eq!("openai".parse::<ProviderKind>().unwrap(), ProviderKind::OpenAi);
        assert_eq!("Claude".parse::<ProviderKind>().unwrap(), ProviderKind::Claude);
        assert_eq!(" GEMINI ".parse::<ProviderKind>().unwrap(), ProviderKind::Gemini);
        assert!("deepl".parse::<ProviderKind>().is_err());
        assert_eq!(ProviderKind::Claude.to_string(), "claude");
    }

    #[test]
    fn test_factory_builds_each_provider() {
        for provider in [ProviderKind::OpenAi, ProviderKind::Claude, ProviderKind::Gemini] {
            let settings = BackendSettings {
                provider,
                endpoint: None,
                api_key: "sk-test".to_string(),
                model: None,
                prompt: PromptTemplate::default(),
                request_timeout: Duration::from_secs(5),
            };
            let translator = new_translator(&settings).unwrap();
            assert!(!translator.name().is_empty());
        }
    }

    #[test]
    fn test_factory_rejects_empty_key() {
        let settings = BackendSettings {
            provider: ProviderKind::OpenAi,
            endpoint: None,
            api_key: "  ".to_string(),
            model: None,
            prompt: PromptTemplate::default(),
            request_timeout: Duration::from_secs(5),
        };
        assert!(matches!(
            new_translator(&settings),
            Err(TranslationError::Configuration { .. })
        ));
    }

    #[test]
    fn test_status_error_classification() {
        assert!(matches!(
            status_error("OpenAI", StatusCode::UNAUTHORIZED, "{}"),
            TranslationError::Authentication { .. }
        ));
        assert!(matches!(
            status_error("OpenAI", StatusCode::TOO_MANY_REQUESTS, "{}"),
            TranslationError::TranslationApi { status_code: 429, .. }
        ));
    }

    struct ClosingBackend {
        closed: AtomicUsize,
    }

    #[async_trait]
    impl Translator for ClosingBackend {
        async fn translate(&self, content: &str) -> Result<String> {
            Ok(content.to_string())
        }

        fn name(&self) -> &str {
            "closing"
        }

        fn close(&self) -> Result<()> {
            self.closed.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[test]
    fn test_guard_closes_backend_on_drop() {
        let backend = Arc::new(ClosingBackend {
            closed: AtomicUsize::new(0),
        });
        {
            let guard = BackendGuard::new(backend.clone());
            let _shared = guard.translator();
        }
        assert_eq!(backend.closed.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_guard_closes_backend_on_early_return() {
        fn run(guard: BackendGuard) -> std::result::Result<(), &'static str> {
            let _t = guard.translator();
            Err("aborted")
        }

        let backend = Arc::new(ClosingBackend {
            closed: AtomicUsize::new(0),
        });
        assert!(run(BackendGuard::new(backend.clone())).is_err());
        assert_eq!(backend.closed.load(Ordering::SeqCst), 1);
    }
}
