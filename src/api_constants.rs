/// 翻译后端与流水线相关的常量配置
///
/// 该文件定义了所有LLM提供商、文件处理和提取协议相关的常量，方便统一管理和维护

/// LLM提供商API配置
pub mod api_config {
    /// API密钥环境变量名
    pub const API_KEY_ENV: &str = "MK_TRANSLATOR_API_KEY";

    /// OpenAI默认端点
    pub const OPENAI_DEFAULT_ENDPOINT: &str = "https://api.openai.com/v1/chat/completions";

    /// OpenAI默认模型
    pub const OPENAI_DEFAULT_MODEL: &str = "gpt-3.5-turbo";

    /// Claude默认端点 (Messages API)
    pub const CLAUDE_DEFAULT_ENDPOINT: &str = "https://api.anthropic.com/v1/messages";

    /// Claude默认模型
    pub const CLAUDE_DEFAULT_MODEL: &str = "claude-3-sonnet-20240229";

    /// Claude API版本Header
    pub const CLAUDE_API_VERSION: &str = "2023-06-01";

    /// Claude要求的max_tokens
    pub const CLAUDE_MAX_TOKENS: u32 = 4000;

    /// Gemini端点格式，`{model}` 会被替换为模型名称
    pub const GEMINI_ENDPOINT_FORMAT: &str =
        "https://generativelanguage.googleapis.com/v1beta/models/{model}:generateContent";

    /// Gemini默认模型
    pub const GEMINI_DEFAULT_MODEL: &str = "gemini-1.5-flash-latest";

    /// 支持的提供商标识
    pub const SUPPORTED_PROVIDERS: &[&str] = &["openai", "claude", "gemini"];
}

/// 流水线配置
pub mod service_config {
    /// 默认源目录
    pub const DEFAULT_SOURCE_DIR: &str = "pages";

    /// 默认目标目录
    pub const DEFAULT_TARGET_DIR: &str = "pages.zh";

    /// 默认并发Worker数量
    pub const DEFAULT_CONCURRENCY: usize = 5;

    /// 默认提供商
    pub const DEFAULT_PROVIDER: &str = "openai";

    /// 默认Prompt文件
    pub const DEFAULT_PROMPT_FILE: &str = "prompt.template";

    /// 单次翻译调用超时时间（秒）
    pub const REQUEST_TIMEOUT_SECONDS: u64 = 120;

    /// 待翻译文档扩展名（不区分大小写）
    pub const DOCUMENT_EXTENSION: &str = ".md";

    /// 收到终止信号时的退出码
    pub const INTERRUPTED_EXIT_CODE: i32 = 130;
}

/// 翻译结果提取协议
pub mod extraction_config {
    /// 译文起始标记
    pub const TRANSLATE_OPEN_TAG: &str = "<translate>";

    /// 译文结束标记
    pub const TRANSLATE_CLOSE_TAG: &str = "</translate>";

    /// 提取失败时原始输出的预览长度（字符）
    pub const EXTRACTION_PREVIEW_CHARS: usize = 300;

    /// API错误响应体的预览长度（字符）
    pub const RESPONSE_PREVIEW_CHARS: usize = 500;
}

/// Prompt模板配置
pub mod prompt_config {
    /// 模板中的内容占位符
    pub const CONTENT_PLACEHOLDER: &str = "{{content}}";

    /// 默认Prompt模板，面向命令行工具文档（如tldr pages）
    pub const DEFAULT_PROMPT_TEMPLATE: &str = r#"You are a translation assistant specialized in command-line tool documentation (like tldr pages).
Translate the following Markdown content from English to Simplified Chinese.

**Crucial Instructions:**
1.  Preserve the original Markdown formatting EXACTLY (code blocks with backticks ``, {{placeholders}}, links, headers, lists, etc.).
2.  Ensure technical terms are translated accurately and consistently in the context of command-line usage.
3.  ONLY output the translated Markdown content. Do NOT include any other explanatory text before or after.
4.  Wrap your ENTIRE translated Markdown output within <translate> tags. Example: <translate># translated content...</translate>

Original English Markdown:
---
{{content}}
---

Translated Chinese Markdown (within <translate> tags):"#;
}

/// 验证API URL是否有效
pub fn is_valid_api_url(url: &str) -> bool {
    url.starts_with("http://") || url.starts_with("https://")
}

/// 根据模型名称构建Gemini端点
pub fn gemini_endpoint_for(model: &str) -> String {
    api_config::GEMINI_ENDPOINT_FORMAT.replace("{model}", model)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_url_validation() {
        assert!(is_valid_api_url("https://example.com"));
        assert!(is_valid_api_url("http://localhost:8080"));
        assert!(!is_valid_api_url("ftp://example.com"));
        assert!(!is_valid_api_url("invalid-url"));
    }

    #[test]
    fn test_gemini_endpoint() {
        assert_eq!(
            gemini_endpoint_for("gemini-pro"),
            "https://generativelanguage.googleapis.com/v1beta/models/gemini-pro:generateContent"
        );
    }

    #[test]
    fn test_default_prompt_has_placeholder() {
        assert!(prompt_config::DEFAULT_PROMPT_TEMPLATE.contains(prompt_config::CONTENT_PLACEHOLDER));
    }
}
