//! 译文提取模块
//!
//! LLM的原始回复中，译文被包裹在 `<translate>` 和 `</translate>` 标签之间，
//! 标签外的内容一律忽略；找不到标签视为提取失败，而不是原样透传。

// 第三方crate导入
use anyhow::Context;
use regex::Regex;
use tracing::debug;

// 本地模块导入
use crate::api_constants::extraction_config::{
    EXTRACTION_PREVIEW_CHARS, TRANSLATE_CLOSE_TAG, TRANSLATE_OPEN_TAG,
};
use crate::error::{Result, TranslationError};
use crate::utils::preview_text;

/// 译文提取器，持有编译好的标签正则
#[derive(Debug, Clone)]
pub struct TranslationExtractor {
    pattern: Regex,
}

impl TranslationExtractor {
    /// 使用默认的 `<translate>` 标签创建提取器
    pub fn new() -> Result<Self> {
        Self::with_tags(TRANSLATE_OPEN_TAG, TRANSLATE_CLOSE_TAG)
    }

    /// 使用自定义起止标记创建提取器
    pub fn with_tags(open: &str, close: &str) -> Result<Self> {
        // (?s) 让 `.` 匹配换行，.*? 非贪婪匹配第一对标签
        let pattern = Regex::new(&format!(
            "(?s){}(.*?){}",
            regex::escape(open),
            regex::escape(close)
        ))
        .context("编译译文提取正则表达式失败")?;

        Ok(Self { pattern })
    }

    /// 从LLM原始输出中提取译文，结果去除首尾空白
    pub fn extract(&self, raw_output: &str) -> Result<String> {
        let captured = self
            .capture(raw_output)
            .or_else(|| self.capture(raw_output.trim()));

        match captured {
            Some(content) => Ok(content.trim().to_string()),
            None => {
                let preview = preview_text(raw_output, EXTRACTION_PREVIEW_CHARS);
                debug!("译文提取失败，原始输出预览: {}", preview);
                Err(TranslationError::Extraction { preview })
            }
        }
    }

    fn capture<'a>(&self, text: &'a str) -> Option<&'a str> {
        self.pattern
            .captures(text)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str())
    }
}
