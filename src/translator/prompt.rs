use std::path::Path;

use tracing::{info, warn};

use crate::api_constants::prompt_config::{CONTENT_PLACEHOLDER, DEFAULT_PROMPT_TEMPLATE};
use crate::error::Result;
use crate::translation_error;

/// Prompt模板，通过 `{{content}}` 占位符嵌入待翻译文档
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptTemplate {
    template: String,
}

impl PromptTemplate {
    /// 从字符串创建模板，要求包含内容占位符
    pub fn new(template: impl Into<String>) -> Result<Self> {
        let template = template.into();
        if !template.contains(CONTENT_PLACEHOLDER) {
            return Err(translation_error!(
                config,
                "prompt_file",
                format!("Prompt 模板缺少 {} 占位符", CONTENT_PLACEHOLDER)
            ));
        }
        Ok(Self { template })
    }

    /// 从文件加载模板
    ///
    /// 文件不存在或读取失败时记录警告并回退到默认模板；
    /// 文件内容不含占位符时返回错误
    pub fn load(path: &Path) -> Result<Self> {
        match std::fs::read_to_string(path) {
            Ok(content) => {
                info!("📝 成功加载 Prompt 文件: {}", path.display());
                Self::new(content)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!("⚠️  Prompt 文件 '{}' 未找到，将使用默认 Prompt", path.display());
                Ok(Self::default())
            }
            Err(e) => {
                warn!(
                    "⚠️  读取 Prompt 文件 '{}' 时出错: {}，将使用默认 Prompt",
                    path.display(),
                    e
                );
                Ok(Self::default())
            }
        }
    }

    /// 渲染最终Prompt，文档内容不会被再次解析
    pub fn render(&self, content: &str) -> String {
        self.template.replace(CONTENT_PLACEHOLDER, content)
    }
}

impl Default for PromptTemplate {
    fn default() -> Self {
        Self {
            template: DEFAULT_PROMPT_TEMPLATE.to_string(),
        }
    }
}
