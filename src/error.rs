//! 统一错误处理模块
//!
//! 提供Markdown翻译工具的统一错误类型定义，以及流水线中单个任务的失败分类

// 标准库导入
use std::fmt;
use std::path::{Path, PathBuf};

// 第三方crate导入
use anyhow::Error as AnyhowError;

/// 翻译工具统一错误类型
///
/// 定义了项目中可能出现的所有错误类型，提供统一的错误处理接口
#[derive(Debug)]
pub enum TranslationError {
    /// 网络请求相关错误（连接失败、传输超时等瞬时错误）
    Network {
        /// 错误消息
        message: String,
        /// HTTP状态码（如果适用）
        status_code: Option<u16>,
    },

    /// 翻译API返回的非成功响应
    TranslationApi {
        /// 提供商名称
        provider: String,
        /// API响应状态码
        status_code: u16,
        /// 错误消息
        message: String,
    },

    /// 认证失败（密钥无效或无权限）
    Authentication {
        /// 提供商名称
        provider: String,
        /// 错误详情
        details: String,
    },

    /// API响应格式异常或内容为空
    MalformedResponse {
        /// 提供商名称
        provider: String,
        /// 错误详情
        details: String,
    },

    /// 配置相关错误
    Configuration {
        /// 配置项名称
        field: String,
        /// 错误原因
        reason: String,
    },

    /// 文件发现失败（致命）
    Discovery {
        /// 源目录
        path: String,
        /// 错误原因
        reason: String,
    },

    /// 文件操作相关错误
    FileOperation {
        /// 文件路径
        path: String,
        /// 操作类型（读取、写入、创建等）
        operation: String,
        /// 底层错误信息
        source: String,
    },

    /// 无法从LLM输出中提取译文
    Extraction {
        /// 原始输出预览
        preview: String,
    },

    /// 内部处理错误（包装anyhow::Error）
    Internal {
        /// 包装的错误
        source: AnyhowError,
    },
}

impl fmt::Display for TranslationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TranslationError::Network { message, status_code } => {
                if let Some(code) = status_code {
                    write!(f, "网络请求失败 [{}]: {}", code, message)
                } else {
                    write!(f, "网络请求失败: {}", message)
                }
            }
            TranslationError::TranslationApi { provider, status_code, message } => {
                write!(f, "{}: API返回错误 [{}]: {}", provider, status_code, message)
            }
            TranslationError::Authentication { provider, details } => {
                write!(f, "{}: 认证失败: {}", provider, details)
            }
            TranslationError::MalformedResponse { provider, details } => {
                write!(f, "{}: API响应无效: {}", provider, details)
            }
            TranslationError::Configuration { field, reason } => {
                write!(f, "配置错误 [{}]: {}", field, reason)
            }
            TranslationError::Discovery { path, reason } => {
                write!(f, "文件发现失败 [{}]: {}", path, reason)
            }
            TranslationError::FileOperation { path, operation, source } => {
                write!(f, "文件{}操作失败 [{}]: {}", operation, path, source)
            }
            TranslationError::Extraction { preview } => {
                write!(
                    f,
                    "无法在 LLM 输出中找到 <translate>...</translate> 标签。输出预览: {}",
                    preview
                )
            }
            TranslationError::Internal { source } => {
                write!(f, "内部处理错误: {}", source)
            }
        }
    }
}

impl std::error::Error for TranslationError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            TranslationError::Internal { source } => Some(source.as_ref()),
            _ => None,
        }
    }
}

/// 统一结果类型别名
pub type Result<T> = std::result::Result<T, TranslationError>;

/// 便捷的错误创建宏
#[macro_export]
macro_rules! translation_error {
    (network, $msg:expr) => {
        $crate::error::TranslationError::Network {
            message: $msg.to_string(),
            status_code: None,
        }
    };
    (network, $msg:expr, $code:expr) => {
        $crate::error::TranslationError::Network {
            message: $msg.to_string(),
            status_code: Some($code),
        }
    };
    (translation_api, $provider:expr, $code:expr, $msg:expr) => {
        $crate::error::TranslationError::TranslationApi {
            provider: $provider.to_string(),
            status_code: $code,
            message: $msg.to_string(),
        }
    };
    (auth, $provider:expr, $details:expr) => {
        $crate::error::TranslationError::Authentication {
            provider: $provider.to_string(),
            details: $details.to_string(),
        }
    };
    (malformed, $provider:expr, $details:expr) => {
        $crate::error::TranslationError::MalformedResponse {
            provider: $provider.to_string(),
            details: $details.to_string(),
        }
    };
    (config, $field:expr, $reason:expr) => {
        $crate::error::TranslationError::Configuration {
            field: $field.to_string(),
            reason: $reason.to_string(),
        }
    };
    (discovery, $path:expr, $reason:expr) => {
        $crate::error::TranslationError::Discovery {
            path: $path.to_string(),
            reason: $reason.to_string(),
        }
    };
    (file_op, $path:expr, $op:expr, $source:expr) => {
        $crate::error::TranslationError::FileOperation {
            path: $path.to_string(),
            operation: $op.to_string(),
            source: $source.to_string(),
        }
    };
}

/// 从anyhow::Error转换为TranslationError
impl From<AnyhowError> for TranslationError {
    fn from(error: AnyhowError) -> Self {
        TranslationError::Internal { source: error }
    }
}

/// 从reqwest::Error转换为TranslationError
impl From<reqwest::Error> for TranslationError {
    fn from(error: reqwest::Error) -> Self {
        let status_code = error.status().map(|s| s.as_u16());
        let message = if error.is_timeout() {
            format!("请求超时: {}", error)
        } else {
            error.to_string()
        };
        TranslationError::Network { message, status_code }
    }
}

/// 从std::io::Error转换为TranslationError
impl From<std::io::Error> for TranslationError {
    fn from(error: std::io::Error) -> Self {
        TranslationError::FileOperation {
            path: "unknown".to_string(),
            operation: "io".to_string(),
            source: error.to_string(),
        }
    }
}

/// 单个翻译任务的失败原因
///
/// 所有失败都只影响当前任务，由Worker计入失败统计后继续处理下一个任务
#[derive(Debug)]
pub enum TaskFailure {
    /// 检查目标文件状态失败（非"不存在"错误）
    StatCheck { path: PathBuf, source: std::io::Error },
    /// 读取源文件失败
    Read { path: PathBuf, source: std::io::Error },
    /// 非空跑模式下没有可用的翻译器
    BackendMissing { path: PathBuf },
    /// 翻译后端返回错误
    Backend { path: PathBuf, source: TranslationError },
    /// 翻译调用超时
    BackendTimeout { path: PathBuf, seconds: f64 },
    /// 译文提取失败
    Extraction { path: PathBuf, source: TranslationError },
    /// 写入目标文件失败
    Write { path: PathBuf, source: TranslationError },
}

impl TaskFailure {
    /// 失败任务对应的文件路径
    pub fn path(&self) -> &Path {
        match self {
            TaskFailure::StatCheck { path, .. }
            | TaskFailure::Read { path, .. }
            | TaskFailure::BackendMissing { path }
            | TaskFailure::Backend { path, .. }
            | TaskFailure::BackendTimeout { path, .. }
            | TaskFailure::Extraction { path, .. }
            | TaskFailure::Write { path, .. } => path,
        }
    }
}

impl fmt::Display for TaskFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskFailure::StatCheck { path, source } => {
                write!(f, "检查目标文件 {} 状态时出错: {}", path.display(), source)
            }
            TaskFailure::Read { path, source } => {
                write!(f, "读取源文件 {} 时出错: {}", path.display(), source)
            }
            TaskFailure::BackendMissing { path } => {
                write!(f, "Translator 实例未初始化，跳过 {}", path.display())
            }
            TaskFailure::Backend { path, source } => {
                write!(f, "翻译文件 {} 时出错: {}", path.display(), source)
            }
            TaskFailure::BackendTimeout { path, seconds } => {
                write!(f, "翻译文件 {} 超时 ({:.1}秒)", path.display(), seconds)
            }
            TaskFailure::Extraction { path, source } => {
                write!(f, "提取文件 {} 的翻译内容失败: {}", path.display(), source)
            }
            TaskFailure::Write { path, source } => {
                write!(f, "写入目标文件 {} 时出错: {}", path.display(), source)
            }
        }
    }
}

impl std::error::Error for TaskFailure {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            TaskFailure::StatCheck { source, .. } | TaskFailure::Read { source, .. } => Some(source),
            TaskFailure::Backend { source, .. }
            | TaskFailure::Extraction { source, .. }
            | TaskFailure::Write { source, .. } => Some(source),
            TaskFailure::BackendMissing { .. } | TaskFailure::BackendTimeout { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_includes_provider_and_status() {
        let err = translation_error!(translation_api, "Claude", 529, "Overloaded");
        let text = err.to_string();
        assert!(text.contains("Claude"));
        assert!(text.contains("529"));

        let err = translation_error!(auth, "OpenAI", "invalid key");
        assert_eq!(err.to_string(), "OpenAI: 认证失败: invalid key");
    }

    #[test]
    fn test_extraction_error_carries_preview() {
        let err = TranslationError::Extraction {
            preview: "Sorry, I can't...".to_string(),
        };
        assert!(err.to_string().contains("Sorry, I can't..."));
    }

    #[test]
    fn test_io_and_anyhow_conversions() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        assert!(matches!(
            TranslationError::from(io_err),
            TranslationError::FileOperation { .. }
        ));

        let internal: TranslationError = anyhow::anyhow!("worker panicked").into();
        assert!(matches!(internal, TranslationError::Internal { .. }));
        assert!(std::error::Error::source(&internal).is_some());
    }

    #[test]
    fn test_task_failure_path_and_source() {
        let failure = TaskFailure::Read {
            path: PathBuf::from("pages/a.md"),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
        };
        assert_eq!(failure.path(), Path::new("pages/a.md"));
        assert!(std::error::Error::source(&failure).is_some());
        assert!(failure.to_string().contains("pages/a.md"));

        let timeout = TaskFailure::BackendTimeout {
            path: PathBuf::from("b.md"),
            seconds: 120.0,
        };
        assert!(std::error::Error::source(&timeout).is_none());
        assert!(timeout.to_string().contains("超时"));
    }
}
