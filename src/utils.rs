use std::path::Path;

/// 初始化日志系统
pub fn init_logging(verbose: bool, quiet: bool) {
    if quiet {
        return;
    }

    let level = if verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };

    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .init();
}

/// 截取文本前 `max_chars` 个字符用于日志预览，超出部分以 "..." 结尾
pub fn preview_text(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((byte_pos, _)) => format!("{}...", &text[..byte_pos]),
        None => text.to_string(),
    }
}

/// 判断文件名是否以指定扩展名结尾（不区分大小写）
pub fn has_extension_ignore_case(file_name: &str, extension: &str) -> bool {
    file_name.to_lowercase().ends_with(&extension.to_lowercase())
}

/// 将相对路径统一为 `/` 分隔的字符串，用于日志输出
pub fn display_relative(path: &Path) -> String {
    path.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}
