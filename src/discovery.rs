//! 文件发现模块
//!
//! 递归遍历源目录，找出所有待翻译的Markdown文件，返回相对于源目录的路径列表。
//! 子目录或单个条目的访问错误只记录警告并跳过，只有源目录本身的错误是致命的。

// 标准库导入
use std::path::{Path, PathBuf};

// 第三方crate导入
use tracing::{debug, info, warn};
use walkdir::WalkDir;

// 本地模块导入
use crate::api_constants::service_config;
use crate::error::{Result, TranslationError};
use crate::translation_error;
use crate::utils::has_extension_ignore_case;

/// 查找源目录下所有 `.md` 文件（不区分大小写）
pub fn find_markdown_files(source_dir: &Path) -> Result<Vec<PathBuf>> {
    find_files_with_extension(source_dir, service_config::DOCUMENT_EXTENSION)
}

/// 查找源目录下所有以 `extension` 结尾的常规文件
///
/// 遍历完成后一次性返回完整列表，调用方需要在启动Worker之前知道文件总数。
/// 返回顺序不保证稳定。
pub fn find_files_with_extension(source_dir: &Path, extension: &str) -> Result<Vec<PathBuf>> {
    info!("🔍 开始在目录中查找文件: {}", source_dir.display());

    let root_meta = std::fs::metadata(source_dir).map_err(|e| {
        translation_error!(discovery, source_dir.display(), format!("无法访问源目录: {}", e))
    })?;
    if !root_meta.is_dir() {
        return Err(translation_error!(discovery, source_dir.display(), "源路径不是目录"));
    }

    let mut files = Vec::new();

    for entry in WalkDir::new(source_dir) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                if e.depth() == 0 {
                    return Err(TranslationError::Discovery {
                        path: source_dir.display().to_string(),
                        reason: format!("源目录读取失败: {}", e),
                    });
                }
                // walkdir 在目录无法读取时不会继续深入该子树
                match e.path() {
                    Some(path) => warn!("⚠️  访问路径 {} 时出错，已跳过: {}", path.display(), e),
                    None => warn!("⚠️  遍历过程中出现错误，已跳过: {}", e),
                }
                continue;
            }
        };

        // 指向文件的符号链接同样收录；符号链接目录不会被深入
        if !entry.file_type().is_file() && !entry.path().is_file() {
            continue;
        }

        let file_name = entry.file_name().to_string_lossy();
        if !has_extension_ignore_case(&file_name, extension) {
            continue;
        }

        match entry.path().strip_prefix(source_dir) {
            Ok(relative) => {
                debug!("发现文件: {}", relative.display());
                files.push(relative.to_path_buf());
            }
            Err(e) => {
                warn!(
                    "⚠️  无法获取 {} 相对于 {} 的路径，已跳过: {}",
                    entry.path().display(),
                    source_dir.display(),
                    e
                );
            }
        }
    }

    info!("📂 文件查找完成，共发现 {} 个Markdown文件", files.len());
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::fs;
    use tempfile::TempDir;

    fn touch(root: &Path, rel: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, "# title").unwrap();
    }

    #[test]
    fn test_find_markdown_files_recursive() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "a.md");
        touch(dir.path(), "common/tar.MD");
        touch(dir.path(), "linux/deep/apt.md");
        touch(dir.path(), "notes.txt");
        touch(dir.path(), "linux/readme.markdown");

        let files: HashSet<PathBuf> = find_markdown_files(dir.path()).unwrap().into_iter().collect();

        let expected: HashSet<PathBuf> = [
            PathBuf::from("a.md"),
            Path::new("common").join("tar.MD"),
            Path::new("linux").join("deep").join("apt.md"),
        ]
        .into_iter()
        .collect();
        assert_eq!(files, expected);
    }

    #[test]
    fn test_directories_named_like_documents_are_ignored() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("folder.md")).unwrap();
        touch(dir.path(), "folder.md/inner.md");

        let files = find_markdown_files(dir.path()).unwrap();
        assert_eq!(files, vec![Path::new("folder.md").join("inner.md")]);
    }

    #[test]
    fn test_empty_directory() {
        let dir = TempDir::new().unwrap();
        assert!(find_markdown_files(dir.path()).unwrap().is_empty());
    }

    #[test]
    fn test_missing_root_is_fatal() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("nope");
        match find_markdown_files(&missing) {
            Err(TranslationError::Discovery { .. }) => {}
            other => panic!("expected discovery error, got {:?}", other),
        }
    }

    #[test]
    fn test_root_must_be_directory() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "file.md");
        assert!(find_markdown_files(&dir.path().join("file.md")).is_err());
    }

    #[cfg(unix)]
    #[test]
    fn test_symlinked_documents_are_included() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "real.md");
        std::os::unix::fs::symlink(dir.path().join("real.md"), dir.path().join("alias.md")).unwrap();
        std::os::unix::fs::symlink(dir.path().join("missing.md"), dir.path().join("dangling.md"))
            .unwrap();

        let files: HashSet<PathBuf> = find_markdown_files(dir.path()).unwrap().into_iter().collect();
        let expected: HashSet<PathBuf> =
            [PathBuf::from("real.md"), PathBuf::from("alias.md")].into_iter().collect();
        assert_eq!(files, expected);
    }

    #[cfg(unix)]
    #[test]
    fn test_unreadable_subdirectory_is_skipped() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        touch(dir.path(), "ok.md");
        touch(dir.path(), "locked/hidden.md");
        let locked = dir.path().join("locked");
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o000)).unwrap();

        // root 用户不受权限位限制，此时子目录仍然可读
        let readable = fs::read_dir(&locked).is_ok();
        let files = find_markdown_files(dir.path());
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();

        let files = files.unwrap();
        assert!(files.contains(&PathBuf::from("ok.md")));
        assert_eq!(files.len(), if readable { 2 } else { 1 });
    }
}
