//! 译文持久化模块
//!
//! 此模块负责：
//! - 按覆盖策略检查目标文件是否已存在
//! - 递归创建目标文件的父目录
//! - 通过同目录临时文件 + 重命名实现原子写入，调用方不会看到写了一半的文件

use std::fs;
use std::io::{self, Write};
use std::path::Path;

use tempfile::NamedTempFile;
use tracing::debug;

use crate::error::{Result, TranslationError};
use crate::translation_error;

/// 写入结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    /// 内容已写入目标文件
    Written,
    /// 未开启覆盖且目标文件已存在，未做任何修改
    AlreadyExists,
}

/// 检查目标文件是否存在
///
/// "不存在" 返回 `Ok(false)`，其它错误（如权限不足）原样返回
pub fn target_exists(path: &Path) -> io::Result<bool> {
    match fs::metadata(path) {
        Ok(_) => Ok(true),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e),
    }
}

/// 将译文写入目标路径
///
/// `overwrite` 为 false 时，已存在的文件保持不变并返回 [`WriteOutcome::AlreadyExists`]
pub fn write_translation(path: &Path, content: &str, overwrite: bool) -> Result<WriteOutcome> {
    if !overwrite {
        let exists = target_exists(path).map_err(|e| {
            translation_error!(file_op, path.display(), "状态检查", e)
        })?;
        if exists {
            debug!("跳过已存在的文件 (未设置覆盖): {}", path.display());
            return Ok(WriteOutcome::AlreadyExists);
        }
    }

    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(dir)
        .map_err(|e| translation_error!(file_op, dir.display(), "创建目录", e))?;

    let mut temp = NamedTempFile::new_in(dir)
        .map_err(|e| translation_error!(file_op, dir.display(), "创建临时文件", e))?;
    temp.write_all(content.as_bytes())
        .and_then(|_| temp.as_file().sync_all())
        .map_err(|e| translation_error!(file_op, path.display(), "写入", e))?;
    set_document_permissions(temp.path())
        .map_err(|e| translation_error!(file_op, path.display(), "设置权限", e))?;

    if overwrite {
        temp.persist(path)
            .map_err(|e| translation_error!(file_op, path.display(), "重命名", e.error))?;
    } else {
        match temp.persist_noclobber(path) {
            Ok(_) => {}
            // 检查之后、写入之前文件被其它进程创建
            Err(e) if e.error.kind() == io::ErrorKind::AlreadyExists => {
                debug!("写入前目标文件已被创建，保持原文件: {}", path.display());
                return Ok(WriteOutcome::AlreadyExists);
            }
            Err(e) => {
                return Err(TranslationError::FileOperation {
                    path: path.display().to_string(),
                    operation: "重命名".to_string(),
                    source: e.error.to_string(),
                });
            }
        }
    }

    debug!("写入文件完成: {} ({} 字节)", path.display(), content.len());
    Ok(WriteOutcome::Written)
}

#[cfg(unix)]
fn set_document_permissions(path: &Path) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(0o644))
}

#[cfg(not(unix))]
fn set_document_permissions(_path: &Path) -> io::Result<()> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_write_creates_parent_directories() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("linux").join("deep").join("apt.md");

        let outcome = write_translation(&target, "# apt", false).unwrap();
        assert_eq!(outcome, WriteOutcome::Written);
        assert_eq!(fs::read_to_string(&target).unwrap(), "# apt");
    }

    #[test]
    fn test_existing_file_kept_without_overwrite() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("a.md");
        fs::write(&target, "old").unwrap();

        let outcome = write_translation(&target, "new", false).unwrap();
        assert_eq!(outcome, WriteOutcome::AlreadyExists);
        assert_eq!(fs::read_to_string(&target).unwrap(), "old");
    }

    #[test]
    fn test_existing_file_replaced_with_overwrite() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("a.md");
        fs::write(&target, "old content that is longer").unwrap();

        let outcome = write_translation(&target, "new", true).unwrap();
        assert_eq!(outcome, WriteOutcome::Written);
        assert_eq!(fs::read_to_string(&target).unwrap(), "new");
    }

    #[test]
    fn test_no_temp_files_left_behind() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("a.md");
        write_translation(&target, "x", true).unwrap();
        write_translation(&target, "y", true).unwrap();

        let entries: Vec<_> = fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(entries.len(), 1);
    }

    #[test]
    fn test_parent_is_a_file_fails() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("blocker"), "").unwrap();
        let target = dir.path().join("blocker").join("a.md");

        match write_translation(&target, "x", false) {
            Err(TranslationError::FileOperation { .. }) => {}
            other => panic!("expected file operation error, got {:?}", other),
        }
    }

    #[test]
    fn test_target_exists() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("a.md");
        assert!(!target_exists(&target).unwrap());
        fs::write(&target, "").unwrap();
        assert!(target_exists(&target).unwrap());
    }

    #[cfg(unix)]
    #[test]
    fn test_written_file_is_world_readable() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        let target = dir.path().join("a.md");
        write_translation(&target, "x", false).unwrap();
        let mode = fs::metadata(&target).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o644);
    }
}
