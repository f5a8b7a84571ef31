//! 目录扫描器
//!
//! 批处理模式下收集 `.py` 文件，跳过隐藏目录与常见的生成目录。

use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::error::AppError;

/// 需要跳过的目录/文件模式
const IGNORE_PATTERNS: &[&str] = &[
    ".git",
    "__pycache__",
    ".venv",
    "venv",
    "node_modules",
    "dist",
    "build",
    ".idea",
    ".vscode",
    ".tox",
    "*.egg-info",
];

/// 扫描错误类型
#[derive(Debug, thiserror::Error)]
pub enum ScanError {
    #[error("路径不存在: {0}")]
    PathNotFound(PathBuf),

    #[error("路径不是目录: {0}")]
    NotADirectory(PathBuf),
}

impl From<ScanError> for AppError {
    fn from(e: ScanError) -> Self {
        match e {
            ScanError::PathNotFound(p) => AppError::NotFound(p.display().to_string()),
            ScanError::NotADirectory(p) => {
                AppError::BadRequest(format!("不是目录: {}", p.display()))
            }
        }
    }
}

/// 收集目录下的 Python 文件（按路径排序，保证批处理顺序稳定）
pub fn collect_python_files(dir: &Path, recursive: bool) -> Result<Vec<PathBuf>, ScanError> {
    if !dir.exists() {
        return Err(ScanError::PathNotFound(dir.to_path_buf()));
    }
    if !dir.is_dir() {
        return Err(ScanError::NotADirectory(dir.to_path_buf()));
    }

    let ignore_patterns: Vec<glob::Pattern> = IGNORE_PATTERNS
        .iter()
        .filter_map(|p| match glob::Pattern::new(p) {
            Ok(pattern) => Some(pattern),
            Err(e) => {
                warn!("Invalid ignore pattern '{}': {}", p, e);
                None
            }
        })
        .collect();

    let max_depth = if recursive { usize::MAX } else { 1 };

    let mut files: Vec<PathBuf> = WalkDir::new(dir)
        .max_depth(max_depth)
        .into_iter()
        .filter_entry(|entry| {
            // 根目录本身不做过滤，否则以 . 开头的起始目录会被整体跳过
            if entry.depth() == 0 {
                return true;
            }
            let name = entry.file_name().to_string_lossy();
            !should_ignore(&name, &ignore_patterns)
        })
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(e) => {
                warn!("Failed to read directory entry: {}", e);
                None
            }
        })
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
        .filter(|path| path.extension().and_then(|e| e.to_str()) == Some("py"))
        .collect();

    files.sort();
    debug!("Collected {} Python files under {}", files.len(), dir.display());
    Ok(files)
}

/// 隐藏条目或匹配忽略模式的条目直接跳过
fn should_ignore(name: &str, patterns: &[glob::Pattern]) -> bool {
    if name.starts_with('.') {
        return true;
    }
    patterns.iter().any(|p| p.matches(name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::{self, File};
    use std::io::Write;
    use tempfile::TempDir;

    fn create_test_dir() -> TempDir {
        let dir = TempDir::new().unwrap();

        // 创建测试文件结构
        let src_dir = dir.path().join("src");
        fs::create_dir(&src_dir).unwrap();

        let mut main_file = File::create(dir.path().join("main.py")).unwrap();
        main_file.write_all(b"print('hello')").unwrap();

        let mut helper_file = File::create(src_dir.join("helper.py")).unwrap();
        helper_file.write_all(b"def helper(): pass").unwrap();

        File::create(dir.path().join("README.md")).unwrap();

        // 创建应该被忽略的目录
        let cache_dir = dir.path().join("__pycache__");
        fs::create_dir(&cache_dir).unwrap();
        File::create(cache_dir.join("cached.py")).unwrap();

        let git_dir = dir.path().join(".git");
        fs::create_dir(&git_dir).unwrap();
        File::create(git_dir.join("hook.py")).unwrap();

        dir
    }

    #[test]
    fn test_non_recursive_collects_top_level_only() {
        let dir = create_test_dir();
        let files = collect_python_files(dir.path(), false).unwrap();

        assert_eq!(files.len(), 1);
        assert!(files[0].ends_with("main.py"));
    }

    #[test]
    fn test_recursive_skips_ignored_dirs() {
        let dir = create_test_dir();
        let files = collect_python_files(dir.path(), true).unwrap();

        let names: Vec<String> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().to_string())
            .collect();
        assert_eq!(names, vec!["main.py", "helper.py"]);
    }

    #[test]
    fn test_missing_path_rejected() {
        let err = collect_python_files(Path::new("/nonexistent/dir"), false).unwrap_err();
        assert!(matches!(err, ScanError::PathNotFound(_)));
    }

    #[test]
    fn test_should_ignore() {
        let patterns: Vec<glob::Pattern> = IGNORE_PATTERNS
            .iter()
            .map(|p| glob::Pattern::new(p).unwrap())
            .collect();

        assert!(should_ignore(".gitignore", &patterns));
        assert!(should_ignore("__pycache__", &patterns));
        assert!(should_ignore("pkg.egg-info", &patterns));
        assert!(!should_ignore("main.py", &patterns));
    }
}
