//! 缺失文件写入服务 - 业务能力层
//!
//! 只负责把找不到的本地文件写入缺失文件日志，不关心流程

use crate::models::outcome::now_iso;
use anyhow::{Context, Result};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::warn;

/// 缺失文件写入服务
///
/// 每行格式：`[<时间>] <路径>`，同时在运行日志中记一条警告。
pub struct MissingFileWriter {
    log_path: PathBuf,
}

impl MissingFileWriter {
    /// 使用自定义文件路径创建
    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self {
            log_path: path.into(),
        }
    }

    /// 写入一条缺失记录
    pub fn write(&self, resource_path: &str) -> Result<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.log_path)
            .with_context(|| format!("无法打开缺失文件日志: {}", self.log_path.display()))?;

        writeln!(file, "[{}] {}", now_iso(), resource_path)?;

        warn!("⚠️ 文件不存在: {}", resource_path);

        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.log_path
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_appends_one_line_per_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let writer = MissingFileWriter::with_path(dir.path().join("missing.txt"));

        writer.write("/images/a.jpg").unwrap();
        writer.write("/images/b.jpg").unwrap();

        let content = std::fs::read_to_string(writer.path()).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with('['));
        assert!(lines[1].ends_with("] /images/b.jpg"));
    }
}
