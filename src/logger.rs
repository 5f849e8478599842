//! 日志初始化
//!
//! 运行日志同时输出到控制台和日志文件（追加写入）。
//! 默认级别为 info，可通过 `RUST_LOG` 调整。

use anyhow::{Context, Result};
use std::path::Path;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// 初始化全局日志
///
/// # 参数
/// - `log_file`: 运行日志文件路径，所在目录不存在时会自动创建
pub fn init(log_file: &Path) -> Result<()> {
    let dir = log_file
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let file_name = log_file
        .file_name()
        .with_context(|| format!("日志文件路径无效: {}", log_file.display()))?;

    std::fs::create_dir_all(dir).with_context(|| format!("无法创建日志目录: {}", dir.display()))?;

    let file_appender = tracing_appender::rolling::never(dir, file_name);
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false))
        .with(
            fmt::layer()
                .with_ansi(false)
                .with_target(false)
                .with_writer(file_appender),
        )
        .try_init()
        .context("日志初始化失败")?;

    Ok(())
}
